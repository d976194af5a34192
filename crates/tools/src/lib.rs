//! Capability implementations for Stepwise.
//!
//! - [`ApiCatalog`]: loaded OpenAPI documents
//! - [`EndpointInvoker`]: executes endpoint candidates over HTTP
//! - [`KeywordRetriever`]: in-process knowledge retrieval
//! - [`LlmWebSearch`]: web search through an online completion model

pub mod invoker;
pub mod openapi;
pub mod retriever;
pub mod web_search;

pub use invoker::EndpointInvoker;
pub use openapi::{ApiCatalog, ApiDocument, EndpointSummary};
pub use retriever::{KNOWLEDGE_COLLECTION, KeywordRetriever, OPENAPI_COLLECTION};
pub use web_search::LlmWebSearch;
