//! TaskResult: the output of one executed plan step.

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::endpoint::InvocationBatch;

/// What a step produced, consumed by later steps as "previous result".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskResult {
    /// Results of an API step's successful (or last) invocation.
    Api(InvocationBatch),
    /// Search answers, summaries and clarification requests.
    Text(String),
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(batch) => write!(f, "{batch}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}
