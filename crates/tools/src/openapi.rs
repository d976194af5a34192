//! OpenAPI catalog: the API documents endpoint candidates are checked against.
//!
//! Documents are kept as raw JSON so partially valid or vendor-extended
//! specs still load. The catalog answers three questions:
//! - which server hosts a path ([`ApiCatalog::server_for`])
//! - what is wrong with a candidate ([`ApiCatalog::validate`])
//! - how to split the documents into retrievable text ([`ApiCatalog::chunks`])

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use stepwise_core::error::RetrievalError;
use stepwise_core::{Document, EndpointCandidate};
use tracing::{debug, info, warn};

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// One loaded OpenAPI document.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    pub source: Option<PathBuf>,
    pub spec: Value,
}

impl ApiDocument {
    fn paths(&self) -> Option<&serde_json::Map<String, Value>> {
        self.spec.get("paths").and_then(Value::as_object)
    }

    fn server(&self) -> Option<&str> {
        self.spec
            .get("servers")
            .and_then(Value::as_array)
            .and_then(|servers| servers.first())
            .and_then(|s| s.get("url"))
            .and_then(Value::as_str)
    }
}

/// A single operation, as listed by `stepwise catalog`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSummary {
    pub method: String,
    pub path: String,
    pub summary: Option<String>,
}

/// All API documents known to the engine.
#[derive(Debug, Clone, Default)]
pub struct ApiCatalog {
    documents: Vec<ApiDocument>,
}

impl ApiCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parsed document.
    pub fn add(&mut self, spec: Value, source: Option<PathBuf>) {
        self.documents.push(ApiDocument { source, spec });
    }

    /// Load every `*.json` file under `dir`, recursively.
    ///
    /// Unreadable or invalid files are skipped with a warning; a missing
    /// directory is an error.
    pub fn load_dir(dir: &Path) -> std::result::Result<Self, RetrievalError> {
        if !dir.is_dir() {
            return Err(RetrievalError::LoadFailed {
                location: dir.display().to_string(),
                reason: "not a directory".into(),
            });
        }

        let mut files = Vec::new();
        collect_json_files(dir, &mut files).map_err(|e| RetrievalError::LoadFailed {
            location: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        files.sort();

        let mut catalog = Self::new();
        for file in files {
            let parsed = std::fs::read_to_string(&file)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str::<Value>(&s).map_err(|e| e.to_string()));
            match parsed {
                Ok(spec) => {
                    debug!(file = %file.display(), "Loaded API document");
                    catalog.add(spec, Some(file));
                }
                Err(reason) => warn!(file = %file.display(), %reason, "Skipping API document"),
            }
        }

        info!(dir = %dir.display(), documents = catalog.len(), "API catalog loaded");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[ApiDocument] {
        &self.documents
    }

    /// `servers[0].url` of the first document whose path table has `path`.
    pub fn server_for(&self, path: &str) -> Option<&str> {
        self.documents
            .iter()
            .find(|d| d.paths().is_some_and(|p| p.contains_key(path)))
            .and_then(ApiDocument::server)
    }

    /// Every operation in every document, in document order.
    pub fn endpoints(&self) -> Vec<EndpointSummary> {
        let mut out = Vec::new();
        for doc in &self.documents {
            let Some(paths) = doc.paths() else { continue };
            for (path, item) in paths {
                for method in HTTP_METHODS {
                    if let Some(op) = item.get(method) {
                        out.push(EndpointSummary {
                            method: method.to_uppercase(),
                            path: path.clone(),
                            summary: op.get("summary").and_then(Value::as_str).map(String::from),
                        });
                    }
                }
            }
        }
        out
    }

    /// Check a candidate against the catalog and describe every problem.
    ///
    /// An empty list means the candidate matches a documented operation.
    pub fn validate(&self, candidate: &EndpointCandidate) -> Vec<String> {
        let url = candidate.url.as_str();
        let method = candidate.method.to_lowercase();
        let mut problems = Vec::new();

        let Some(item) = self
            .documents
            .iter()
            .find_map(|d| d.paths().and_then(|p| p.get(url)))
        else {
            problems.push(format!("\"{url}\" is not a documented path"));
            return problems;
        };

        let Some(operation) = item.get(&method) else {
            problems.push(format!("\"{method}\" is not a valid method for \"{url}\""));
            return problems;
        };

        let mut required = BTreeSet::new();
        let mut optional = BTreeSet::new();
        let declared = item
            .get("parameters")
            .and_then(Value::as_array)
            .into_iter()
            .chain(operation.get("parameters").and_then(Value::as_array))
            .flatten();
        for param in declared {
            let Some(name) = param.get("name").and_then(Value::as_str) else { continue };
            if param.get("required").and_then(Value::as_bool).unwrap_or(false) {
                required.insert(name.to_string());
            } else {
                optional.insert(name.to_string());
            }
        }

        for name in &required {
            if !candidate.data.contains_key(name) {
                problems.push(format!("Required param \"{name}\" is missing"));
            }
        }

        // Body fields cannot be checked without resolving schemas.
        if operation.get("requestBody").is_none() {
            for name in candidate.data.keys() {
                if !required.contains(name) && !optional.contains(name) {
                    problems.push(format!("Param \"{name}\" is not declared for {method} \"{url}\""));
                }
            }
        }

        problems
    }

    /// One text chunk per documented path, for seeding a knowledge retriever.
    pub fn chunks(&self) -> Vec<Document> {
        let mut chunks = Vec::new();
        for doc in &self.documents {
            let Some(paths) = doc.paths() else { continue };
            let schemas = doc.spec.pointer("/components/schemas");

            for (path, item) in paths {
                let mut lines = vec![format!("Path: {path}")];

                for method in HTTP_METHODS {
                    let Some(op) = item.get(method) else { continue };
                    lines.push(format!("Method: {}", method.to_uppercase()));
                    lines.push(format!("Summary: {}", text_or(op, "summary", "Summary N/A")));
                    lines.push(format!(
                        "Description: {}",
                        text_or(op, "description", "Description N/A")
                    ));

                    for param in op.get("parameters").and_then(Value::as_array).into_iter().flatten() {
                        lines.push(format!(
                            "Parameter: {} - {}",
                            text_or(param, "name", "?"),
                            text_or(param, "description", "No description")
                        ));
                    }

                    if let Some(reference) = op
                        .pointer("/requestBody/content/application~1json/schema/$ref")
                        .and_then(Value::as_str)
                    {
                        let key = reference.rsplit('/').next().unwrap_or(reference);
                        if let Some(schema) = schemas.and_then(|s| s.get(key)) {
                            let rendered =
                                serde_json::to_string_pretty(schema).unwrap_or_default();
                            lines.push(format!("Schema: {key} - {rendered}"));
                        }
                    }

                    if let Some(responses) = op.get("responses").and_then(Value::as_object) {
                        for (status, response) in responses {
                            lines.push(format!(
                                "Response: {status} - {}",
                                text_or(response, "description", "No description")
                            ));
                        }
                    }
                }

                let mut chunk = Document::new(lines.join("\n")).with_source(path.clone());
                if let Some(source) = &doc.source {
                    chunk.source = Some(format!("{}#{path}", source.display()));
                }
                chunks.push(chunk);
            }
        }
        chunks
    }
}

fn text_or<'a>(value: &'a Value, key: &str, fallback: &'a str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "json") {
            out.push(path);
        }
    }
    Ok(())
}
