//! Endpoint candidates and the classified results of invoking them.
//!
//! An [`EndpointCandidate`] is what the synthesizer produces: a method, a URL
//! template such as `/items/{id}`, and a map of parameter values. The invoker
//! turns each candidate into an [`InvocationResult`]; one call over a list of
//! candidates yields an [`InvocationBatch`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A synthesized, not-yet-executed description of one API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointCandidate {
    /// Path or absolute URL, possibly containing `{param}` placeholders.
    pub url: String,

    /// HTTP method, any case.
    pub method: String,

    /// Parameter name → value. Keys matching a placeholder fill the path;
    /// the rest become the request payload.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl EndpointCandidate {
    pub fn new(url: impl Into<String>, method: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            data,
        }
    }

    /// Substitute `{key}` placeholders from `data`.
    ///
    /// Returns the resolved URL and the residual payload: every key whose
    /// placeholder appears in the URL is consumed, all others are kept.
    pub fn resolve_template(&self) -> (String, Map<String, Value>) {
        let mut url = self.url.clone();
        let mut payload = Map::new();

        for (key, value) in &self.data {
            let placeholder = format!("{{{key}}}");
            if url.contains(&placeholder) {
                url = url.replace(&placeholder, &stringify(value));
            } else {
                payload.insert(key.clone(), value.clone());
            }
        }

        (url, payload)
    }
}

impl fmt::Display for EndpointCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Render a parameter value for use inside a URL path.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// How one candidate's invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// 2xx response with a JSON body.
    Json { body: Value },
    /// 2xx response whose body did not decode as JSON.
    Text { body: String },
    /// Non-2xx response; the raw body is kept.
    Failed { status: u16, body: String },
    /// The request never produced a response.
    Errored { message: String },
}

impl Outcome {
    /// The payload as it appears in the textual form of a batch.
    pub fn payload(&self) -> Value {
        match self {
            Self::Json { body } => body.clone(),
            Self::Text { body } | Self::Failed { body, .. } => Value::String(body.clone()),
            Self::Errored { message } => Value::String(format!("error: {message}")),
        }
    }

    /// Whether the payload carries anything: non-null, non-empty, non-zero, non-false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Json { body } => json_truthy(body),
            Self::Text { body } | Self::Failed { body, .. } => !body.is_empty(),
            Self::Errored { .. } => false,
        }
    }
}

fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// The result of invoking one candidate, keyed by its resolved URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub url: String,
    pub outcome: Outcome,
}

/// All results of one invoker call, in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationBatch {
    pub results: Vec<InvocationResult>,
    /// Resolved URLs of the executed endpoints, in the same order.
    pub urls: Vec<String>,
}

impl InvocationBatch {
    pub fn push(&mut self, result: InvocationResult) {
        self.urls.push(result.url.clone());
        self.results.push(result);
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The batch as a JSON list of single-key objects: `[{"<url>": <payload>}, ...]`.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.results
                .iter()
                .map(|r| {
                    let mut entry = Map::new();
                    entry.insert(r.url.clone(), r.outcome.payload());
                    Value::Object(entry)
                })
                .collect(),
        )
    }

    /// Whether the value keyed by the first endpoint URL is truthy.
    pub fn first_is_truthy(&self) -> bool {
        self.results.first().is_some_and(|r| r.outcome.is_truthy())
    }

    /// The semantic success test: no `error` anywhere in the textual form
    /// (case-insensitive) and a truthy first result.
    pub fn is_success(&self) -> bool {
        !self.to_string().to_lowercase().contains("error") && self.first_is_truthy()
    }

    /// Response size in tokens, approximated as characters / 4.
    pub fn approx_tokens(&self) -> usize {
        self.to_string().chars().count() / 4
    }
}

impl fmt::Display for InvocationBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
