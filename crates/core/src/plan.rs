//! Plan and Step: the parsed form of a planner's output.
//!
//! A plan arrives as a JSON object whose `plan` field holds newline-separated
//! step lines, each carrying one bracketed capability marker:
//!
//! ```text
//! {"plan": "1. [API] fetch trends for \"elections\"\n2. [Summarization] answer the user"}
//! ```
//!
//! The marker is resolved to a [`StepTag`] exactly once, at parse time.
//! Lines are never dropped: an empty or untagged line becomes an
//! [`StepTag::Unidentified`] step so the step count always equals the line count.

use serde::{Deserialize, Serialize};
use crate::error::PlanError;

/// The capability a step is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTag {
    Api,
    Search,
    Summarization,
    Clarification,
    Unidentified,
}

impl StepTag {
    /// Tags in dispatch precedence order, with their lowercase markers.
    const PRECEDENCE: [(StepTag, &'static str); 4] = [
        (StepTag::Api, "[api]"),
        (StepTag::Search, "[search]"),
        (StepTag::Summarization, "[summarization]"),
        (StepTag::Clarification, "[clarification]"),
    ];

    /// Resolve the tag of a step line.
    ///
    /// Markers are matched anywhere in the line, case-insensitively, and the
    /// first marker in precedence order (`API`, `Search`, `Summarization`,
    /// `Clarification`) wins when a line carries several.
    pub fn detect(line: &str) -> Self {
        let lower = line.to_lowercase();
        Self::PRECEDENCE
            .iter()
            .find(|(_, marker)| lower.contains(marker))
            .map(|(tag, _)| *tag)
            .unwrap_or(StepTag::Unidentified)
    }
}

/// One tagged instruction line of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Zero-based position in the plan.
    pub index: usize,
    pub tag: StepTag,
    /// The full step line, marker included, as the planner wrote it.
    pub instruction: String,
}

/// An ordered, immutable sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    text: String,
    steps: Vec<Step>,
}

impl Plan {
    /// Parse a planner response of the form `{"plan": "<line>\n<line>..."}`.
    ///
    /// A missing `plan` field is treated as an empty plan text, which yields
    /// a single unidentified step.
    pub fn parse(plan_json: &str) -> Result<Self, PlanError> {
        let value: serde_json::Value = serde_json::from_str(plan_json)?;
        let object = value
            .as_object()
            .ok_or_else(|| PlanError::NotAnObject(json_kind(&value).into()))?;

        let text = match object.get("plan") {
            None => "",
            Some(serde_json::Value::String(s)) => s.as_str(),
            Some(other) => return Err(PlanError::InvalidPlanField(json_kind(other).into())),
        };

        Ok(Self::from_text(text))
    }

    /// Build a plan directly from newline-separated step lines.
    pub fn from_text(text: &str) -> Self {
        let steps = text
            .split('\n')
            .enumerate()
            .map(|(index, line)| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                Step {
                    index,
                    tag: StepTag::detect(line),
                    instruction: line.to_string(),
                }
            })
            .collect();

        Self {
            text: text.to_string(),
            steps,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The raw plan text the steps were split from.
    pub fn text(&self) -> &str {
        &self.text
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
