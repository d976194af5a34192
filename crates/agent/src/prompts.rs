//! Prompt templates for every completion role.
//!
//! Templates use `{name}` placeholders filled by [`render`] in a single
//! pass, so substituted values (API docs, previous results) are never
//! re-scanned for placeholders.

use std::collections::HashMap;
use std::path::Path;
use stepwise_core::error::Error;

pub const GENERATOR: &str = r#"Context from the previous step:
{context}

Response schema:
{response_schema}

Previous generations (each one failed; you MUST produce something different):
{previous_generations}

API documentation:
{open_api_spec}

Using only the API documentation above, produce the endpoint call(s) that answer the question below.
- Never invent endpoints, parameters or values that the documentation does not describe.
- Respect the declared type of every parameter.
- Path parameters go in "data" under the same name as the {placeholder} in "url".
- Use the context from the previous step when the question depends on it.
- Answer with JSON that follows the response schema. No prose, no comments, no code fences.

Question:
{question}
"#;

pub const SUMMARIZER: &str = r#"You answer questions from the data collected for the user below.

Data:
{object}

Instructions:
{transformation_prompt}

Cite the sources present in the data without their URLs. Do not include step markers such as [Summarization] in your answer.
When data is missing, say what you assumed and why."#;

pub const PLANNER_WITH_APIS: &str = r#"You break a user's question into a short sequence of executable steps.

Tools:
[API] Turns the step into a call to one of the usable endpoints below.
[Search] Answers the step from the internet in natural language.
[Summarization] Answers the user from the data gathered by the previous steps.
[Clarification] Asks the user a question when the request cannot be planned without it.

Usable endpoints:
{endpoints}

Rules:
1. At most 7 steps, one per line, each starting with its tool marker.
2. Every step must be self-contained: repeat names, dates and identifiers instead of referring to other steps.
3. End with exactly one [Summarization] step.
4. Resolve relative dates against the current date and write them as YYYY-MM-DDTHH:MM:SSZ.
5. Respond with JSON only, following the response schema.

Response schema:
{response_schema}

Definitions related to the question (ignore if irrelevant): {knowledge}
Current date: {datetime}
Conversation history:
{context}
User query: {query}
Plan:"#;

pub const PLANNER_SUMMARY_ONLY: &str = r#"You answer the user's question with a plan of exactly one step:
[Summarization] followed by a complete, self-contained instruction for answering the question from your own knowledge.

Respond with JSON only, following the response schema.

Response schema:
{response_schema}

Definitions related to the question (ignore if irrelevant): {knowledge}
Current date: {datetime}
Conversation history:
{context}
User query: {query}
Plan:"#;

pub const PLANNER_SCHEMA: &str = r#"{
   "type": "object",
   "properties": {
      "plan": {
         "type": "string",
         "description": "Newline-separated steps, each starting with [API], [Search], [Summarization] or [Clarification]"
      }
   },
   "required": ["plan"]
}"#;

pub const GENERATOR_SCHEMA: &str = r#"{
   "type": "array",
   "items": {
      "type": "object",
      "properties": {
         "url": {"type": "string", "description": "Endpoint path exactly as documented, with {placeholders} kept"},
         "method": {"type": "string", "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"]},
         "data": {"type": "object", "description": "Path, query and body parameters by name"}
      },
      "required": ["url", "method", "data"]
   }
}"#;

/// Appended to the annotation of a failed single-candidate attempt.
pub const REFLECTION: &str = "Reflect on the parameters and their descriptions and pay close attention to every rule they state. \
Check which of those rules this generation violated to cause the error. Try variations of the API parameters.";

/// Returned by the summarizer when its prompt is over the token ceiling.
pub const TOO_MANY_TOKENS: &str =
    "Cannot process the response right now as it contains too many tokens !";

/// Fill `{name}` placeholders from `vars`. Unknown placeholders are left as is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let vars: HashMap<&str, &str> = vars.iter().copied().collect();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];

        match (after[name_len..].starts_with('}'), vars.get(name)) {
            (true, Some(value)) if !name.is_empty() => {
                out.push_str(value);
                rest = &after[name_len + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Read a JSON schema file and pretty-print it for a prompt.
pub fn load_schema(path: &Path) -> Result<String, Error> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read response schema {}: {e}", path.display()),
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
