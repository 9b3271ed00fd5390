//! Structured responses expected from the chat endpoint
//!
//! Each session kind asks the model for JSON matching a strict schema. The
//! schema, its name and the session's system prompt travel together through
//! [`StructuredResponse`].
//!
//! Schemas are derived from the response types with `schemars` and then
//! tightened for strict structured outputs: every object lists all of its
//! properties as required and forbids additional ones.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// System prompt of `ask` sessions
pub const ASK_SYSTEM_PROMPT: &str = "You are an assistant embedded in a command-line tool that helps developers \
understand their codebase. The first user message contains the project context: metadata, a file tree \
and the numbered content of the selected files. Answer questions about that code, explain logic, \
suggest implementations and point out problems. Stay within the given context and do not modify files.";

/// System prompt of `code` sessions
pub const CODE_SYSTEM_PROMPT: &str = "You are an assistant embedded in a command-line tool that performs precise, \
structured code modifications. The first user message contains the project context with numbered file \
lines. Answer with an ordered list of steps. Each step names a file path relative to the project root and \
an operation: create (the edits' new_code is the full file content), delete, or edit (each edit replaces \
lines start_line..=end_line, 1-based and inclusive, with new_code). Line numbers refer to the file as shown \
in the context.";

/// A response type with a strict JSON schema
pub trait StructuredResponse: DeserializeOwned + JsonSchema {
    /// Schema name sent with the request
    const SCHEMA_NAME: &'static str;

    /// System prompt of sessions expecting this response
    const SYSTEM_PROMPT: &'static str;

    /// Strict JSON schema of the response
    fn schema() -> Value {
        strict_schema::<Self>()
    }
}

/// Generate the schema of `T` and tighten it for strict structured outputs
pub fn strict_schema<T: JsonSchema>() -> Value {
    let mut schema = schemars::schema_for!(T).to_value();
    if let Some(root) = schema.as_object_mut() {
        root.remove("$schema");
        root.remove("title");
    }
    make_strict(&mut schema);
    schema
}

/// Require every property, forbid unknown ones and drop keywords strict mode
/// rejects, recursively
fn make_strict(schema: &mut Value) {
    let Some(object) = schema.as_object_mut() else {
        return;
    };

    object.remove("format");
    object.remove("default");
    if let Some(one_of) = object.remove("oneOf") {
        object.insert("anyOf".to_string(), one_of);
    }

    let required: Option<Vec<Value>> = object
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| properties.keys().cloned().map(Value::String).collect());
    if let Some(required) = required {
        object.insert("required".to_string(), Value::Array(required));
        object.insert("additionalProperties".to_string(), Value::Bool(false));
    }

    for key in ["properties", "$defs"] {
        if let Some(children) = object.get_mut(key).and_then(Value::as_object_mut) {
            children.values_mut().for_each(make_strict);
        }
    }
    if let Some(items) = object.get_mut("items") {
        make_strict(items);
    }
    for key in ["anyOf", "allOf"] {
        if let Some(variants) = object.get_mut(key).and_then(Value::as_array_mut) {
            variants.iter_mut().for_each(make_strict);
        }
    }
}

/// Answer of an `ask` session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AskResponse {
    /// A natural language response providing insights or suggestions based
    /// on the user query and the codebase
    pub contextual_response: String,
}

impl StructuredResponse for AskResponse {
    const SCHEMA_NAME: &'static str = "ask_code_info";
    const SYSTEM_PROMPT: &'static str = ASK_SYSTEM_PROMPT;
}

/// Kind of change a step performs: `create` writes a new file, `delete`
/// removes one and `edit` replaces line ranges of an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Delete,
    Edit,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Create => "create",
            OperationType::Delete => "delete",
            OperationType::Edit => "edit",
        };
        f.write_str(name)
    }
}

/// One line-range replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EditDetail {
    /// The starting line number for the edit, 1-based
    pub start_line: usize,
    /// The ending line number for the edit, inclusive
    pub end_line: usize,
    /// The new code to insert
    pub new_code: String,
}

/// One file operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CodeModificationStep {
    /// Type of operation
    pub operation_type: OperationType,
    /// The path to the file for the operation, relative to the project root
    pub file_path: String,
    /// List of edits (for `create`, the content of the new file)
    #[serde(default)]
    pub edits: Vec<EditDetail>,
}

/// Answer of a `code` session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CodeModificationResponse {
    /// An ordered list of modification steps to perform
    pub steps: Vec<CodeModificationStep>,
}

impl StructuredResponse for CodeModificationResponse {
    const SCHEMA_NAME: &'static str = "code_modification";
    const SYSTEM_PROMPT: &'static str = CODE_SYSTEM_PROMPT;
}

impl fmt::Display for CodeModificationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return writeln!(f, "(no changes)");
        }
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "{}. {} {}", i + 1, step.operation_type, step.file_path)?;
            if step.operation_type == OperationType::Edit {
                for edit in &step.edits {
                    writeln!(f, "   lines {}-{}:", edit.start_line, edit.end_line)?;
                    for line in edit.new_code.lines() {
                        writeln!(f, "   | {}", line)?;
                    }
                }
            }
        }
        Ok(())
    }
}
