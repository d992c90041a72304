//! Call trace entries

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step invocation: the tool name and the arguments it ran with.
///
/// Appended before the step executes, so a failing step is the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub tool: String,
    pub args: Value,
}

impl TraceEntry {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }
}
