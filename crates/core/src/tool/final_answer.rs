use std::future::ready;

use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolResult};

/// Name of the tool an agent calls to hand in its answer.
///
/// Every agent carries a default `final_answer` tool that returns the
/// answer verbatim. Registering another tool under this name replaces it,
/// which lets an application post-process answers.
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

#[derive(Deserialize)]
pub struct FinalAnswerInput {
    answer: Value,
}

pub struct FinalAnswerTool {
    schema: Value,
}

impl Default for FinalAnswerTool {
    fn default() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "answer": {
                        "type": "string",
                        "description": "The final answer to the problem."
                    }
                },
                "required": ["answer"]
            }),
        }
    }
}

impl Tool for FinalAnswerTool {
    type Input = FinalAnswerInput;

    fn name(&self) -> &str {
        FINAL_ANSWER_TOOL
    }

    fn description(&self) -> &str {
        "Provides a final answer to the given problem."
    }

    fn parameter_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let answer = match input.answer {
            Value::String(answer) => answer,
            other => other.to_string(),
        };
        ready(Ok(answer))
    }
}
