use serde_json::Value;

use crate::OpaqueMessage;
use crate::response::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools the model may call.
    pub tools: Vec<ModelTool>,
    /// Sampling options. Unset fields use the provider's defaults.
    pub options: GenerationOptions,
}

impl ModelRequest {
    /// Returns how many assistant turns the history already contains.
    pub fn assistant_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|msg| {
                matches!(msg, ModelMessage::Assistant(_) | ModelMessage::Opaque(_))
            })
            .count()
    }
}

/// Sampling options for a request.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Upper bound of generated tokens.
    pub max_tokens: Option<u32>,
}

/// A complete message in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text (or a task handed down by a managing agent).
    User(String),
    /// An assistant turn in provider-neutral form.
    Assistant(AssistantMessage),
    /// A tool call result.
    Tool(ToolCallResult),
    /// An assistant turn in the provider's own form.
    Opaque(OpaqueMessage),
}

/// An assistant turn: the text it produced and the tools it called.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AssistantMessage {
    /// Generated text, may be empty when the turn only calls tools.
    pub content: String,
    /// Tool calls requested in this turn.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AssistantMessage {
    /// Creates a text-only assistant message.
    #[inline]
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
        }
    }
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// Id of the tool call request this result answers.
    pub id: String,
    /// The tool output (or the error text when the tool failed).
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool, as a
    /// [JSON schema](https://json-schema.org/) object.
    pub parameters: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_turns() {
        let req = ModelRequest {
            messages: vec![
                ModelMessage::System("You plan trips.".to_owned()),
                ModelMessage::User("Weather in Lisbon?".to_owned()),
                ModelMessage::Assistant(AssistantMessage::text("Checking.")),
                ModelMessage::Tool(ToolCallResult {
                    id: "call_1".to_owned(),
                    content: "Sunny".to_owned(),
                }),
                ModelMessage::Opaque(OpaqueMessage::new("msg:2", ())),
            ],
            ..Default::default()
        };
        assert_eq!(req.assistant_turns(), 2);
    }
}
