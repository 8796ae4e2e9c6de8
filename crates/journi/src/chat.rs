//! Turns agent steps into chat bubbles.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use journi_core::ActionStep;
use mime::Mime;
use regex::Regex;

static THOUGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Thought:(.*?)(?:Code:|$)").expect("valid regex")
});
static EXECUTION_LOGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Execution logs:\s*").expect("valid regex")
});

const WEB_TOOLS: [&str; 2] = ["web_search", "visit_webpage"];

/// Who sent a [`ChatMessage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The traveler.
    User,
    /// Journi.
    Assistant,
}

/// What a [`ChatMessage`] carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageContent {
    /// Markdown text.
    Text(String),
    /// A local file, such as a generated image.
    File {
        /// Where the file is.
        path: PathBuf,
        /// What the file is.
        mime_type: Mime,
    },
}

/// One chat bubble.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// The sender.
    pub role: Role,
    /// The body.
    pub content: MessageContent,
}

impl ChatMessage {
    /// Creates a text bubble from the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Creates a text bubble from the assistant.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Returns the text of a text bubble.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::File { .. } => None,
        }
    }
}

/// The greeting shown before every answer.
pub fn welcome_message() -> ChatMessage {
    ChatMessage::assistant(
        "🧳 **I'm Journi, your AI travel companion!** I'll use multiple \
         specialized agents to help you plan your perfect trip.",
    )
}

/// Renders one finished step: what the agent thought and did, what the
/// tools reported, and what went wrong.
pub fn messages_from_step(step: &ActionStep) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::assistant(step_summary(step))];

    let observations = step
        .observations
        .as_deref()
        .map(str::trim)
        .filter(|obs| !obs.is_empty());
    if let Some(observations) = observations {
        let logs = EXECUTION_LOGS.replace(observations, "");
        let first_tool = step.tool_calls.first().map(|call| call.name.as_str());
        let is_web = first_tool.is_some_and(|name| WEB_TOOLS.contains(&name));
        if is_web && !logs.contains("Generated image") {
            messages.push(ChatMessage::assistant(format!(
                "**Search Results:**\n\n{logs}"
            )));
        } else {
            messages.push(ChatMessage::assistant(logs.into_owned()));
        }
    }

    if let Some(error) = &step.error {
        messages.push(ChatMessage::assistant(format!("**Error:** {error}")));
    }
    messages
}

fn step_summary(step: &ActionStep) -> String {
    let mut text = format!("**Step {}**", step.step_number);

    let output = step.model_output.trim();
    let thought = THOUGHT
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(output);
    if !thought.is_empty() {
        text.push_str(&format!("\n\nThought: {thought}"));
    }

    if !step.tool_calls.is_empty() {
        text.push_str("\n\nActions:");
        for call in &step.tool_calls {
            text.push_str(&format!("\n- `{}` {}", call.name, call.arguments));
        }
    }
    text
}

/// Renders the final answer. A bare image path becomes a file bubble.
pub fn final_answer_message(answer: &str) -> ChatMessage {
    let trimmed = answer.trim();
    if let Some(mime_type) = image_mime(trimmed) {
        return ChatMessage {
            role: Role::Assistant,
            content: MessageContent::File {
                path: PathBuf::from(trimmed),
                mime_type,
            },
        };
    }
    ChatMessage::assistant(format!("**Final answer:**\n{answer}\n"))
}

fn image_mime(candidate: &str) -> Option<Mime> {
    if candidate.is_empty() || candidate.contains(char::is_whitespace) {
        return None;
    }
    let ext = Path::new(candidate).extension()?.to_str()?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some(mime::IMAGE_PNG),
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "gif" => Some(mime::IMAGE_GIF),
        "webp" => "image/webp".parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use journi_model::ToolCallRequest;
    use serde_json::json;

    use super::*;

    fn call(name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_owned(),
            name: name.to_owned(),
            arguments: json!({ "query": "Lisbon trams" }),
        }
    }

    #[test]
    fn test_step_with_thought() {
        let step = ActionStep {
            step_number: 2,
            model_output: "Thought: I should search.\nCode: ignored".to_owned(),
            tool_calls: vec![call("web_search")],
            observations: Some("Execution logs:\n## Search Results".to_owned()),
            error: None,
        };
        let messages = messages_from_step(&step);
        assert_eq!(
            messages,
            vec![
                ChatMessage::assistant(
                    "**Step 2**\n\nThought: I should search.\n\nActions:\n\
                     - `web_search` {\"query\":\"Lisbon trams\"}"
                ),
                ChatMessage::assistant("**Search Results:**\n\n## Search Results"),
            ]
        );
    }

    #[test]
    fn test_step_without_thought_marker() {
        let step = ActionStep {
            step_number: 1,
            model_output: "  Checking the weather.  ".to_owned(),
            tool_calls: vec![call("get_weather_forecast")],
            observations: Some("🌦️ Weather forecast".to_owned()),
            error: Some("Error executing tool 'x': boom".to_owned()),
        };
        let messages = messages_from_step(&step);
        assert_eq!(messages.len(), 3);
        assert!(
            messages[0]
                .text()
                .unwrap()
                .starts_with("**Step 1**\n\nThought: Checking the weather.")
        );
        assert_eq!(messages[1].text(), Some("🌦️ Weather forecast"));
        assert_eq!(
            messages[2].text(),
            Some("**Error:** Error executing tool 'x': boom")
        );
    }

    #[test]
    fn test_bare_step() {
        let step = ActionStep {
            step_number: 3,
            ..Default::default()
        };
        assert_eq!(
            messages_from_step(&step),
            vec![ChatMessage::assistant("**Step 3**")]
        );
    }

    #[test]
    fn test_final_answer_message() {
        assert_eq!(
            final_answer_message("Enjoy Lisbon!"),
            ChatMessage::assistant("**Final answer:**\nEnjoy Lisbon!\n")
        );
        assert_eq!(
            final_answer_message("/tmp/journi-1-0.png\n"),
            ChatMessage {
                role: Role::Assistant,
                content: MessageContent::File {
                    path: PathBuf::from("/tmp/journi-1-0.png"),
                    mime_type: mime::IMAGE_PNG,
                },
            }
        );
        assert!(final_answer_message("see /tmp/a.png").text().is_some());
    }

    #[test]
    fn test_welcome_message() {
        let message = welcome_message();
        assert_eq!(message.role, Role::Assistant);
        assert!(message.text().unwrap().contains("I'm Journi"));
    }
}
