use std::collections::HashMap;

use futures_util::future::join_all;
use journi_model::{ModelTool, ToolCallRequest};
use tracing::Instrument;

use crate::tool::{Error, ToolObject, ToolResult};

/// What came back from one tool call.
#[derive(Clone, Debug)]
pub struct ToolCallOutcome {
    pub id: String,
    pub name: String,
    pub result: ToolResult,
}

/// An executor that handles tool call requests from the model.
pub struct Executor {
    tools: HashMap<String, Box<dyn ToolObject>>,
}

impl Executor {
    /// Later tools replace earlier ones with the same name.
    pub fn with_tools(tools: Vec<Box<dyn ToolObject>>) -> Self {
        let mut tool_map = HashMap::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name();
            tool_map.insert(name.to_owned(), tool);
        }
        let tools = tool_map;
        Self { tools }
    }

    /// Returns the tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        let mut definitions: Vec<_> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    fn tool_names(&self) -> String {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.join(", ")
    }

    /// Runs a batch of tool calls concurrently. Outcomes keep the order of
    /// `requests`.
    pub async fn run(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Vec<ToolCallOutcome> {
        let span = debug_span!("tool executor", count = requests.len());
        let futures = span.in_scope(|| {
            requests
                .into_iter()
                .map(|req| {
                    let ToolCallRequest {
                        id,
                        name,
                        arguments,
                    } = req;
                    let fut = match self.tools.get(&name) {
                        Some(tool) => {
                            trace!("spawning a tool ({id}) with args: {arguments:?}");
                            Some(tool.execute(arguments))
                        }
                        None => {
                            warn!("tool not found: {name}");
                            None
                        }
                    };
                    let available = fut.is_none().then(|| self.tool_names());
                    let tool_span = debug_span!("tool", name = %name, id = %id);
                    async move {
                        let result = match fut {
                            Some(fut) => fut.await,
                            None => Err(Error::not_found().with_reason(format!(
                                "Unknown tool '{name}', should be one of: {}",
                                available.unwrap_or_default()
                            ))),
                        };
                        if let Err(err) = &result {
                            debug!("tool failed: {err}");
                        }
                        ToolCallOutcome { id, name, result }
                    }
                    .instrument(tool_span)
                })
                .collect::<Vec<_>>()
        });
        join_all(futures).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::{AnyTool, ErrorKind, Tool};

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
        #[serde(default)]
        delay_ms: u64,
    }

    struct EchoTool {
        name: &'static str,
        schema: Value,
    }

    impl EchoTool {
        fn named(name: &'static str) -> Self {
            Self {
                name,
                schema: json!({"type": "object"}),
            }
        }
    }

    impl Tool for EchoTool {
        type Input = EchoInput;

        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echoes text back."
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            async move {
                tokio::time::sleep(Duration::from_millis(input.delay_ms)).await;
                Ok(input.text)
            }
        }
    }

    fn request(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[test]
    fn test_definitions_sorted() {
        let executor = Executor::with_tools(vec![
            Box::new(AnyTool(EchoTool::named("zeta"))),
            Box::new(AnyTool(EchoTool::named("alpha"))),
        ]);
        let names: Vec<_> = executor
            .definitions()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_batch() {
        let executor =
            Executor::with_tools(vec![Box::new(AnyTool(EchoTool::named("echo")))]);

        let outcomes = executor
            .run(vec![
                request("call_1", "echo", json!({"text": "slow", "delay_ms": 50})),
                request("call_2", "echo", json!({"text": "fast"})),
                request("call_3", "missing", json!({})),
                request("call_4", "echo", json!({"words": 1})),
            ])
            .await;

        let ids: Vec<_> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["call_1", "call_2", "call_3", "call_4"]);
        assert_eq!(outcomes[0].result, Ok("slow".to_owned()));
        assert_eq!(outcomes[1].result, Ok("fast".to_owned()));
        assert_eq!(
            outcomes[2].result.as_ref().unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            outcomes[3].result.as_ref().unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
