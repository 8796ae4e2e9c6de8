use serde::Deserialize;
use serde_json::{Value, json};

use super::Agent;
use crate::tool::{Error as ToolError, Tool, ToolResult};

#[derive(Deserialize)]
pub struct ManagedAgentInput {
    task: String,
}

/// Runs another agent as a tool call.
pub struct ManagedAgentTool {
    agent: Agent,
    schema: Value,
}

impl ManagedAgentTool {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            schema: json!({
                "type": "object",
                "properties": {
                    "task": {
                        "type": "string",
                        "description": "Long detailed description of the \
                            task, with as much context as possible."
                    }
                },
                "required": ["task"]
            }),
        }
    }
}

fn delegated_task(name: &str, task: &str) -> String {
    format!(
        "You're a helpful agent named '{name}'.
You have been submitted this task by your manager.
---
Task:
{task}
---
You're helping your manager solve a wider task: so make sure to not provide \
a one-line answer, but give as much information as possible to give them a \
clear understanding of the answer.

Put everything in your final_answer tool call. Anything you do not pass as \
an argument to final_answer will be lost. Even if you could not solve the \
task, return as much context as possible so that your manager can act upon \
this feedback."
    )
}

impl Tool for ManagedAgentTool {
    type Input = ManagedAgentInput;

    fn name(&self) -> &str {
        self.agent.name()
    }

    fn description(&self) -> &str {
        self.agent.description()
    }

    fn parameter_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let agent = self.agent.clone();
        async move {
            let name = agent.name().to_owned();
            debug!("delegating to {name}: {}", input.task);
            let answer = agent
                .spawn_run(delegated_task(&name, &input.task), true)
                .final_answer()
                .await
                .map_err(|err| ToolError::execution_error().with_reason(err.to_string()))?;
            Ok(format!(
                "Here is the final answer from your managed agent '{name}':\n{answer}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegated_task_mentions_agent_and_task() {
        let task = delegated_task("logistics_agent", "Weather in Oslo for 3 days");
        assert!(task.starts_with("You're a helpful agent named 'logistics_agent'."));
        assert!(task.contains("Task:\nWeather in Oslo for 3 days\n---"));
    }
}
