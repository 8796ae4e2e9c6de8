use std::future::ready;
use std::sync::{Arc, Mutex};

use journi_model::ModelMessage;
use journi_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::tool::{Tool, ToolResult};
use crate::{AgentBuilder, AgentStep};

#[derive(Deserialize)]
struct ClockInput {
    destination: String,
}

struct ClockTool {
    schema: Value,
}

impl Default for ClockTool {
    fn default() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {"destination": {"type": "string"}},
                "required": ["destination"]
            }),
        }
    }
}

impl Tool for ClockTool {
    type Input = ClockInput;

    fn name(&self) -> &str {
        "get_local_time"
    }

    fn description(&self) -> &str {
        "Gets the local time of a destination."
    }

    fn parameter_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(format!("It is 09:00 AM in {}", input.destination)))
    }
}

fn clock_call(id: &str) -> PresetEvent {
    PresetEvent::tool_call(id, "get_local_time", json!({"destination": "Tokyo"}))
}

fn final_answer_call(id: &str, answer: &str) -> PresetEvent {
    PresetEvent::tool_call(id, "final_answer", json!({ "answer": answer }))
}

async fn collect_steps(mut run: crate::AgentRun) -> Vec<AgentStep> {
    let mut steps = vec![];
    while let Some(step) = run.next_step().await {
        steps.push(step);
    }
    steps
}

#[tokio::test]
async fn test_tool_then_final_answer() {
    let provider = TestModelProvider::with_script([
        PresetResponse::with_events([
            PresetEvent::text("Thought: I need the time."),
            clock_call("call_1"),
        ]),
        PresetResponse::with_events([final_answer_call(
            "call_2",
            "It is 9 AM in Tokyo.",
        )]),
    ]);
    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_system_prompt("You help travelers.")
        .with_tool(ClockTool::default())
        .build();

    let steps = collect_steps(agent.run("What time is it in Tokyo?")).await;
    assert_eq!(steps.len(), 3);

    let AgentStep::Action(first) = &steps[0] else {
        panic!("expected an action step");
    };
    assert_eq!(first.step_number, 1);
    assert_eq!(first.model_output, "Thought: I need the time.");
    assert_eq!(first.tool_calls.len(), 1);
    assert_eq!(first.observations.as_deref(), Some("It is 09:00 AM in Tokyo"));
    assert_eq!(first.error, None);

    let AgentStep::Action(second) = &steps[1] else {
        panic!("expected an action step");
    };
    assert_eq!(second.step_number, 2);
    assert_eq!(second.observations, None);
    assert_eq!(
        steps[2],
        AgentStep::FinalAnswer("It is 9 AM in Tokyo.".to_owned())
    );

    let requests = provider.requests();
    assert_eq!(
        requests[0].messages[0],
        ModelMessage::System("You help travelers.".to_owned())
    );
    let tool_names: Vec<_> =
        requests[0].tools.iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(tool_names, ["final_answer", "get_local_time"]);
    // System, user, assistant, tool result.
    assert_eq!(requests[1].messages.len(), 4);
}

#[tokio::test]
async fn test_text_answer_without_tool_calls() {
    let provider = TestModelProvider::with_script([PresetResponse::with_events([
        PresetEvent::text("Pack "),
        PresetEvent::text("an umbrella."),
    ])]);
    let agent = AgentBuilder::with_model_provider(provider).build();
    let answer = agent.run_to_completion("Anything for London?").await;
    assert_eq!(answer, Ok("Pack an umbrella.".to_owned()));
}

#[tokio::test]
async fn test_model_errors_recorded_then_final_error() {
    let agent = AgentBuilder::with_model_provider(TestModelProvider::default())
        .with_max_steps(2)
        .build();
    let steps = collect_steps(agent.run("Hello")).await;
    assert_eq!(steps.len(), 3);
    for step in &steps[..2] {
        let AgentStep::Action(action) = step else {
            panic!("expected an action step");
        };
        assert!(
            action
                .error
                .as_deref()
                .unwrap()
                .starts_with("Error while generating output:")
        );
    }
    let AgentStep::FinalAnswer(answer) = &steps[2] else {
        panic!("expected a final answer");
    };
    assert!(answer.starts_with("Error in generating final LLM output:"));
}

#[tokio::test]
async fn test_max_steps_final_call_without_tools() {
    let provider = TestModelProvider::with_script([
        PresetResponse::with_events([clock_call("call_1")]),
        PresetResponse::with_events([clock_call("call_2")]),
        PresetResponse::with_events([PresetEvent::text("Best guess: 9 AM.")]),
    ]);
    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_tool(ClockTool::default())
        .with_max_steps(2)
        .build();

    let answer = agent.run_to_completion("Time in Tokyo?").await.unwrap();
    assert_eq!(answer, "Best guess: 9 AM.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    let last = &requests[2];
    assert!(last.tools.is_empty());
    let Some(ModelMessage::User(prompt)) = last.messages.last() else {
        panic!("expected a user prompt");
    };
    assert!(prompt.ends_with("user task:\nTime in Tokyo?"));
}

#[tokio::test]
async fn test_tool_errors_reported() {
    let provider = TestModelProvider::with_script([
        PresetResponse::with_events([
            PresetEvent::tool_call("call_1", "book_flight", json!({})),
            PresetEvent::tool_call("call_2", "get_local_time", json!({})),
        ]),
        PresetResponse::with_events([PresetEvent::text("Sorry.")]),
    ]);
    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_tool(ClockTool::default())
        .build();

    let steps = collect_steps(agent.run("Book me a flight")).await;
    let AgentStep::Action(first) = &steps[0] else {
        panic!("expected an action step");
    };
    let error = first.error.as_deref().unwrap();
    assert!(error.contains("Error executing tool 'book_flight': Unknown tool"));
    assert!(error.contains("Error executing tool 'get_local_time':"));
    assert_eq!(first.observations, None);

    // The model sees the failures as tool results.
    let second_request = &provider.requests()[1];
    let ModelMessage::Tool(result) = &second_request.messages[2] else {
        panic!("expected a tool result");
    };
    assert_eq!(result.id, "call_1");
    assert!(result.content.starts_with("Error: Unknown tool 'book_flight'"));
}

#[tokio::test]
async fn test_memory_persists_until_reset() {
    let provider = TestModelProvider::with_script([
        PresetResponse::with_events([PresetEvent::text("Lisbon is sunny.")]),
        PresetResponse::with_events([PresetEvent::text("Porto is cloudy.")]),
    ]);
    let agent = AgentBuilder::with_model_provider(provider.clone()).build();

    assert_eq!(
        agent.run_to_completion("Weather in Lisbon?").await.unwrap(),
        "Lisbon is sunny."
    );
    assert_eq!(
        agent.run_to_completion("And Porto?").await.unwrap(),
        "Porto is cloudy."
    );
    assert_eq!(provider.requests()[1].messages.len(), 3);

    agent.reset().await;
    assert!(agent.memory().await.is_empty());
    assert_eq!(
        agent.run_to_completion("Weather in Lisbon?").await.unwrap(),
        "Lisbon is sunny."
    );
}

#[tokio::test]
async fn test_managed_agent() {
    let worker_provider = TestModelProvider::with_script([PresetResponse::with_events(
        [final_answer_call("w1", "Rain expected in Oslo.")],
    )]);
    let worker = AgentBuilder::with_model_provider(worker_provider.clone())
        .with_name("logistics_agent")
        .with_description("Handles weather and time questions.")
        .build();

    let manager_provider = TestModelProvider::with_script([
        PresetResponse::with_events([PresetEvent::tool_call(
            "m1",
            "logistics_agent",
            json!({"task": "Weather in Oslo"}),
        )]),
        PresetResponse::with_events([final_answer_call("m2", "Bring a raincoat.")]),
    ]);
    let manager = AgentBuilder::with_model_provider(manager_provider.clone())
        .with_managed_agent(worker.clone())
        .build();

    let steps = collect_steps(manager.run("Plan my Oslo day")).await;
    let AgentStep::Action(first) = &steps[0] else {
        panic!("expected an action step");
    };
    assert_eq!(
        first.observations.as_deref(),
        Some(
            "Here is the final answer from your managed agent \
             'logistics_agent':\nRain expected in Oslo."
        )
    );
    assert_eq!(
        steps.last(),
        Some(&AgentStep::FinalAnswer("Bring a raincoat.".to_owned()))
    );

    let definition = manager_provider.requests()[0]
        .tools
        .iter()
        .find(|tool| tool.name == "logistics_agent")
        .cloned()
        .unwrap();
    assert_eq!(definition.description, "Handles weather and time questions.");

    let ModelMessage::User(task) = &worker_provider.requests()[0].messages[0] else {
        panic!("expected the delegated task");
    };
    assert!(task.contains("named 'logistics_agent'"));
    assert!(task.contains("Weather in Oslo"));
}

#[tokio::test]
async fn test_transcript_callback() {
    let provider = TestModelProvider::with_script([PresetResponse::with_events([
        PresetEvent::text("Hola"),
        PresetEvent::text("!"),
    ])]);
    let deltas = Arc::new(Mutex::new(String::new()));
    let agent = AgentBuilder::with_model_provider(provider)
        .on_transcript({
            let deltas = Arc::clone(&deltas);
            move |delta| deltas.lock().unwrap().push_str(&delta)
        })
        .build();
    agent.run_to_completion("Say hi in Spanish").await.unwrap();
    assert_eq!(*deltas.lock().unwrap(), "Hola!");
}
