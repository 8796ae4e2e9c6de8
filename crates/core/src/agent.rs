mod builder;
mod managed;
mod step;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use journi_model::{
    AssistantMessage, GenerationOptions, ModelMessage, ModelProviderError,
    ModelRequest, ModelTool, ToolCallRequest, ToolCallResult,
};
use tokio::sync::{Mutex, mpsc};
use tracing::Instrument;

pub use builder::AgentBuilder;
pub use step::{ActionStep, AgentRun, AgentStep, RunError};

use crate::conversation::Conversation;
use crate::model_client::{ModelClient, ModelClientResponse};
use crate::tool::{Executor as ToolExecutor, FINAL_ANSWER_TOOL};

/// Steps an agent may take when the builder does not say otherwise.
pub const DEFAULT_MAX_STEPS: usize = 6;

const STUCK_AGENT_PROMPT: &str = "An agent tried to answer a user query but \
it got stuck and failed to do so. You are tasked with providing an answer \
instead. Here is the agent's memory:";

type TranscriptFn = Arc<dyn Fn(String) + Send + Sync>;

/// An agent: a system prompt, a set of tools, and a memory of past turns.
///
/// Cloning an agent is cheap; clones share the memory. Runs on the same
/// agent are serialized, so a second task waits until the first one has
/// produced its final answer.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    name: String,
    description: String,
    system_prompt: String,
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    max_steps: usize,
    options: GenerationOptions,
    on_transcript: Option<TranscriptFn>,
    memory: Mutex<Conversation>,
}

impl Agent {
    /// Returns the name of this agent.
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the description shown to a managing agent.
    #[inline]
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// Returns the step budget of a run.
    #[inline]
    pub fn max_steps(&self) -> usize {
        self.inner.max_steps
    }

    /// Returns the names of the tools this agent can call, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        self.inner
            .tool_executor
            .definitions()
            .into_iter()
            .map(|tool| tool.name)
            .collect()
    }

    /// Starts working on `task` in a spawned task.
    ///
    /// Must be called within a tokio runtime. Dropping the returned
    /// [`AgentRun`] cancels the run.
    #[inline]
    pub fn run<S: Into<String>>(&self, task: S) -> AgentRun {
        self.spawn_run(task.into(), false)
    }

    /// Runs `task` and waits for the final answer.
    pub async fn run_to_completion<S: Into<String>>(
        &self,
        task: S,
    ) -> Result<String, RunError> {
        self.run(task).final_answer().await
    }

    /// Forgets every previous turn.
    pub async fn reset(&self) {
        self.inner.memory.lock().await.clear();
    }

    /// Returns a snapshot of the memory.
    pub async fn memory(&self) -> Conversation {
        self.inner.memory.lock().await.clone()
    }

    pub(crate) fn spawn_run(&self, task: String, reset: bool) -> AgentRun {
        let (steps_tx, steps_rx) = mpsc::unbounded_channel();
        let inner = Arc::clone(&self.inner);
        let span = info_span!("agent run", agent = %inner.name);
        let handle = tokio::spawn(
            async move { inner.run_steps(task, reset, steps_tx).await }
                .instrument(span),
        );
        AgentRun::new(steps_rx, handle)
    }
}

impl AgentInner {
    async fn run_steps(
        &self,
        task: String,
        reset: bool,
        steps_tx: mpsc::UnboundedSender<AgentStep>,
    ) {
        let mut memory = self.memory.lock().await;
        if reset {
            memory.clear();
        }
        info!("new task: {task}");
        memory.push(ModelMessage::User(task.clone()), task.as_str());

        let tools = self.tool_executor.definitions();
        for step_number in 1..=self.max_steps {
            let (action, final_answer) =
                self.step(&mut memory, step_number, &tools).await;
            steps_tx.send(AgentStep::Action(action)).ok();
            if let Some(answer) = final_answer {
                debug!("final answer after {step_number} step(s)");
                steps_tx.send(AgentStep::FinalAnswer(answer)).ok();
                return;
            }
        }

        warn!("reached max steps ({})", self.max_steps);
        let answer = self.provide_final_answer(&mut memory, &task).await;
        steps_tx.send(AgentStep::FinalAnswer(answer)).ok();
    }

    /// Runs one step: a model call and the tools it asked for. Returns the
    /// final answer alongside the step once there is one.
    async fn step(
        &self,
        memory: &mut Conversation,
        step_number: usize,
        tools: &[ModelTool],
    ) -> (ActionStep, Option<String>) {
        let mut action = ActionStep::new(step_number);

        let request = self.request(memory, tools.to_vec());
        let mut resp = match self.call_model(request).await {
            Ok(resp) => resp,
            Err(err) => {
                warn!("step {step_number} failed: {err}");
                action.error = Some(format!("Error while generating output: {err}"));
                return (action, None);
            }
        };

        if assign_missing_ids(&mut resp.tool_calls, step_number) {
            // The provider's own message refers to the blank ids.
            resp.opaque_msg = None;
        }
        action.model_output = resp.transcript.clone();
        action.tool_calls = resp.tool_calls.clone();
        memory.push(assistant_message(&resp), resp.transcript.as_str());

        if resp.tool_calls.is_empty() {
            let answer = resp.transcript.trim();
            if answer.is_empty() {
                action.error =
                    Some("Model returned neither text nor tool calls.".to_owned());
                return (action, None);
            }
            return (action, Some(answer.to_owned()));
        }

        let outcomes = self.tool_executor.run(resp.tool_calls).await;
        let mut observations = vec![];
        let mut errors = vec![];
        let mut final_answer = None;
        for outcome in outcomes {
            let content = match &outcome.result {
                Ok(output) => output.clone(),
                Err(err) => {
                    let reason = err.reason();
                    errors.push(format!(
                        "Error executing tool '{}': {reason}",
                        outcome.name
                    ));
                    format!("Error: {reason}")
                }
            };
            memory.push(
                ModelMessage::Tool(ToolCallResult {
                    id: outcome.id,
                    content: content.clone(),
                }),
                content.as_str(),
            );
            match outcome.result {
                Ok(output) if outcome.name == FINAL_ANSWER_TOOL => {
                    final_answer = Some(output);
                }
                Ok(_) => observations.push(content),
                Err(_) => {}
            }
        }

        if !observations.is_empty() {
            action.observations = Some(observations.join("\n\n"));
        }
        if !errors.is_empty() {
            action.error = Some(errors.join("\n"));
        }
        (action, final_answer)
    }

    /// Asks for an answer from what is in memory, without tools.
    async fn provide_final_answer(
        &self,
        memory: &mut Conversation,
        task: &str,
    ) -> String {
        let mut messages = vec![ModelMessage::System(STUCK_AGENT_PROMPT.to_owned())];
        messages.extend(memory.messages().cloned());
        messages.push(ModelMessage::User(format!(
            "Based on the above, please provide an answer to the following \
             user task:\n{task}"
        )));
        let request = ModelRequest {
            messages,
            tools: vec![],
            options: self.options,
        };

        match self.call_model(request).await {
            Ok(resp) if !resp.transcript.trim().is_empty() => {
                let answer = resp.transcript.trim().to_owned();
                memory.push(
                    ModelMessage::Assistant(AssistantMessage::text(answer.clone())),
                    answer.as_str(),
                );
                answer
            }
            Ok(_) => "Error in generating final LLM output:\nthe model returned \
                      an empty response."
                .to_owned(),
            Err(err) => {
                error!("final answer request failed: {err}");
                format!("Error in generating final LLM output:\n{err}")
            }
        }
    }

    fn request(&self, memory: &Conversation, tools: Vec<ModelTool>) -> ModelRequest {
        let mut messages = Vec::with_capacity(memory.items.len() + 1);
        if !self.system_prompt.is_empty() {
            messages.push(ModelMessage::System(self.system_prompt.clone()));
        }
        messages.extend(memory.messages().cloned());
        ModelRequest {
            messages,
            tools,
            options: self.options,
        }
    }

    async fn call_model(
        &self,
        request: ModelRequest,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        let on_transcript = self.on_transcript.clone();
        self.model_client
            .send_request(request, move |delta| {
                if let Some(on_transcript) = &on_transcript {
                    on_transcript(delta);
                }
            })
            .await
    }
}

fn assistant_message(resp: &ModelClientResponse) -> ModelMessage {
    match &resp.opaque_msg {
        Some(opaque_msg) => ModelMessage::Opaque(opaque_msg.clone()),
        None => ModelMessage::Assistant(AssistantMessage {
            content: resp.transcript.clone(),
            tool_calls: resp.tool_calls.clone(),
        }),
    }
}

/// Gives blank tool call ids a stable value. Returns whether any id changed.
fn assign_missing_ids(tool_calls: &mut [ToolCallRequest], step_number: usize) -> bool {
    let mut changed = false;
    for (idx, call) in tool_calls.iter_mut().enumerate() {
        if call.id.is_empty() {
            call.id = format!("call_{step_number}_{idx}");
            changed = true;
        }
    }
    changed
}
