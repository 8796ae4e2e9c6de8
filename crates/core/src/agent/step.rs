use std::error::Error as StdError;
use std::fmt::{self, Display};

use journi_model::ToolCallRequest;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What an agent did in one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionStep {
    /// 1-based position of the step within its run.
    pub step_number: usize,
    /// Text the model produced in this step.
    pub model_output: String,
    /// Tools the model asked for.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Output of the tools that succeeded, excluding the final answer.
    pub observations: Option<String>,
    /// Model or tool failures of this step.
    pub error: Option<String>,
}

impl ActionStep {
    pub(crate) fn new(step_number: usize) -> Self {
        Self {
            step_number,
            ..Default::default()
        }
    }
}

/// An update from a running agent.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentStep {
    /// A step has finished.
    Action(ActionStep),
    /// The run has finished with this answer. Always the last update.
    FinalAnswer(String),
}

/// The error type for [`AgentRun::final_answer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunError {
    /// The run ended without a final answer, because it was cancelled or
    /// its task panicked.
    Interrupted,
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Interrupted => {
                write!(f, "the agent run ended without a final answer")
            }
        }
    }
}

impl StdError for RunError {}

/// A handle to a running agent, yielding its steps as they finish.
///
/// Dropping the handle cancels the run.
pub struct AgentRun {
    steps_rx: mpsc::UnboundedReceiver<AgentStep>,
    handle: JoinHandle<()>,
}

impl AgentRun {
    pub(crate) fn new(
        steps_rx: mpsc::UnboundedReceiver<AgentStep>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self { steps_rx, handle }
    }

    /// Waits for the next update. Returns `None` once the run is over.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe.
    #[inline]
    pub async fn next_step(&mut self) -> Option<AgentStep> {
        self.steps_rx.recv().await
    }

    /// Skips the remaining steps and waits for the final answer.
    pub async fn final_answer(mut self) -> Result<String, RunError> {
        while let Some(step) = self.next_step().await {
            if let AgentStep::FinalAnswer(answer) = step {
                return Ok(answer);
            }
        }
        Err(RunError::Interrupted)
    }
}

impl Drop for AgentRun {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
