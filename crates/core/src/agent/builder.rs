use std::sync::Arc;

use journi_model::{GenerationOptions, ModelProvider};
use tokio::sync::Mutex;

use super::managed::ManagedAgentTool;
use super::{Agent, AgentInner, DEFAULT_MAX_STEPS};
use crate::model_client::ModelClient;
use crate::tool::{AnyTool, FinalAnswerTool, Tool, ToolObject};

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    name: String,
    description: String,
    system_prompt: String,
    max_steps: usize,
    options: GenerationOptions,
    tools: Vec<Box<dyn ToolObject>>,
    on_transcript: Option<Arc<dyn Fn(String) + Send + Sync>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a new builder sharing an existing model client.
    pub fn with_model_client(model_client: ModelClient) -> Self {
        Self {
            model_client,
            name: "agent".to_owned(),
            description: String::new(),
            system_prompt: String::new(),
            max_steps: DEFAULT_MAX_STEPS,
            options: GenerationOptions::default(),
            tools: vec![Box::new(AnyTool(FinalAnswerTool::default()))],
            on_transcript: None,
        }
    }

    /// Sets the name. A managing agent calls this agent by it.
    #[inline]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the description a managing agent sees.
    #[inline]
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the step budget of a run. At least one step is always taken.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Sets the sampling options sent with every request.
    #[inline]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers a tool. A tool named like an earlier one replaces it.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(AnyTool(tool)));
        self
    }

    /// Exposes `agent` as a tool named after it.
    #[inline]
    pub fn with_managed_agent(mut self, agent: Agent) -> Self {
        self.tools
            .push(Box::new(AnyTool(ManagedAgentTool::new(agent))));
        self
    }

    /// Attaches a callback receiving the model's text as it streams.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let AgentBuilder {
            model_client,
            name,
            description,
            system_prompt,
            max_steps,
            options,
            tools,
            on_transcript,
        } = self;

        let inner = AgentInner {
            name,
            description,
            system_prompt,
            model_client,
            tool_executor: crate::tool::Executor::with_tools(tools),
            max_steps,
            options,
            on_transcript,
            memory: Mutex::default(),
        };
        Agent {
            inner: Arc::new(inner),
        }
    }
}
