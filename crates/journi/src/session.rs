use std::sync::{Arc, OnceLock, Weak};

use journi_core::{Agent, AgentStep, ModelClient, RunError};
use journi_model::ModelProvider;
use tokio::sync::{Mutex, mpsc};

use crate::Config;
use crate::chat::{
    ChatMessage, final_answer_message, messages_from_step, welcome_message,
};
use crate::team::build_team;
use crate::tools::Toolbox;

type MessageFn = Arc<dyn Fn(ChatMessage) + Send + Sync>;
type IdleFn = Arc<dyn Fn() + Send + Sync>;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    model_client: ModelClient,
    config: Config,
    on_message: Option<MessageFn>,
    on_idle: Option<IdleFn>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a session builder sharing an existing model client.
    pub fn with_model_client(model_client: ModelClient) -> Self {
        Self {
            model_client,
            config: Config::offline(),
            on_message: None,
            on_idle: None,
        }
    }

    /// Sets the tool settings. Defaults to [`Config::offline`].
    #[inline]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Attaches a callback receiving every chat bubble.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(ChatMessage) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Arc::new(on_message));
        self
    }

    /// Attaches a callback to be invoked when a message has been answered.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Arc::new(on_idle));
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let toolbox = Toolbox::new(self.config);
        let agent = build_team(self.model_client, &toolbox);
        Session {
            inner: Arc::new(SessionInner {
                agent,
                on_message: self.on_message,
                on_idle: self.on_idle,
                turn: Mutex::new(()),
                queue: OnceLock::new(),
            }),
        }
    }
}

/// A chat session with the travel team, like a window that displays
/// messages and has an input box.
///
/// The coordinator remembers earlier messages until [`Session::reset`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    agent: Agent,
    on_message: Option<MessageFn>,
    on_idle: Option<IdleFn>,
    turn: Mutex<()>,
    queue: OnceLock<mpsc::UnboundedSender<String>>,
}

impl Session {
    /// Sends a message to the session.
    ///
    /// The answer streams to the `on_message` callback, followed by a call
    /// to `on_idle`. Messages are answered one at a time, in the order
    /// they were sent. Must be called within a tokio runtime.
    pub fn send_message(&self, message: &str) {
        let queue = self.inner.queue.get_or_init(|| {
            let (message_tx, message_rx) = mpsc::unbounded_channel();
            tokio::spawn(answer_queued(
                Arc::downgrade(&self.inner),
                message_rx,
            ));
            message_tx
        });
        if queue.send(message.to_owned()).is_err() {
            error!("session worker has stopped, dropping message");
        }
    }

    /// Forgets the conversation so far.
    pub async fn reset(&self) {
        let _turn = self.inner.turn.lock().await;
        self.inner.agent.reset().await;
    }

    /// The coordinator agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.inner.agent
    }
}

/// Answers queued messages until the session is dropped.
async fn answer_queued(
    inner: Weak<SessionInner>,
    mut message_rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(message) = message_rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.answer(message).await;
    }
    debug!("session worker stopped");
}

impl SessionInner {
    async fn answer(&self, message: String) {
        let _turn = self.turn.lock().await;
        self.emit(welcome_message());

        let mut run = self.agent.run(message);
        let mut answer = None;
        while let Some(step) = run.next_step().await {
            match step {
                AgentStep::Action(step) => {
                    for message in messages_from_step(&step) {
                        self.emit(message);
                    }
                }
                AgentStep::FinalAnswer(final_answer) => {
                    answer = Some(final_answer);
                }
            }
        }

        match answer {
            Some(answer) => self.emit(final_answer_message(&answer)),
            None => {
                error!("run ended without a final answer");
                self.emit(ChatMessage::assistant(format!(
                    "**Error:** {}",
                    RunError::Interrupted
                )));
            }
        }

        if let Some(on_idle) = &self.on_idle {
            on_idle();
        }
    }

    fn emit(&self, message: ChatMessage) {
        if let Some(on_message) = &self.on_message {
            on_message(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use journi_test_model::{PresetEvent, PresetResponse, TestModelProvider};
    use journi_model::ModelMessage;
    use serde_json::json;

    use super::*;
    use crate::chat::Role;

    enum Event {
        Message(ChatMessage),
        Idle,
    }

    fn session(
        provider: TestModelProvider,
    ) -> (Session, mpsc::UnboundedReceiver<Event>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = SessionBuilder::with_model_provider(provider)
            .with_config(Config::offline())
            .on_message({
                let event_tx = event_tx.clone();
                move |message| {
                    event_tx.send(Event::Message(message)).ok();
                }
            })
            .on_idle(move || {
                event_tx.send(Event::Idle).ok();
            })
            .build();
        (session, event_rx)
    }

    async fn collect_turn(
        event_rx: &mut mpsc::UnboundedReceiver<Event>,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![];
        while let Some(event) = event_rx.recv().await {
            match event {
                Event::Message(message) => messages.push(message),
                Event::Idle => break,
            }
        }
        messages
    }

    #[tokio::test]
    async fn test_message_streams_steps_and_answer() {
        let provider = TestModelProvider::with_script([
            PresetResponse::with_events([
                PresetEvent::text("Thought: Show Kyoto first."),
                PresetEvent::tool_call(
                    "call_1",
                    "generate_image",
                    json!({ "prompt": "Kyoto" }),
                ),
            ]),
            PresetResponse::with_events([PresetEvent::tool_call(
                "call_2",
                "final_answer",
                json!({ "answer": "Kyoto is lovely in autumn." }),
            )]),
        ]);
        let (session, mut event_rx) = session(provider.clone());

        session.send_message("I want to visit Kyoto");
        let messages = collect_turn(&mut event_rx).await;

        let texts: Vec<_> = messages.iter().map(|m| m.text().unwrap()).collect();
        assert_eq!(texts.len(), 5);
        assert_eq!(texts[0], welcome_message().text().unwrap());
        assert!(texts[1].starts_with("**Step 1**\n\nThought: Show Kyoto first."));
        assert!(texts[2].starts_with("✨ Destination Preview: Kyoto ✨"));
        assert!(texts[3].starts_with("**Step 2**\n\nActions:\n- `final_answer`"));
        assert!(texts[4].starts_with(
            "**Final answer:**\n### Travel summary (short version):\n\
             Kyoto is lovely in autumn."
        ));
        assert!(messages.iter().all(|m| m.role == Role::Assistant));

        let first = &provider.requests()[0];
        assert!(first.tools.iter().any(|tool| tool.name == "logistics_agent"));
    }

    #[tokio::test]
    async fn test_memory_is_kept_between_messages() {
        let provider = TestModelProvider::with_script([
            PresetResponse::with_events([PresetEvent::text("Lisbon it is.")]),
            PresetResponse::with_events([PresetEvent::text("Try Porto too.")]),
        ]);
        let (session, mut event_rx) = session(provider.clone());

        session.send_message("Where should I go?");
        let first = collect_turn(&mut event_rx).await;
        assert_eq!(
            first.last().and_then(ChatMessage::text),
            Some("**Final answer:**\nLisbon it is.\n")
        );

        session.send_message("Anything else?");
        let second = collect_turn(&mut event_rx).await;
        assert_eq!(
            second.last().and_then(ChatMessage::text),
            Some("**Final answer:**\nTry Porto too.\n")
        );
        // The second request carries the first exchange.
        assert_eq!(provider.requests()[1].assistant_turns(), 1);

        session.reset().await;
        assert!(session.agent().memory().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_messages_are_answered_in_order() {
        let questions = ["Where is warm?", "What about May?", "And in June?"];
        let provider = TestModelProvider::with_script(
            ["Try Seville.", "Crete in May.", "Norway in June."]
                .map(|answer| {
                    PresetResponse::with_events([PresetEvent::text(answer)])
                }),
        );
        let (session, mut event_rx) = session(provider.clone());

        for question in questions {
            session.send_message(question);
        }
        for answer in ["Try Seville.", "Crete in May.", "Norway in June."] {
            let turn = collect_turn(&mut event_rx).await;
            assert_eq!(
                turn.last().and_then(ChatMessage::text),
                Some(format!("**Final answer:**\n{answer}\n").as_str())
            );
        }

        let asked: Vec<_> = provider
            .requests()
            .iter()
            .map(|req| {
                req.messages.iter().rev().find_map(|msg| match msg {
                    ModelMessage::User(text) => Some(text.clone()),
                    _ => None,
                })
            })
            .collect();
        assert_eq!(asked, questions.map(|q| Some(q.to_owned())));
    }
}
