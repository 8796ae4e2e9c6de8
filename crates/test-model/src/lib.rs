//! A scripted model for testing agents without a network.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use journi_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<ModelResponseEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.event_idx >= this.events.len() {
            return Poll::Ready(Ok(None));
        }

        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let event = this.events[this.event_idx].clone();
        this.event_idx += 1;
        Poll::Ready(Ok(Some(event)))
    }
}

#[derive(Default)]
struct Shared {
    attempts: HashMap<usize, u64>,
    requests: Vec<ModelRequest>,
}

/// A scripted fake model.
///
/// The script holds one [`PresetResponse`] per assistant turn. The response
/// used for a request is picked by how many assistant turns the request
/// history already contains, so the first request of a conversation gets
/// the first response, the request after one tool round gets the second,
/// and so on. Requests past the end of the script fail.
///
/// Clones share the recorded requests and failure counters.
///
/// # Note
///
/// Every request and response is copied. Use it for tests only.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetResponse>,
    delay: Option<Duration>,
    shared: Arc<Mutex<Shared>>,
}

impl TestModelProvider {
    /// Creates a provider answering with `responses` in order.
    #[inline]
    pub fn with_script(responses: impl Into<Vec<PresetResponse>>) -> Self {
        Self {
            script: responses.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Sets the delay before each event. Defaults to 1ms.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond(&self, req: &ModelRequest) -> Result<TestModelResponse, Error> {
        let turn = req.assistant_turns();
        let mut shared = self.lock();
        shared.requests.push(req.clone());

        let Some(preset) = self.script.get(turn) else {
            return Err(Error {
                message: "script exhausted",
                kind: ErrorKind::Other,
            });
        };

        if let Some(failures) = preset.failures {
            let attempts = shared.attempts.entry(turn).or_default();
            *attempts += 1;
            if failures == 0 || *attempts <= failures {
                return Err(Error {
                    message: "scripted failure",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }
        }

        let mut events: Vec<_> = preset
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(text) => {
                    ModelResponseEvent::MessageDelta(text.clone())
                }
                PresetEvent::ToolCall(call) => {
                    ModelResponseEvent::ToolCall(call.clone())
                }
            })
            .collect();
        events.push(ModelResponseEvent::Completed(if preset.has_tool_call() {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        }));

        Ok(TestModelResponse {
            events,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.respond(req))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use journi_model::{
        AssistantMessage, ModelMessage, ToolCallRequest, ToolCallResult,
    };
    use serde_json::json;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Option<ToolCallRequest>, Option<ModelFinishReason>) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_call = None;
        let mut reason = None;
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await.unwrap()
        {
            match event {
                ModelResponseEvent::Completed(r) => reason = Some(r),
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
                ModelResponseEvent::ToolCall(req) => tool_call = Some(req),
            }
        }
        (msg, tool_call, reason)
    }

    fn user(text: &str) -> ModelMessage {
        ModelMessage::User(text.to_owned())
    }

    #[tokio::test]
    async fn test_turns_follow_history() {
        let provider = TestModelProvider::with_script([
            PresetResponse::with_events([
                PresetEvent::text("Let me "),
                PresetEvent::text("check."),
                PresetEvent::tool_call(
                    "call_1",
                    "get_local_time",
                    json!({ "destination": "Tokyo" }),
                ),
            ]),
            PresetResponse::with_events([PresetEvent::text("It is noon.")]),
        ]);

        let mut req = ModelRequest {
            messages: vec![user("What time is it in Tokyo?")],
            ..Default::default()
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "Let me check.");
        assert_eq!(tool_call.unwrap().name, "get_local_time");
        assert_eq!(reason, Some(ModelFinishReason::ToolCalls));

        req.messages
            .push(ModelMessage::Assistant(AssistantMessage::text("Let me check.")));
        req.messages.push(ModelMessage::Tool(ToolCallResult {
            id: "call_1".to_owned(),
            content: "12:00 PM".to_owned(),
        }));
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "It is noon.");
        assert!(tool_call.is_none());
        assert_eq!(reason, Some(ModelFinishReason::Stop));

        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let provider = TestModelProvider::with_script([
            PresetResponse::with_events([PresetEvent::text("Hi")])
                .with_failures(2),
        ]);
        let req = ModelRequest {
            messages: vec![user("Hello")],
            ..Default::default()
        };

        for _ in 0..2 {
            let err = provider.send_request(&req).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        assert!(provider.send_request(&req).await.is_ok());
    }

    #[tokio::test]
    async fn test_script_exhausted() {
        let provider = TestModelProvider::default();
        let req = ModelRequest {
            messages: vec![user("Hello")],
            ..Default::default()
        };
        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
