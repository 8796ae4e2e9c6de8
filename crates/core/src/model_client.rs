use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use journi_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, OpaqueMessage, ToolCallRequest,
};
use tracing::Instrument;

type TranscriptFn = Arc<dyn Fn(String) + Send + Sync>;
type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, TranscriptFn) -> BoxedSendRequestFuture + Send + Sync
>;

/// A wrapper around a model provider that hides the provider type from the
/// agents and retries transient failures.
///
/// Clones share the provider, so one client can serve a whole team of
/// agents.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    backoff: ExponentialBackoff,
}

impl ModelClient {
    /// Wraps `provider`.
    ///
    /// Rate-limit and availability errors are retried with exponential
    /// backoff for up to two minutes.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_transcript| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_transcript).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(Some(Duration::from_secs(120)))
            .build();
        Self {
            handler_fn,
            backoff,
        }
    }

    /// Replaces the retry policy.
    #[inline]
    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sends a request and returns the collected response, retrying
    /// retryable errors.
    ///
    /// `on_transcript` receives every message delta as it streams in. Deltas
    /// from an attempt that failed midway have already been delivered.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_transcript: impl Fn(String) + Send + Sync + 'static,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        let on_transcript: TranscriptFn = Arc::new(on_transcript);
        let operation = || {
            let fut = (self.handler_fn)(req.clone(), Arc::clone(&on_transcript));
            async move {
                fut.await.map_err(|err| {
                    if err.kind().is_retryable() {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        };
        let notify = |err: Box<dyn ModelProviderError>, after: Duration| {
            warn!("model request failed ({err}), retrying in {after:?}");
        };
        backoff::future::retry_notify(self.backoff.clone(), operation, notify)
            .await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// All message deltas joined.
    pub transcript: String,
    /// The provider's own form of the response, if it has one.
    pub opaque_msg: Option<OpaqueMessage>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_transcript: TranscriptFn,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let opaque_msg;
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            // The request has been handled gracefully without errors,
            // now try getting the opaque message for this response.
            opaque_msg = pinned_resp.make_opaque_message();
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
                on_transcript(msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use journi_model::{ErrorKind, ModelMessage};
    use journi_test_model::{PresetEvent, PresetResponse, TestModelProvider};
    use serde_json::json;

    use super::*;

    fn hello() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User("Hi".to_owned())],
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_request() {
        let provider = TestModelProvider::with_script([PresetResponse::with_events([
            PresetEvent::text("Let me "),
            PresetEvent::text("check."),
            PresetEvent::tool_call(
                "call_1",
                "get_local_time",
                json!({"destination": "Paris"}),
            ),
        ])]);
        let model_client = ModelClient::new(provider);

        let deltas = Arc::new(Mutex::new(Vec::new()));
        let resp = model_client
            .send_request(hello(), {
                let deltas = Arc::clone(&deltas);
                move |delta| deltas.lock().unwrap().push(delta)
            })
            .await
            .unwrap();
        assert_eq!(resp.transcript, "Let me check.");
        assert_eq!(*deltas.lock().unwrap(), ["Let me ", "check."]);
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].name, "get_local_time");
        assert_eq!(resp.finish_reason, Some(ModelFinishReason::ToolCalls));
        assert!(resp.opaque_msg.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_rate_limit() {
        let provider = TestModelProvider::with_script([
            PresetResponse::with_events([PresetEvent::text("Bonjour")])
                .with_failures(2),
        ]);
        let model_client = ModelClient::new(provider.clone());
        let resp = model_client.send_request(hello(), |_| {}).await.unwrap();
        assert_eq!(resp.transcript, "Bonjour");
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error() {
        let provider = TestModelProvider::default();
        let model_client = ModelClient::new(provider.clone());
        let err = model_client
            .send_request(hello(), |_| {})
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(provider.requests().len(), 1);
    }
}
