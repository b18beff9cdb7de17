use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use intellibot_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, OpaqueMessage, ToolCallRequest,
};
use tracing::Instrument;

use crate::RetryPolicy;

pub(crate) type DeltaFn = Box<dyn Fn(&str) + Send + 'static>;
type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, RetryPolicy, DeltaFn)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// A type-erased handle to a model provider.
///
/// Starting a request is retried according to the retry policy. The
/// response is then drained completely, forwarding text deltas as they
/// arrive.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
}

impl ModelClient {
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let provider = Arc::new(provider);
        let handler_fn: HandlerFn = Arc::new(
            move |req: ModelRequest,
                  retry_policy: RetryPolicy,
                  on_delta: DeltaFn|
                  -> BoxedSendRequestFuture {
                let provider = Arc::clone(&provider);
                Box::pin(
                    async move {
                        trace!("got a request: {req:?}");
                        let resp_or_err =
                            start_request(&*provider, &req, &retry_policy)
                                .await;
                        handle_response::<P>(resp_or_err, on_delta).await
                    }
                    .instrument(trace_span!("model client req")),
                )
            },
        );
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
        }
    }

    #[inline]
    pub fn set_retry_policy(&mut self, retry_policy: RetryPolicy) {
        self.retry_policy = retry_policy;
    }

    /// Sends a request and waits for the complete response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_delta: impl Fn(&str) + Send + 'static,
    ) -> SendRequestResult {
        (self.handler_fn)(req, self.retry_policy.clone(), Box::new(on_delta))
            .await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    pub transcript: String,
    pub opaque_msg: Option<OpaqueMessage>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn start_request<P: ModelProvider>(
    provider: &P,
    req: &ModelRequest,
    retry_policy: &RetryPolicy,
) -> Result<P::Response, P::Error> {
    let max_attempts = retry_policy.max_attempts();
    let mut attempts = 0;
    backoff::future::retry_notify(
        retry_policy.backoff(),
        || {
            attempts += 1;
            let may_retry = attempts < max_attempts;
            let fut = provider.send_request(req);
            async move {
                fut.await.map_err(|err| {
                    if may_retry && err.kind().is_transient() {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        },
        |err: P::Error, wait: Duration| {
            warn!("model request failed ({err}), retrying in {wait:?}");
        },
    )
    .await
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_delta: DeltaFn,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            warn!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                warn!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                on_delta(&delta);
                transcript.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    // The stream ended without errors, so the provider can now describe the
    // whole message.
    let opaque_msg = pinned_resp.make_opaque_message();
    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}
