use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use recruit_agent_model::{
    AssistantMessage, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A type-erased wrapper around a model provider that drains streamed
/// responses into complete messages.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so that the agent does not need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("sending request: {req:?}");
                    handle_response::<P>(fut.await).await
                }
                .instrument(debug_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and waits for the complete response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelClientResponse {
    /// The text and the tool calls of the reply.
    pub message: AssistantMessage,
    /// The reason the model finished generating, if reported.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("request failed: {err}");
            return Err(Box::new(err));
        }
    };

    let mut message = AssistantMessage::default();
    let mut finish_reason = None;

    let mut pinned_resp = pin!(resp);
    loop {
        let event =
            match poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await
            {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(err) => {
                    error!("response failed: {err}");
                    return Err(Box::new(err));
                }
            };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                message.content.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(req) => {
                message.tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    debug!(
        "response finished with {} tool call(s), reason: {finish_reason:?}",
        message.tool_calls.len()
    );

    Ok(ModelClientResponse {
        message,
        finish_reason,
    })
}
