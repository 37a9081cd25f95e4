use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::future::BoxFuture;
use pin_project_lite::pin_project;
use recruit_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use serde_json::Value;

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, ToolCall};

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Tool calls arrive as fragments keyed by `index`, or by `id` when the
    // server leaves the index out. They are only complete once the choice
    // reports a finish reason.
    tool_calls: Vec<ToolCall>,
    ready_tool_calls: VecDeque<ToolCall>,
    // Cleared after the completed event has been returned.
    pending_finish_reason: Option<ModelFinishReason>,
    done: bool,
}

impl PartialState {
    fn finish_choice(&mut self, finish_reason: ModelFinishReason) {
        self.ready_tool_calls.extend(self.tool_calls.drain(..));
        self.pending_finish_reason = Some(finish_reason);
    }

    fn merge_tool_call(&mut self, fragment: ToolCall) {
        let position = match (fragment.index, fragment.id.as_deref()) {
            (Some(index), _) => self
                .tool_calls
                .iter()
                .position(|t| t.index == Some(index)),
            // Without an index, a new id starts a new call and anything
            // else continues the last one.
            (None, Some(id)) => self
                .tool_calls
                .last()
                .filter(|t| t.id.as_deref() == Some(id))
                .map(|_| self.tool_calls.len() - 1),
            (None, None) => self.tool_calls.len().checked_sub(1),
        };
        let Some(partial) = position.map(|pos| &mut self.tool_calls[pos])
        else {
            self.tool_calls.push(fragment);
            return;
        };
        if let Some(id) = fragment.id {
            if partial.id.as_deref() != Some(id.as_str()) {
                partial.id.get_or_insert_default().push_str(&id);
            }
        }
        if let Some(ty) = fragment.r#type {
            partial.r#type = Some(ty);
        }
        let Some(function) = fragment.function else {
            return;
        };
        let partial_func = partial.function.get_or_insert_default();
        if let Some(name) = function.name {
            partial_func.name.get_or_insert_default().push_str(&name);
        }
        if let Some(arguments) = function.arguments {
            partial_func
                .arguments
                .get_or_insert_default()
                .push_str(&arguments);
        }
    }
}

type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streamed chat completion.
    pub struct OpenAIResponse {
        next_event_fut: Option<BoxFuture<'static, NextEvent>>,
    }
}

impl OpenAIResponse {
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            ready_tool_calls: Default::default(),
            pending_finish_reason: None,
            done: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));
        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        // Events that were already decoded go out first: tool calls, then
        // the finish reason.
        if let Some(tool_call) = partial_state.ready_tool_calls.pop_front() {
            let event = ModelResponseEvent::ToolCall(into_request(tool_call));
            return Ok((Some(event), partial_state));
        }
        if let Some(finish_reason) = partial_state.pending_finish_reason.take()
        {
            let event = ModelResponseEvent::Completed(finish_reason);
            return Ok((Some(event), partial_state));
        }
        if partial_state.done {
            if partial_state.tool_calls.is_empty() {
                return Ok((None, partial_state));
            }
            // Some servers close the stream without a finish reason.
            // Whatever tool calls were collected are still reported.
            partial_state.finish_choice(ModelFinishReason::ToolCalls);
            continue;
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                partial_state.done = true;
                continue;
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.done = true;
            continue;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        // The usage chunk comes with no choices.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };

        if let Some(tool_calls) = choice.delta.tool_calls {
            for fragment in tool_calls {
                partial_state.merge_tool_call(fragment);
            }
        }
        if let Some(finish_reason) = choice.finish_reason {
            partial_state.finish_choice(if finish_reason == "tool_calls" {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            });
        }
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty())
        {
            return Ok((
                Some(ModelResponseEvent::MessageDelta(content)),
                partial_state,
            ));
        }
    }
}

/// Arguments that are not valid JSON, e.g. cut off by the token limit, are
/// kept as a raw string so the call can still be answered.
fn into_request(tool_call: ToolCall) -> ToolCallRequest {
    let function = tool_call.function.unwrap_or_default();
    let name = function.name.unwrap_or_default();
    let arguments = match function.arguments {
        None => Value::Object(Default::default()),
        Some(arguments) if arguments.is_empty() => {
            Value::Object(Default::default())
        }
        Some(arguments) => match serde_json::from_str(&arguments) {
            Ok(value) => value,
            Err(err) => {
                warn!("malformed arguments for tool `{name}`: {err}");
                Value::String(arguments)
            }
        },
    };
    ToolCallRequest {
        id: tool_call.id.unwrap_or_default(),
        name,
        arguments,
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::io::Chunks;

    async fn collect_events(chunks: Vec<Bytes>) -> Vec<ModelResponseEvent> {
        let sse = Sse::new(Chunks::from_vec_deque(chunks.into()));
        let mut resp = pin!(OpenAIResponse::from_sse(sse));
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let events = collect_events(vec![Bytes::from_static(include_bytes!(
            "../fixtures/tool_calls_response.txt"
        ))])
        .await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Let me check.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_a".to_owned(),
                    name: "get_traffit_candidate_data".to_owned(),
                    arguments: json!({ "candidate_id": 42 }),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_b".to_owned(),
                    name: "download_file_from_uipath_bucket".to_owned(),
                    arguments: json!({ "file_path": "cv.txt" }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_text_events() {
        let events = collect_events(vec![
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"Hello\"},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\" there\"},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[],\"usage\":{\"total_tokens\":9}}\n\ndata: [DONE]\n\n",
            ),
        ])
        .await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Hello".to_owned()),
                ModelResponseEvent::MessageDelta(" there".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_truncated_arguments_still_yield_tool_call() {
        let events = collect_events(vec![
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"get_traffit_candidate_data\",\"arguments\":\"\"}}]},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"candidate_id\\\": 4\"}}]},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"length\"}]}\n\ndata: [DONE]\n\n",
            ),
        ])
        .await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "get_traffit_candidate_data".to_owned(),
                    arguments: Value::String("{\"candidate_id\": 4".to_owned()),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_calls_without_index() {
        let events = collect_events(vec![
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"id\":\"call_a\",\"function\":{\"name\":\"lookup\",\"arguments\":\"{\\\"id\\\"\"}}]},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"function\":{\"arguments\":\":1}\"}}]},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"id\":\"call_b\",\"function\":{\"name\":\"lookup\",\"arguments\":\"{\\\"id\\\":2}\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n",
            ),
        ])
        .await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_a".to_owned(),
                    name: "lookup".to_owned(),
                    arguments: json!({ "id": 1 }),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_b".to_owned(),
                    name: "lookup".to_owned(),
                    arguments: json!({ "id": 2 }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_chunk_id_mismatch() {
        let sse = Sse::new(Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"id\":\"a\",\"choices\":[{\"delta\":{},\"finish_reason\":null}]}\n\ndata: {\"id\":\"b\",\"choices\":[{\"delta\":{\"content\":\"x\"},\"finish_reason\":null}]}\n\n",
            )]
            .into(),
        ));
        let mut resp = pin!(OpenAIResponse::from_sse(sse));
        let err = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "chunk id mismatch");
        assert!(matches!(
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await,
            Ok(None)
        ));
    }
}
