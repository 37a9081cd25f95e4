//! A local scripted model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use recruit_agent_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
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

pub struct ScriptedResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for ScriptedResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        let delay = this.delay;
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let idx = this.event_idx;
        this.event_idx += 1;
        if let Some(event) = this.events.get(idx) {
            let event = match event {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::ToolCall(req) => {
                    ModelResponseEvent::ToolCall(req.clone())
                }
            };
            return Poll::Ready(Ok(Some(event)));
        }
        if idx == this.events.len() {
            let has_tool_call = this
                .events
                .iter()
                .any(|event| matches!(event, PresetEvent::ToolCall(_)));
            return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                if has_tool_call {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                },
            ))));
        }
        // In case this method is called after completion.
        Poll::Ready(Ok(None))
    }
}

/// A local fake model that replays a script of assistant turns.
///
/// The turn answering a request is picked by counting the assistant
/// messages already in that request: the first request gets the first
/// preset, the request following one assistant reply gets the second, and
/// so on. Requests beyond the end of the script fail.
///
/// Every received request is recorded and can be inspected with
/// [`ScriptedProvider::requests`]. Clones share the script and the record.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Vec<PresetResponse>>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    /// Creates a provider that replays the given turns.
    pub fn with_script(script: impl Into<Vec<PresetResponse>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Default::default()
        }
    }

    /// Appends an assistant turn to the script.
    #[inline]
    pub fn add_assistant_turn(&self, preset: PresetResponse) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(preset);
    }

    /// Sets the delay between two streamed events.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns a copy of every request received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ModelProvider for ScriptedProvider {
    type Error = crate::Error;
    type Response = ScriptedResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());

        let turn = req
            .messages
            .iter()
            .filter(|msg| matches!(msg, ModelMessage::Assistant(_)))
            .count();
        let preset = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(turn)
            .cloned();

        let result = match preset {
            None => Err(Error {
                message: "script exhausted",
                kind: ErrorKind::Other,
            }),
            Some(PresetResponse {
                failure: Some(kind),
                ..
            }) => Err(Error {
                message: "scripted failure",
                kind,
            }),
            Some(preset) => Ok(ScriptedResponse {
                events: preset.events,
                event_idx: 0,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
            }),
        };
        ready(result)
    }
}
