// ./src/stream.rs
//! The Streaming Emitter: publishes agent-loop lifecycle events as they
//! happen. `AgentLoop` holds the `EventSink` half and pushes events as it
//! progresses through THINK/ACT/OBSERVE/REFLECT; `subscribe` hands the
//! consumer the other half as a lazy `Stream`.
use async_stream::stream;
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// The fixed event taxonomy (spec §4.10).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Start,
    Thought,
    Action,
    Observation,
    FinalAnswer,
    Complete,
    Error,
}

/// One event on the stream: `event_type`, `step_number`, and a
/// type-specific JSON payload (spec §6 "Event stream").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub step_number: u32,
    pub payload: Value,
}

impl Event {
    pub fn new(event_type: EventType, step_number: u32, payload: Value) -> Self {
        Event { event_type, step_number, payload }
    }
}

/// The producer half, held by `AgentLoop`. Sending after every receiver has
/// been dropped is a no-op rather than a panic or abort (spec §4.10
/// "cancellation by the consumer causes the run to continue but events to
/// be dropped"; §7 "Cancellation").
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    pub fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event stream consumer dropped; event discarded");
        }
    }
}

/// Creates a connected `(EventSink, EventStream)` pair. The sink is handed
/// to `AgentLoop::run`; the stream is handed to whatever external caller
/// wants to observe the run (the excluded HTTP/WebSocket layer, in
/// production; a test, in this crate).
pub fn channel() -> (EventSink, impl Stream<Item = Event>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink = EventSink { tx };
    let stream = stream! {
        while let Some(event) = rx.recv().await {
            yield event;
        }
    };
    (sink, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let (sink, stream) = channel();
        sink.emit(Event::new(EventType::Start, 0, Value::Null));
        sink.emit(Event::new(EventType::Thought, 1, serde_json::json!({"content": "thinking"})));
        drop(sink);

        let collected: Vec<Event> = stream.collect().await;
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].event_type, EventType::Start);
        assert_eq!(collected[1].event_type, EventType::Thought);
    }

    #[test]
    fn emit_after_consumer_drop_does_not_panic() {
        let (sink, stream) = channel();
        drop(stream);
        sink.emit(Event::new(EventType::Complete, 0, Value::Null));
    }
}
