//! Event logger adapters.
//!
//! Controllers report start/stop/mode/error events through [`EventSink`].
//! Recording must never block and never fail from the caller's point of
//! view; a broken sink loses events, not control.

use barn_common::equipment::event::EquipmentEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Fire-and-forget event consumer.
pub trait EventSink: Send + Sync + 'static {
    fn record(&self, event: EquipmentEvent);
}

// ─── TracingEventLog ────────────────────────────────────────────────

/// Writes every event as a structured log record on target `barn::events`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl EventSink for TracingEventLog {
    fn record(&self, event: EquipmentEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        info!(
            target: "barn::events",
            equipment = %event.name(),
            event = event.kind_str(),
            mode = %event.mode(),
            "{}",
            payload
        );
    }
}

// ─── ChannelEventLog ────────────────────────────────────────────────

/// Hands events to a background task over an unbounded channel.
///
/// The task forwards to a downstream sink. Once the task is gone, events
/// are dropped silently.
#[derive(Debug, Clone)]
pub struct ChannelEventLog {
    tx: mpsc::UnboundedSender<EquipmentEvent>,
}

impl ChannelEventLog {
    /// Spawn the forwarding task. Must be called inside a tokio runtime.
    pub fn spawn<S: EventSink>(downstream: Arc<S>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<EquipmentEvent>();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                downstream.record(event);
            }
            debug!("Event channel closed");
        });
        (Self { tx }, task)
    }
}

impl EventSink for ChannelEventLog {
    fn record(&self, event: EquipmentEvent) {
        let _ = self.tx.send(event);
    }
}

// ─── MemoryEventLog ─────────────────────────────────────────────────

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<EquipmentEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event so far.
    pub fn events(&self) -> Vec<EquipmentEvent> {
        self.events.lock().clone()
    }

    /// Events concerning one equipment.
    pub fn events_for(&self, name: &str) -> Vec<EquipmentEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }

    /// Drain every event.
    pub fn take(&self) -> Vec<EquipmentEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, event: EquipmentEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barn_common::equipment::state::Mode;

    fn blocked(name: &str) -> EquipmentEvent {
        EquipmentEvent::InterlockBlocked {
            name: name.to_string(),
            mode: Mode::Auto,
        }
    }

    #[test]
    fn memory_log_collects_and_drains() {
        let log = MemoryEventLog::new();
        log.record(blocked("fan"));
        log.record(blocked("pump"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.events_for("pump").len(), 1);
        assert_eq!(log.take().len(), 2);
        assert!(log.is_empty());
    }

    /// Log sink shared with the test body.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tracing_log_writes_structured_record() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            TracingEventLog.record(blocked("fan"));
        });

        let output = String::from_utf8(capture.0.lock().clone()).unwrap();
        assert!(output.contains("barn::events"), "{output}");
        assert!(output.contains("equipment=fan"), "{output}");
        assert!(output.contains("event=\"interlock_blocked\""), "{output}");
        assert!(output.contains("\"name\":\"fan\""), "{output}");
    }

    #[tokio::test]
    async fn channel_forwards_downstream() {
        let memory = Arc::new(MemoryEventLog::new());
        let (log, task) = ChannelEventLog::spawn(Arc::clone(&memory));
        log.record(blocked("fan"));
        drop(log);
        task.await.unwrap();
        assert_eq!(memory.events(), vec![blocked("fan")]);
    }

    #[tokio::test]
    async fn closed_channel_is_ignored() {
        let memory = Arc::new(MemoryEventLog::new());
        let (log, task) = ChannelEventLog::spawn(memory);
        task.abort();
        let _ = task.await;
        log.record(blocked("fan"));
    }
}
