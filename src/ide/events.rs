//! Notifications produced by the model manager.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::base::FilePath;
use crate::syntax::Document;

#[derive(Clone, Debug)]
pub enum ModelEvent {
    /// A new document entered the snapshot.
    DocumentUpdated(Arc<Document>),
    /// These files are about to leave the snapshot.
    AboutToRemoveFiles(Vec<FilePath>),
    /// An indexing batch over these files completed.
    SourceFilesRefreshed(Vec<FilePath>),
    /// The parts of this project were (re)registered.
    ProjectPartsUpdated(FilePath),
    /// Ids of parts that no longer exist.
    ProjectPartsRemoved(Vec<Arc<str>>),
    GcFinished,
}

impl ModelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ModelEvent::DocumentUpdated(_) => "documentUpdated",
            ModelEvent::AboutToRemoveFiles(_) => "aboutToRemoveFiles",
            ModelEvent::SourceFilesRefreshed(_) => "sourceFilesRefreshed",
            ModelEvent::ProjectPartsUpdated(_) => "projectPartsUpdated",
            ModelEvent::ProjectPartsRemoved(_) => "projectPartsRemoved",
            ModelEvent::GcFinished => "gcFinished",
        }
    }
}

/// Fans events out to every live subscriber. Subscribers whose receiver was
/// dropped are forgotten on the next emit.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<ModelEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ModelEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn emit(&self, event: ModelEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        tracing::trace!(event = event.name(), subscribers = subscribers.len(), "emit");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_to_every_subscriber() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.emit(ModelEvent::GcFinished);
        assert!(matches!(a.try_recv(), Ok(ModelEvent::GcFinished)));
        assert!(matches!(b.try_recv(), Ok(ModelEvent::GcFinished)));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        bus.emit(ModelEvent::ProjectPartsRemoved(vec![Arc::from("p")]));
        assert_eq!(bus.subscriber_count(), 1);
        match kept.try_recv() {
            Ok(ModelEvent::ProjectPartsRemoved(ids)) => assert_eq!(ids.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }
}
