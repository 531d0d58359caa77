//! Background archive indexing where the latest selection wins.
//!
//! Each call to [`IndexSession::select_zip`] issues a new [`SelectionToken`]
//! and indexes the archive on a worker thread. A finished index is installed
//! only if its token is still the current selection, so a slow archive that
//! was replaced by a newer pick can never overwrite it, and a partially built
//! index is never visible.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use nexus_catalogue::{validate_csv, ValidationOutcome, ValidatorConfig};
use nexus_zip::{build_index, ArchiveIndex, BlobSource};

use crate::{Error, Result};

/// Identifies one archive selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionToken(u64);

impl SelectionToken {
    /// Sequence number of the selection.
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Messages from indexing workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The index was built and installed as the current one.
    IndexReady { token: SelectionToken, entries: usize },
    /// Indexing failed for the current selection.
    IndexFailed { token: SelectionToken, error: String },
    /// The worker finished after a newer selection; its result was dropped.
    Discarded { token: SelectionToken },
}

impl SessionEvent {
    /// The selection this event belongs to.
    pub fn token(&self) -> SelectionToken {
        match self {
            Self::IndexReady { token, .. }
            | Self::IndexFailed { token, .. }
            | Self::Discarded { token } => *token,
        }
    }
}

/// Progress of the current selection.
#[derive(Debug, Default)]
enum SlotState {
    /// No archive selected.
    #[default]
    Empty,
    /// A worker is indexing the current selection.
    Pending,
    /// The current selection is indexed.
    Ready(Arc<ArchiveIndex>),
    /// Indexing the current selection failed.
    Failed(String),
}

#[derive(Debug, Default)]
struct Slot {
    selection: u64,
    state: SlotState,
}

impl Slot {
    /// Outcome for `token`, or `None` while it is still being indexed.
    fn outcome(&self, token: SelectionToken) -> Option<Result<Arc<ArchiveIndex>>> {
        if self.selection != token.0 {
            return Some(Err(Error::Superseded(token.0)));
        }
        match &self.state {
            SlotState::Ready(index) => Some(Ok(Arc::clone(index))),
            SlotState::Failed(error) => Some(Err(Error::Index(error.clone()))),
            SlotState::Pending => None,
            SlotState::Empty => Some(Err(Error::Superseded(token.0))),
        }
    }
}

/// Slot state plus the condition variable signalled on every change.
#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Slot>,
    changed: Condvar,
}

impl Shared {
    fn update<R>(&self, f: impl FnOnce(&mut Slot) -> R) -> R {
        let result = f(&mut *self.slot.lock());
        self.changed.notify_all();
        result
    }
}

/// Holds the current archive index for one upload workflow.
#[derive(Debug)]
pub struct IndexSession {
    shared: Arc<Shared>,
    sender: Sender<SessionEvent>,
    receiver: Receiver<SessionEvent>,
}

impl Default for IndexSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexSession {
    /// Create a session with no archive selected.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(Shared::default()),
            sender,
            receiver,
        }
    }

    /// Select a new archive and index it in a background thread.
    ///
    /// The previous index is dropped immediately; until the new one is
    /// ready, [`current`](Self::current) returns `None`.
    pub fn select_zip<B>(&self, blob: B) -> SelectionToken
    where
        B: BlobSource + Send + 'static,
    {
        let token = self.next_selection(SlotState::Pending);
        let shared = Arc::clone(&self.shared);
        let sender = self.sender.clone();

        std::thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| build_index(&blob)));
            let event = match result {
                Ok(Ok(index)) => install(&shared, token, index),
                Ok(Err(e)) => failure(&shared, token, e.to_string()),
                Err(_) => failure(&shared, token, "indexing worker panicked".to_string()),
            };
            sender.send(event).ok();
        });

        token
    }

    /// Forget the current archive, invalidating any pending selection.
    pub fn clear(&self) {
        self.next_selection(SlotState::Empty);
    }

    /// The installed index, if the current selection has finished.
    pub fn current(&self) -> Option<Arc<ArchiveIndex>> {
        match &self.shared.slot.lock().state {
            SlotState::Ready(index) => Some(Arc::clone(index)),
            _ => None,
        }
    }

    /// Check if `token` is still the latest selection.
    pub fn is_current(&self, token: SelectionToken) -> bool {
        self.shared.slot.lock().selection == token.0
    }

    /// Drain worker events without blocking.
    pub fn poll(&self) -> Vec<SessionEvent> {
        self.receiver.try_iter().collect()
    }

    /// Wait up to `timeout` for the next worker event.
    pub fn next_event(&self, timeout: Duration) -> Option<SessionEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Block until the selection identified by `token` is indexed.
    ///
    /// Reads the session state directly, so it returns even if the worker's
    /// event was already taken by [`poll`](Self::poll) or
    /// [`next_event`](Self::next_event). Events are left in the queue.
    pub fn wait(&self, token: SelectionToken) -> Result<Arc<ArchiveIndex>> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = slot.outcome(token) {
                return outcome;
            }
            self.shared.changed.wait(&mut slot);
        }
    }

    /// Validate CSV text against the current index.
    ///
    /// The returned token records which selection the outcome was computed
    /// for; callers should drop the outcome once it is no longer current.
    pub fn validate_csv(
        &self,
        text: &str,
        config: &ValidatorConfig,
    ) -> (SelectionToken, ValidationOutcome) {
        let (token, index) = {
            let slot = self.shared.slot.lock();
            let index = match &slot.state {
                SlotState::Ready(index) => Some(Arc::clone(index)),
                _ => None,
            };
            (SelectionToken(slot.selection), index)
        };
        (token, validate_csv(text, index.as_deref(), config))
    }

    fn next_selection(&self, state: SlotState) -> SelectionToken {
        self.shared.update(|slot| {
            slot.selection += 1;
            slot.state = state;
            SelectionToken(slot.selection)
        })
    }
}

fn install(shared: &Shared, token: SelectionToken, index: ArchiveIndex) -> SessionEvent {
    shared.update(|slot| {
        if slot.selection != token.0 {
            debug!(token = token.0, current = slot.selection, "discarding stale index");
            return SessionEvent::Discarded { token };
        }

        let entries = index.len();
        slot.state = SlotState::Ready(Arc::new(index));
        info!(token = token.0, entries, "installed archive index");
        SessionEvent::IndexReady { token, entries }
    })
}

fn failure(shared: &Shared, token: SelectionToken, error: String) -> SessionEvent {
    shared.update(|slot| {
        if slot.selection != token.0 {
            debug!(token = token.0, "discarding stale indexing failure");
            return SessionEvent::Discarded { token };
        }

        slot.state = SlotState::Failed(error.clone());
        SessionEvent::IndexFailed { token, error }
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use crossbeam_channel::bounded;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_zip(name: &str, size: usize) -> Vec<u8> {
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(name, options).unwrap();
        writer.write_all(&vec![1u8; size]).unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Blob whose reads block until the gate sender is dropped.
    struct GatedBlob {
        data: Vec<u8>,
        gate: Receiver<()>,
    }

    impl BlobSource for GatedBlob {
        fn size(&self) -> u64 {
            self.data.len() as u64
        }

        fn read_range(&self, start: u64, end: u64) -> nexus_zip::Result<Vec<u8>> {
            self.gate.recv().ok();
            self.data.read_range(start, end)
        }
    }

    #[test]
    fn test_select_and_wait() {
        let session = IndexSession::new();
        assert!(session.current().is_none());

        let token = session.select_zip(build_zip("garments/1/a.jpg", 20_000));
        let index = session.wait(token).unwrap();

        assert_eq!(index.get("garments/1/a.jpg"), Some(20_000));
        assert!(session.is_current(token));
        assert_eq!(session.current().as_deref(), Some(&*index));
    }

    #[test]
    fn test_latest_selection_wins() {
        let session = IndexSession::new();
        let (release, gate) = bounded::<()>(0);

        let slow = session.select_zip(GatedBlob {
            data: build_zip("old.jpg", 100),
            gate,
        });
        let fast = session.select_zip(build_zip("new.jpg", 200));
        assert_ne!(slow, fast);

        let index = session.wait(fast).unwrap();
        assert!(index.contains("new.jpg"));
        assert!(matches!(session.wait(slow), Err(Error::Superseded(_))));

        drop(release);
        let event = loop {
            let event = session.next_event(Duration::from_secs(10)).unwrap();
            if event.token() == slow {
                break event;
            }
        };
        assert_eq!(event, SessionEvent::Discarded { token: slow });

        let current = session.current().unwrap();
        assert!(current.contains("new.jpg"));
        assert!(!current.contains("old.jpg"));
    }

    #[test]
    fn test_wait_after_event_was_consumed() {
        let session = IndexSession::new();
        let token = session.select_zip(build_zip("garments/1/a.jpg", 20_000));

        let event = session.next_event(Duration::from_secs(10)).unwrap();
        assert_eq!(event, SessionEvent::IndexReady { token, entries: 1 });
        assert!(session.poll().is_empty());

        let index = session.wait(token).unwrap();
        assert_eq!(index.get("garments/1/a.jpg"), Some(20_000));
    }

    #[test]
    fn test_wait_after_failure_event_was_consumed() {
        let session = IndexSession::new();
        let token = session.select_zip(vec![0u8; 64]);

        let event = session.next_event(Duration::from_secs(10)).unwrap();
        assert!(matches!(event, SessionEvent::IndexFailed { .. }));

        assert!(matches!(session.wait(token), Err(Error::Index(_))));
    }

    #[test]
    fn test_wait_wakes_when_superseded() {
        let session = IndexSession::new();
        let (release, gate) = bounded::<()>(0);
        let slow = session.select_zip(GatedBlob {
            data: build_zip("old.jpg", 100),
            gate,
        });

        std::thread::scope(|scope| {
            let waiter = scope.spawn(|| session.wait(slow));
            std::thread::sleep(Duration::from_millis(50));
            session.clear();
            assert!(matches!(waiter.join().unwrap(), Err(Error::Superseded(_))));
        });
        drop(release);
    }

    #[test]
    fn test_failure_is_reported() {
        let session = IndexSession::new();
        let token = session.select_zip(vec![0u8; 64]);

        match session.wait(token) {
            Err(Error::Index(message)) => assert!(message.contains("End of Central Directory")),
            other => panic!("expected index failure, got {other:?}"),
        }
        assert!(session.current().is_none());
    }

    #[test]
    fn test_clear_drops_index() {
        let session = IndexSession::new();
        let token = session.select_zip(build_zip("a.jpg", 10));
        session.wait(token).unwrap();

        session.clear();
        assert!(session.current().is_none());
        assert!(!session.is_current(token));

        let (_, outcome) = session.validate_csv("id\n1\n", &ValidatorConfig::default());
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_validation_is_tagged_with_selection() {
        let session = IndexSession::new();
        let token = session.select_zip(build_zip("garments/1/a.jpg", 20_000));
        session.wait(token).unwrap();

        let (validated_for, _) = session.validate_csv("id\n1\n", &ValidatorConfig::default());
        assert_eq!(validated_for, token);

        session.select_zip(build_zip("b.jpg", 10));
        assert!(!session.is_current(validated_for));
    }
}
