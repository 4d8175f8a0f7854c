//! Lifecycle state machine.
//!
//! Exactly one control layer may be live per process; the registry below
//! enforces that at construction time. Transitions only ever follow
//! `Stopped → Starting → Ready → Stopping → Stopped`; anything else is a
//! silent no-op.

use crate::error::ControlError;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Stopped = 0,
    Starting = 1,
    Ready = 2,
    Stopping = 3,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => LifecycleState::Starting,
            2 => LifecycleState::Ready,
            3 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

/// Hooks fired on specific lifecycle transitions.
///
/// Single slot: registering a new observer replaces the previous one. The
/// event bus is the multi-consumer channel; this exists for the host's one
/// privileged component (typically the input-method service itself).
pub trait LifecycleObserver: Send + Sync {
    /// Fired exactly once per `Starting → Ready` transition, on the
    /// engine's callback thread.
    fn on_ready(&self) {}
    /// Fired once per `Stopping → Stopped` transition, from `stop()`.
    fn on_stopped(&self) {}
}

/// Registry of the live state cell. Checked twice: at construction (a new
/// session may exist only while the registered one is stopped or gone) and
/// at start, where the starting cell claims the slot so that no two
/// sessions can hold a running engine at once. The background task keeps
/// the cell alive through its dispatcher, so dropping a running session
/// does not free the slot early.
static LIVE: Mutex<Option<Weak<StateCell>>> = Mutex::new(None);

/// The shared lifecycle state variable plus the observer slot.
///
/// Written by the owning session (`start`/`stop`) and by the readiness
/// callback; read from arbitrary threads.
pub(crate) struct StateCell {
    state: AtomicU8,
    observer: Mutex<Option<Arc<dyn LifecycleObserver>>>,
}

impl StateCell {
    /// Install a fresh cell as the process-wide live one.
    ///
    /// Fails with [`ControlError::AlreadyRunning`] while another cell is
    /// live and not `Stopped`.
    pub(crate) fn acquire() -> Result<Arc<Self>, ControlError> {
        let mut live = LIVE.lock().unwrap();
        if let Some(cell) = live.as_ref().and_then(Weak::upgrade) {
            if cell.get() != LifecycleState::Stopped {
                return Err(ControlError::AlreadyRunning);
            }
        }
        let cell = Arc::new(StateCell {
            state: AtomicU8::new(LifecycleState::Stopped as u8),
            observer: Mutex::new(None),
        });
        *live = Some(Arc::downgrade(&cell));
        Ok(cell)
    }

    pub(crate) fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Claim the live slot and take the `Stopped → Starting` edge, atomically
    /// with respect to other sessions' starts. Returns false (a no-op) when
    /// another cell is live and not stopped, or when this cell has already
    /// left `Stopped`.
    pub(crate) fn begin_start(cell: &Arc<Self>) -> bool {
        let mut live = LIVE.lock().unwrap();
        if let Some(other) = live.as_ref().and_then(Weak::upgrade) {
            if !Arc::ptr_eq(&other, cell) && other.get() != LifecycleState::Stopped {
                return false;
            }
        }
        if !cell.transition(LifecycleState::Stopped, LifecycleState::Starting) {
            return false;
        }
        *live = Some(Arc::downgrade(cell));
        true
    }

    /// Attempt one legal edge. Returns false (and changes nothing) if the
    /// current state is not `from`.
    pub(crate) fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        let ok = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if ok {
            info!(from = ?from, to = ?to, "lifecycle transition");
        }
        ok
    }

    pub(crate) fn set_observer(&self, observer: Option<Arc<dyn LifecycleObserver>>) {
        *self.observer.lock().unwrap() = observer;
    }

    fn observer(&self) -> Option<Arc<dyn LifecycleObserver>> {
        self.observer.lock().unwrap().clone()
    }

    /// Drive `Starting → Ready`. The CAS makes the hook fire at most once
    /// per transition even if the engine repeats its ready callback.
    pub(crate) fn mark_ready(&self) -> bool {
        let flipped = self.transition(LifecycleState::Starting, LifecycleState::Ready);
        if flipped {
            if let Some(obs) = self.observer() {
                obs.on_ready();
            }
        }
        flipped
    }

    /// Drive `Stopping → Stopped` and fire the stopped hook.
    pub(crate) fn mark_stopped(&self) {
        if self.transition(LifecycleState::Stopping, LifecycleState::Stopped) {
            if let Some(obs) = self.observer() {
                obs.on_stopped();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingObserver {
        ready: AtomicUsize,
        stopped: AtomicUsize,
    }

    impl LifecycleObserver for CountingObserver {
        fn on_ready(&self) {
            self.ready.fetch_add(1, Ordering::SeqCst);
        }
        fn on_stopped(&self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn illegal_edges_are_noops() {
        let cell = Arc::new(StateCell {
            state: AtomicU8::new(LifecycleState::Stopped as u8),
            observer: Mutex::new(None),
        });
        assert!(!cell.transition(LifecycleState::Ready, LifecycleState::Stopping));
        assert!(!cell.transition(LifecycleState::Starting, LifecycleState::Ready));
        assert_eq!(cell.get(), LifecycleState::Stopped);

        assert!(cell.transition(LifecycleState::Stopped, LifecycleState::Starting));
        assert!(!cell.transition(LifecycleState::Stopped, LifecycleState::Starting));
        assert_eq!(cell.get(), LifecycleState::Starting);
    }

    #[test]
    fn ready_hook_fires_once_per_transition() {
        let cell = Arc::new(StateCell {
            state: AtomicU8::new(LifecycleState::Starting as u8),
            observer: Mutex::new(None),
        });
        let obs = Arc::new(CountingObserver {
            ready: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        });
        cell.set_observer(Some(obs.clone()));

        assert!(cell.mark_ready());
        assert!(!cell.mark_ready());
        assert_eq!(obs.ready.load(Ordering::SeqCst), 1);
        assert_eq!(obs.stopped.load(Ordering::SeqCst), 0);

        assert!(cell.transition(LifecycleState::Ready, LifecycleState::Stopping));
        cell.mark_stopped();
        cell.mark_stopped();
        assert_eq!(obs.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_slot_replaces_not_accumulates() {
        let cell = Arc::new(StateCell {
            state: AtomicU8::new(LifecycleState::Starting as u8),
            observer: Mutex::new(None),
        });
        let first = Arc::new(CountingObserver {
            ready: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        });
        let second = Arc::new(CountingObserver {
            ready: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        });
        cell.set_observer(Some(first.clone()));
        cell.set_observer(Some(second.clone()));
        cell.mark_ready();
        assert_eq!(first.ready.load(Ordering::SeqCst), 0);
        assert_eq!(second.ready.load(Ordering::SeqCst), 1);
    }
}
