use crate::memory::WorkingMemory;
use crate::state::AgentState;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct SessionInner {
    memory: WorkingMemory,
    state: AgentState,
}

/// Point-in-time copy of a session, safe to hand to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session id.
    pub session_id: Uuid,
    /// Pipeline state at the time of the copy.
    pub state: AgentState,
    /// Working memory at the time of the copy.
    pub memory: WorkingMemory,
}

/// Shared handle to one agent session.
///
/// Cloning is cheap; all clones see the same memory. Every develop run
/// takes a [`GenerationToken`]; a reset or a newer run invalidates older
/// tokens so late writes from an abandoned run are dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    inner: Arc<Mutex<SessionInner>>,
    epoch: Arc<AtomicU64>,
}

impl SessionHandle {
    /// Fresh session with the given fix bound.
    pub fn new(max_fix_attempts: u32) -> Self {
        Self::from_memory(Uuid::new_v4(), WorkingMemory::new(max_fix_attempts))
    }

    /// Restores a session from a stored snapshot. The state is reset to IDLE.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self::from_memory(snapshot.session_id, snapshot.memory)
    }

    fn from_memory(id: Uuid, memory: WorkingMemory) -> Self {
        Self {
            id,
            inner: Arc::new(Mutex::new(SessionInner {
                memory,
                state: AgentState::Idle,
            })),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Invalidates any previous run and returns the writer token for a new one.
    pub fn begin_generation(&self) -> GenerationToken {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(session = %self.id, epoch, "generation started");
        GenerationToken {
            handle: self.clone(),
            epoch,
        }
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> AgentState {
        self.inner.lock().state
    }

    /// Copy of the current memory and state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            session_id: self.id,
            state: inner.state,
            memory: inner.memory.clone(),
        }
    }

    /// Reads memory under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&WorkingMemory) -> R) -> R {
        f(&self.inner.lock().memory)
    }

    /// Clears memory, returns to IDLE and invalidates the running generation.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock();
        inner.memory.reset();
        inner.state = AgentState::Idle;
        debug!(session = %self.id, "session reset");
    }
}

/// Writer capability for one develop run.
#[derive(Debug, Clone)]
pub struct GenerationToken {
    handle: SessionHandle,
    epoch: u64,
}

impl GenerationToken {
    /// False once the session was reset or a newer run started.
    pub fn is_current(&self) -> bool {
        self.handle.epoch.load(Ordering::SeqCst) == self.epoch
    }

    #[allow(missing_docs)]
    pub fn session(&self) -> &SessionHandle {
        &self.handle
    }

    /// Mutates memory if this token is still current.
    pub fn write<R>(&self, f: impl FnOnce(&mut WorkingMemory) -> R) -> Option<R> {
        let mut inner = self.handle.inner.lock();
        if self.handle.epoch.load(Ordering::SeqCst) != self.epoch {
            debug!(session = %self.handle.id, epoch = self.epoch, "stale write dropped");
            return None;
        }
        Some(f(&mut inner.memory))
    }

    /// Moves the pipeline state if this token is still current.
    ///
    /// Returns false when the write was dropped. Transitions the state
    /// machine does not allow are applied anyway and logged.
    pub fn set_state(&self, next: AgentState) -> bool {
        let mut inner = self.handle.inner.lock();
        if self.handle.epoch.load(Ordering::SeqCst) != self.epoch {
            return false;
        }
        if !inner.state.can_transition_to(next) {
            tracing::warn!(
                session = %self.handle.id,
                from = %inner.state,
                to = %next,
                "unexpected state transition"
            );
        }
        inner.state = next;
        true
    }
}
