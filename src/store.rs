//! In-memory session store.
//!
//! Each session sits behind its own async mutex, so recomputations on one
//! session never interleave while different sessions proceed in parallel.
//! The map lock is only held long enough to clone a session handle.
//!
//! Retiring a session empties its slot under the session lock before the
//! map entry goes away, so a caller that cloned the handle earlier and was
//! queued behind the final leave sees `SessionNotFound` rather than an
//! orphaned session.

use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::data::{RawSlot, Session, SessionId, UpdateMode};
use crate::engine::{Coordinator, UpdateReport};
use crate::error::StoreError;

/// `None` once the session has been retired.
type SessionHandle = Arc<Mutex<Option<Session>>>;

/// Result of a leave: the report plus whether the session was retired.
#[derive(Debug, Clone)]
pub struct LeaveReport {
    pub report: UpdateReport,
    pub retired: bool,
}

pub struct SessionStore {
    coordinator: Coordinator,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    next_id: AtomicU64,
}

impl SessionStore {
    pub fn new(coordinator: Coordinator) -> Self {
        SessionStore {
            coordinator,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens a session with the teacher's initial availability.
    pub async fn create(&self, teacher_availability: &[RawSlot]) -> (Session, UpdateReport) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut session = Session::new(id);
        let report = self
            .coordinator
            .set_teacher_availability(&mut session, teacher_availability);

        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(Some(session.clone()))));
        info!("Created session {id}");
        (session, report)
    }

    pub async fn get(&self, id: SessionId) -> Result<Session, StoreError> {
        let mut slot = self.lock(id).await?;
        Ok(live(&mut slot, id)?.clone())
    }

    pub async fn set_teacher_availability(
        &self,
        id: SessionId,
        raw: &[RawSlot],
    ) -> Result<UpdateReport, StoreError> {
        let mut slot = self.lock(id).await?;
        let session = live(&mut slot, id)?;
        Ok(self.coordinator.set_teacher_availability(session, raw))
    }

    pub async fn join(
        &self,
        id: SessionId,
        student_id: &str,
        initial: Option<&[RawSlot]>,
    ) -> Result<UpdateReport, StoreError> {
        let mut slot = self.lock(id).await?;
        let session = live(&mut slot, id)?;
        Ok(self.coordinator.join(session, student_id, initial))
    }

    pub async fn update_preferences(
        &self,
        id: SessionId,
        student_id: &str,
        raw: &[RawSlot],
        mode: UpdateMode,
    ) -> Result<UpdateReport, StoreError> {
        let mut slot = self.lock(id).await?;
        let session = live(&mut slot, id)?;
        ensure_enrolled(session, student_id)?;
        Ok(self
            .coordinator
            .update_preferences(session, student_id, raw, mode))
    }

    /// Removes a student; the session itself is retired once nobody is left.
    pub async fn leave(&self, id: SessionId, student_id: &str) -> Result<LeaveReport, StoreError> {
        let mut slot = self.lock(id).await?;
        let session = live(&mut slot, id)?;
        ensure_enrolled(session, student_id)?;

        let report = self.coordinator.leave(session, student_id);
        let retired = session.enrolled_students.is_empty();
        if retired {
            *slot = None;
            self.sessions.write().await.remove(&id);
            info!("Retired session {id}: last student left");
        }
        Ok(LeaveReport { report, retired })
    }

    async fn lock(&self, id: SessionId) -> Result<OwnedMutexGuard<Option<Session>>, StoreError> {
        Ok(self.handle(id).await?.lock_owned().await)
    }

    async fn handle(&self, id: SessionId) -> Result<SessionHandle, StoreError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::SessionNotFound(id))
    }
}

fn live(slot: &mut Option<Session>, id: SessionId) -> Result<&mut Session, StoreError> {
    slot.as_mut().ok_or(StoreError::SessionNotFound(id))
}

fn ensure_enrolled(session: &Session, student_id: &str) -> Result<(), StoreError> {
    if session.enrolled_students.contains(student_id) {
        Ok(())
    } else {
        Err(StoreError::StudentNotEnrolled {
            session: session.id,
            student: student_id.to_string(),
        })
    }
}
