//! Session state and the registry that owns it.
//!
//! A session moves through `INITIALIZING -> ACTIVE <-> STREAMING -> CLOSED`.
//! The registry is the sole owner of session lifecycle: `create` mints the
//! id and constructs the engine, `terminate` (and stream disconnect, which
//! shares its disposal path) removes the session and disposes the engine
//! exactly once. The map itself is the only shared state; sessions hold no
//! back-pointers into the registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use accord_core::{EngineFactory, ProtocolEngine, PushHandle, SessionError};

/// Live server-side state bound to one opaque session id.
pub struct Session {
    id: String,
    engine: Arc<dyn ProtocolEngine>,
    push: PushHandle,
    /// Generation of the currently attached push stream. 0 = never opened.
    /// A stream-disconnect callback only disposes the session when its
    /// generation is still current, so supersession never tears down a
    /// session that moved on to a newer stream.
    stream_generation: AtomicU64,
    closed: AtomicBool,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn engine(&self) -> &Arc<dyn ProtocolEngine> {
        &self.engine
    }

    /// True once the disposal path has run. An in-flight operation that
    /// raced teardown must treat the session as unknown.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn is_streaming(&self) -> bool {
        self.push.is_attached()
    }

    /// Run the disposal path at most once: close the push stream, then
    /// invoke the engine's dispose hook.
    fn dispose(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.push.detach();
            self.engine.dispose();
            tracing::debug!(session_id = %self.id, "session disposed");
        }
    }
}

/// A freshly opened push stream: the receiver feeding the SSE response and
/// the generation token the disconnect path must present.
pub struct StreamLease {
    pub receiver: mpsc::Receiver<Value>,
    pub generation: u64,
}

/// Maps opaque session ids to live sessions for one scenario run.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session: mint an id, construct an engine through the
    /// factory and bind it to a fresh push handle. The session is ACTIVE
    /// on return.
    pub fn create(&self, factory: &dyn EngineFactory) -> Arc<Session> {
        let id = Uuid::new_v4().to_string();
        let push = PushHandle::new();
        let engine = factory.create();
        engine.bind(push.clone());

        let session = Arc::new(Session {
            id: id.clone(),
            engine,
            push,
            stream_generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        self.sessions.lock().insert(id.clone(), session.clone());
        tracing::debug!(session_id = %id, "session created");
        session
    }

    /// Look up a session by the id carried in the request header.
    pub fn get(&self, id: Option<&str>) -> Result<Arc<Session>, SessionError> {
        let id = id.ok_or(SessionError::Missing)?;
        self.sessions
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::Unknown(id.to_string()))
    }

    /// Open (or supersede) the session's push stream.
    ///
    /// The superseded sender, if any, is dropped first, which ends the old
    /// stream before the new one becomes visible to the engine.
    pub fn open_stream(&self, id: &str) -> Result<StreamLease, SessionError> {
        let session = self.get(Some(id))?;
        if session.is_closed() {
            return Err(SessionError::Unknown(id.to_string()));
        }

        let (tx, rx) = PushHandle::channel();
        let generation = session.stream_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let superseded = session.push.attach(tx);
        if superseded.is_some() {
            tracing::debug!(session_id = %id, generation, "push stream superseded");
        }
        drop(superseded);

        Ok(StreamLease {
            receiver: rx,
            generation,
        })
    }

    /// Terminate a session: close any open stream, dispose the engine and
    /// remove the session from the registry.
    pub fn terminate(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .sessions
            .lock()
            .remove(id)
            .ok_or_else(|| SessionError::Unknown(id.to_string()))?;
        session.dispose();
        Ok(())
    }

    /// Transport-level disconnect of a push stream.
    ///
    /// Runs the same disposal path as [`terminate`](Self::terminate), but
    /// only when the disconnected stream is still the session's current
    /// one; a superseded stream's disconnect is a no-op.
    pub fn stream_disconnected(&self, id: &str, generation: u64) {
        let session = self.sessions.lock().get(id).cloned();
        if let Some(session) = session {
            if session.stream_generation.load(Ordering::Acquire) == generation {
                tracing::debug!(session_id = %id, generation, "push stream disconnected");
                let _ = self.terminate(id);
            }
        }
    }

    /// Terminate every live session. Used by the scenario controller's
    /// `stop()`; idempotent.
    pub fn drain(&self) {
        let sessions: Vec<Arc<Session>> = self.sessions.lock().drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.dispose();
        }
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.lock().len()
    }
}
