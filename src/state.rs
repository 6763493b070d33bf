use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::extract::FromRef;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::user::Identity,
    session::ExamSession,
    store::Backend,
    utils::jwt::Caller,
};

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub config: Config,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, config: Config) -> Self {
        AppState {
            sessions: SessionRegistry::new(config.session_idle_ttl()),
            backend,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Backend> {
    fn from_ref(state: &AppState) -> Self {
        state.backend.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

pub type SharedSession = Arc<Mutex<ExamSession>>;

struct SessionEntry {
    session: SharedSession,
    /// Signed-in student who opened the session; results are recorded for them.
    owner: Option<Identity>,
    touched: Instant,
}

impl SessionEntry {
    fn is_idle(&self, ttl: Duration) -> bool {
        self.touched.elapsed() > ttl
    }
}

/// A live session together with the student it belongs to.
pub struct OwnedSession {
    pub session: SharedSession,
    pub owner: Option<Identity>,
}

/// Live exam sessions, one per browser session.
///
/// Each session has its own lock, so events of one student are applied one
/// at a time while other students are not blocked. A session nobody touched
/// for `idle_ttl` is dropped.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        SessionRegistry {
            sessions: Arc::default(),
            idle_ttl,
        }
    }

    pub async fn create(&self, owner: Option<Identity>) -> (Uuid, SharedSession) {
        let mut sessions = self.sessions.write().await;
        evict(&mut sessions, self.idle_ttl);

        let id = Uuid::new_v4();
        let session = SharedSession::default();
        sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                owner,
                touched: Instant::now(),
            },
        );
        (id, session)
    }

    /// Looks up a session on behalf of `caller` and marks it as used.
    ///
    /// A different signed-in student gets a conflict. An anonymous caller may
    /// continue a session, but results still go to its owner.
    pub async fn get(&self, id: Uuid, caller: Caller) -> Result<OwnedSession, AppError> {
        let mut sessions = self.sessions.write().await;

        if sessions.get(&id).is_some_and(|e| e.is_idle(self.idle_ttl)) {
            sessions.remove(&id);
            tracing::info!("Exam session {} expired", id);
        }

        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        check_owner(entry, caller)?;

        entry.touched = Instant::now();
        Ok(OwnedSession {
            session: entry.session.clone(),
            owner: entry.owner,
        })
    }

    pub async fn remove(&self, id: Uuid, caller: Caller) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;

        let entry = sessions
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        check_owner(entry, caller)?;

        sessions.remove(&id);
        Ok(())
    }

    /// Drops every session idle for longer than the configured TTL.
    pub async fn evict_idle(&self) -> usize {
        let evicted = evict(&mut *self.sessions.write().await, self.idle_ttl);
        if evicted > 0 {
            tracing::info!("Evicted {} idle exam sessions", evicted);
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }
}

fn evict(sessions: &mut HashMap<Uuid, SessionEntry>, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| !entry.is_idle(ttl));
    before - sessions.len()
}

fn check_owner(entry: &SessionEntry, caller: Caller) -> Result<(), AppError> {
    match (entry.owner, caller.0) {
        (Some(owner), Some(caller)) if owner != caller => Err(AppError::Conflict(
            "Session belongs to another user".to_string(),
        )),
        _ => Ok(()),
    }
}
