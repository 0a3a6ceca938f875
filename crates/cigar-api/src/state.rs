//! Shared application state.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cigar_core::clock::Clock;
use cigar_core::store::{CompletionRecord, CompletionStore};
use cigar_intro::application::runner::{IntroHandle, TokioClock};
use cigar_intro::domain::scene::SceneScript;
use cigar_intro::domain::sequencer::SequencerConfig;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

const MIN_REAP_PERIOD: Duration = Duration::from_secs(1);

/// Idle time after which an untouched session is unmounted.
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct SessionEntry {
    handle: IntroHandle,
    last_seen: Instant,
}

#[derive(Debug)]
struct Sessions {
    entries: Mutex<HashMap<Uuid, SessionEntry>>,
    idle_ttl: Duration,
}

/// Live intro sessions keyed by session id.
///
/// A session not looked up for `idle_ttl` is reaped: on every mount, and by
/// the task started with [`SessionRegistry::spawn_reaper`].
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<Sessions>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE_TTL)
    }
}

impl SessionRegistry {
    /// Creates an empty registry reaping sessions idle for `idle_ttl`.
    #[must_use]
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Sessions {
                entries: Mutex::new(HashMap::new()),
                idle_ttl,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        self.sessions
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Idle time after which a session is reaped.
    #[must_use]
    pub fn idle_ttl(&self) -> Duration {
        self.sessions.idle_ttl
    }

    /// Registers `handle` under `session_id`.
    pub fn insert(&self, session_id: Uuid, handle: IntroHandle) {
        let entry = SessionEntry {
            handle,
            last_seen: Instant::now(),
        };
        self.lock().insert(session_id, entry);
    }

    /// Returns a handle to the session, if it is still mounted, and marks it
    /// as seen.
    #[must_use]
    pub fn get(&self, session_id: Uuid) -> Option<IntroHandle> {
        let mut entries = self.lock();
        let entry = entries.get_mut(&session_id)?;
        entry.last_seen = Instant::now();
        Some(entry.handle.clone())
    }

    /// Unmounts the session. Dropping the last handle stops its runner.
    pub fn remove(&self, session_id: Uuid) -> Option<IntroHandle> {
        self.lock().remove(&session_id).map(|entry| entry.handle)
    }

    /// Unmounts every session idle for at least `idle_ttl`. Returns how many
    /// were removed.
    pub fn reap_idle(&self) -> usize {
        let now = Instant::now();
        let idle_ttl = self.sessions.idle_ttl;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_seen) < idle_ttl);
        before - entries.len()
    }

    /// Starts a task that reaps idle sessions until the registry is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let period = (self.sessions.idle_ttl / 4).max(MIN_REAP_PERIOD);
        let sessions = Arc::downgrade(&self.sessions);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(sessions) = sessions.upgrade() else {
                    break;
                };
                let reaped = SessionRegistry { sessions }.reap_idle();
                if reaped > 0 {
                    info!(reaped, "reaped idle intro sessions");
                }
            }
        })
    }

    /// Number of mounted sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no session is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock used to timestamp completion records.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Durable "intro completed" flag.
    pub completion_store: Arc<dyn CompletionStore>,
    /// Scene script every session presents.
    pub script: Arc<SceneScript>,
    /// Sequencer timing for new sessions.
    pub sequencer_config: SequencerConfig,
    /// Mounted sessions.
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        completion_store: Arc<dyn CompletionStore>,
        script: Arc<SceneScript>,
        sequencer_config: SequencerConfig,
    ) -> Self {
        Self {
            clock,
            completion_store,
            script,
            sequencer_config,
            sessions: SessionRegistry::default(),
        }
    }

    /// Replaces the session registry with one reaping after `idle_ttl`.
    #[must_use]
    pub fn with_session_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.sessions = SessionRegistry::new(idle_ttl);
        self
    }

    /// Mounts a new intro session.
    ///
    /// When the sequencer completes, the completion flag is persisted and the
    /// session is unmounted. A persistence failure is logged and not retried.
    pub fn mount_session(&self) -> (Uuid, IntroHandle) {
        let reaped = self.sessions.reap_idle();
        if reaped > 0 {
            info!(reaped, "reaped idle intro sessions");
        }
        let session_id = Uuid::now_v7();
        let clock = Arc::clone(&self.clock);
        let store = Arc::clone(&self.completion_store);
        let sessions = self.sessions.clone();

        let on_complete = move || {
            tokio::spawn(async move {
                let record = CompletionRecord {
                    completed_at: clock.now(),
                };
                match store.mark_completed(record).await {
                    Ok(()) => info!(%session_id, "intro completion persisted"),
                    Err(e) => error!(%session_id, error = %e, "failed to persist intro completion"),
                }
                sessions.remove(session_id);
            });
        };

        let handle = IntroHandle::spawn(
            Arc::clone(&self.script),
            self.sequencer_config,
            Arc::new(TokioClock::new()),
            on_complete,
        );
        self.sessions.insert(session_id, handle.clone());
        info!(%session_id, "intro session mounted");
        (session_id, handle)
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("scenes", &self.script.len())
            .field("sequencer_config", &self.sequencer_config)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cigar_intro::application::script::default_script;
    use cigar_test_support::{FixedClock, InMemoryCompletionStore, epoch};

    fn state_with_idle_ttl(idle_ttl: Duration) -> AppState {
        AppState::new(
            Arc::new(FixedClock(epoch())),
            Arc::new(InMemoryCompletionStore::new()),
            Arc::new(default_script()),
            SequencerConfig::default(),
        )
        .with_session_idle_ttl(idle_ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_sessions_are_reaped() {
        // Arrange
        let state = state_with_idle_ttl(DEFAULT_SESSION_IDLE_TTL);
        let _reaper = state.sessions.spawn_reaper();
        for _ in 0..100 {
            let _ = state.mount_session();
        }
        assert_eq!(state.sessions.len(), 100);

        // Act
        tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;

        // Assert
        assert!(state.sessions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_looking_up_a_session_keeps_it_mounted() {
        // Arrange
        let state = state_with_idle_ttl(Duration::from_secs(60));
        let (session_id, _) = state.mount_session();

        // Act
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(state.sessions.get(session_id).is_some());
        tokio::time::sleep(Duration::from_secs(45)).await;
        let reaped_while_active = state.sessions.reap_idle();
        tokio::time::sleep(Duration::from_secs(16)).await;
        let reaped_when_idle = state.sessions.reap_idle();

        // Assert
        assert_eq!(reaped_while_active, 0);
        assert_eq!(reaped_when_idle, 1);
        assert!(state.sessions.get(session_id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mounting_reaps_idle_sessions() {
        // Arrange
        let state = state_with_idle_ttl(Duration::from_secs(60));
        let (stale, _) = state.mount_session();
        tokio::time::sleep(Duration::from_secs(61)).await;

        // Act
        let (fresh, _) = state.mount_session();

        // Assert
        assert_eq!(state.sessions.len(), 1);
        assert!(state.sessions.get(stale).is_none());
        assert!(state.sessions.get(fresh).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaped_session_stops_its_runner() {
        // Arrange
        let state = state_with_idle_ttl(Duration::from_secs(60));
        let (session_id, handle) = state.mount_session();
        let views = handle.subscribe();
        drop(handle);
        tokio::time::sleep(Duration::from_secs(61)).await;

        // Act
        state.sessions.reap_idle();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Assert
        assert!(state.sessions.get(session_id).is_none());
        assert!(views.has_changed().is_err());
    }
}
