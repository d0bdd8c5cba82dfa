use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::responses::InterruptingMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeletionReason {
    Disconnect,
    PlayersLeft,
    GameOver,
}

impl std::fmt::Display for DeletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionReason::Disconnect => write!(f, "disconnect"),
            DeletionReason::PlayersLeft => write!(f, "playersLeft"),
            DeletionReason::GameOver => write!(f, "gameOver"),
        }
    }
}

struct PendingDeletion {
    token: Uuid,
    reason: DeletionReason,
    message: Option<InterruptingMessage>,
    handle: JoinHandle<()>,
}

/// One cancellable delayed deletion per game id. Scheduling again replaces
/// the pending task; a task only acts if its token is still the current one.
#[derive(Clone, Default)]
pub struct DeletionScheduler {
    pending: Arc<Mutex<HashMap<String, PendingDeletion>>>,
}

impl DeletionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingDeletion>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `action` after `delay` unless cancelled or replaced first. The
    /// action receives the token it must hand to [`DeletionScheduler::complete`].
    pub fn schedule<F, Fut>(
        &self,
        game_id: &str,
        reason: DeletionReason,
        delay: Duration,
        message: Option<InterruptingMessage>,
        action: F,
    ) -> Uuid
    where
        F: FnOnce(Uuid) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = Uuid::new_v4();
        // spawn under the lock so a zero delay cannot complete before insert
        let mut pending = self.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action(token).await;
        });

        let replaced = pending.insert(
            game_id.to_string(),
            PendingDeletion {
                token,
                reason,
                message,
                handle,
            },
        );
        if let Some(previous) = replaced {
            previous.handle.abort();
            debug!(
                "Replaced pending {} deletion of game {}",
                previous.reason, game_id
            );
        }

        info!(
            "Scheduled {} deletion of game {} in {:?}",
            reason, game_id, delay
        );
        token
    }

    pub fn cancel(&self, game_id: &str) -> bool {
        match self.lock().remove(game_id) {
            Some(pending) => {
                pending.handle.abort();
                info!("Cancelled {} deletion of game {}", pending.reason, game_id);
                true
            }
            None => false,
        }
    }

    /// Cancels the pending deletion only when it was scheduled for `reason`.
    pub fn cancel_if(&self, game_id: &str, reason: DeletionReason) -> bool {
        let mut pending = self.lock();
        if pending.get(game_id).map(|entry| entry.reason) != Some(reason) {
            return false;
        }
        if let Some(entry) = pending.remove(game_id) {
            entry.handle.abort();
            info!("Cancelled {} deletion of game {}", reason, game_id);
        }
        true
    }

    pub fn pending_reason(&self, game_id: &str) -> Option<DeletionReason> {
        self.lock().get(game_id).map(|entry| entry.reason)
    }

    pub fn pending_message(&self, game_id: &str) -> Option<InterruptingMessage> {
        self.lock()
            .get(game_id)
            .and_then(|entry| entry.message.clone())
    }

    /// Claims the pending slot for a firing task. Returns the reason only if
    /// `token` is still the current one, so a deletion fires at most once.
    pub fn complete(&self, game_id: &str, token: Uuid) -> Option<DeletionReason> {
        let mut pending = self.lock();
        match pending.get(game_id) {
            Some(entry) if entry.token == token => pending.remove(game_id).map(|entry| entry.reason),
            _ => None,
        }
    }
}
