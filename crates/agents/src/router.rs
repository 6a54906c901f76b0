use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use wayfarer_core::replies::EMPTY_MESSAGE;
use wayfarer_core::{
    classify_intent, normalize_text, ChatInput, ChatReply, ConversationSession, ModerationGate,
    ModerationPolicy, ModerationVerdict, ReplyOutcome,
};
use wayfarer_observability::AppMetrics;
use wayfarer_providers::Providers;
use wayfarer_storage::SessionRepository;

use crate::dispatch::ProviderDispatcher;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Moderation gate, then intent classification, then one provider dispatch.
/// Moderation state lives on the per-client session, never on the router.
#[derive(Clone)]
pub struct ChatRouter<S>
where
    S: SessionRepository,
{
    gate: ModerationGate,
    dispatcher: ProviderDispatcher,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
    session_ttl: Duration,
    locks: Arc<SessionLocks>,
}

/// One async lock per session id, so load, screen and persist of a session
/// never interleave with another request for the same id.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    fn prune(&self) {
        self.inner.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

impl<S> ChatRouter<S>
where
    S: SessionRepository,
{
    pub fn new(store: Arc<S>, providers: Providers, metrics: Arc<AppMetrics>) -> Self {
        Self {
            gate: ModerationGate::default(),
            dispatcher: ProviderDispatcher::new(providers, metrics.clone()),
            store,
            metrics,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            locks: Arc::default(),
        }
    }

    pub fn with_policy(mut self, policy: ModerationPolicy) -> Self {
        self.gate = ModerationGate::new(policy);
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn dispatcher(&self) -> &ProviderDispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    #[instrument(
        skip(self, input),
        fields(session_id = input.session_id.as_deref().unwrap_or("new"))
    )]
    pub async fn handle_message(&self, input: ChatInput) -> Result<ChatReply, RouterError> {
        let started = Instant::now();
        self.metrics.inc_request();

        let normalized = normalize_text(&input.text);
        if normalized.is_empty() {
            return Err(RouterError::InvalidInput(EMPTY_MESSAGE.to_string()));
        }

        let requested = input
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let guard = match requested {
            Some(session_id) => Some(self.locks.acquire(session_id).await),
            None => None,
        };

        let mut session = self.load_or_create(requested).await?;
        let verdict = self.gate.screen(&mut session.moderation, &normalized);
        if let Some(user_id) = input.user_id {
            session.user_id = Some(user_id);
        }
        session.touch(self.session_ttl);
        self.store.upsert_session(&session).await?;
        drop(guard);

        let reply = match (verdict.reply(), verdict.intent_kind()) {
            (Some(text), Some(intent)) => {
                self.metrics.inc_moderated(verdict_label(&verdict));
                ChatReply {
                    session_id: session.session_id.clone(),
                    reply_text: text.to_string(),
                    intent,
                    outcome: ReplyOutcome::Moderated,
                    provider: None,
                    blocked: session.is_blocked(),
                }
            }
            _ => {
                let intent = classify_intent(&normalized);
                let dispatched = self.dispatcher.dispatch(&intent, &normalized).await;
                ChatReply {
                    session_id: session.session_id.clone(),
                    reply_text: dispatched.text,
                    intent: intent.kind(),
                    outcome: dispatched.outcome,
                    provider: dispatched.provider,
                    blocked: session.is_blocked(),
                }
            }
        };

        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %reply.session_id,
            intent = reply.intent.as_str(),
            outcome = ?reply.outcome,
            provider = reply.provider.map(|provider| provider.as_str()),
            blocked = reply.blocked,
            "chat handled"
        );

        Ok(reply)
    }

    /// Starts a fresh session, optionally bound to an authenticated user.
    pub async fn open_session(
        &self,
        user_id: Option<String>,
    ) -> Result<ConversationSession, RouterError> {
        let mut session = ConversationSession::new(Uuid::new_v4().to_string(), self.session_ttl);
        session.user_id = user_id;
        self.store.upsert_session(&session).await?;
        Ok(session)
    }

    /// Returns the session only while it has not expired.
    pub async fn live_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationSession>, RouterError> {
        let session = self.store.load_session(session_id).await?;
        Ok(session.filter(|session| !session.is_expired(Utc::now())))
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, RouterError> {
        let purged = self.store.purge_expired(Utc::now()).await?;
        self.locks.prune();
        Ok(purged)
    }

    /// Only ids this router issued are resumed. Unknown or expired ids get a
    /// fresh one, so a client cannot pick its own session id.
    async fn load_or_create(
        &self,
        session_id: Option<&str>,
    ) -> Result<ConversationSession, RouterError> {
        if let Some(session_id) = session_id {
            match self.store.load_session(session_id).await? {
                Some(session) if !session.is_expired(Utc::now()) => return Ok(session),
                Some(_) => debug!(session_id = %session_id, "session expired"),
                None => debug!(session_id = %session_id, "unknown session id"),
            }
        }

        Ok(ConversationSession::new(
            Uuid::new_v4().to_string(),
            self.session_ttl,
        ))
    }
}

fn verdict_label(verdict: &ModerationVerdict) -> &'static str {
    match verdict {
        ModerationVerdict::Pass => "pass",
        ModerationVerdict::Violation { .. } => "violation",
        ModerationVerdict::StillBlocked => "still_blocked",
        ModerationVerdict::Apologized => "apologized",
    }
}
