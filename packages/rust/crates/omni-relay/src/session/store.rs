//! Turn store: session_id → ordered turn log (memory or Valkey).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use anyhow::{Context, Result};
use omni_window::Turn;
use uuid::Uuid;

use crate::config::StoreSettings;
use crate::observability::RelayEvent;

use super::error::StoreError;
use super::valkey_backend::{ValkeyStoreConfig, ValkeyTurnBackend};

/// Ordered per-session turn log. Memory turns are kept oldest first.
pub struct TurnStore {
    inner: Arc<RwLock<HashMap<String, Vec<Turn>>>>,
    valkey: Option<Arc<ValkeyTurnBackend>>,
}

impl Default for TurnStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnStore {
    fn from_valkey_backend(valkey: Option<Arc<ValkeyTurnBackend>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            valkey,
        }
    }

    /// In-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valkey_backend(None)
    }

    /// Pick the backend from settings and env (`VALKEY_URL` wins); memory when none is configured.
    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        let mode = settings
            .backend
            .as_deref()
            .map(str::trim)
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "auto".to_string());
        let valkey_config = match mode.as_str() {
            "memory" => None,
            "valkey" => Some(ValkeyStoreConfig::resolve(settings).ok_or_else(|| {
                anyhow::anyhow!(
                    "store backend=valkey requires valkey url (VALKEY_URL or store.valkey_url)"
                )
            })?),
            "auto" => ValkeyStoreConfig::resolve(settings),
            other => {
                return Err(anyhow::anyhow!(
                    "unknown store backend `{other}` (expected memory, valkey or auto)"
                ));
            }
        };
        let Some(cfg) = valkey_config else {
            tracing::info!(
                event = RelayEvent::StoreBackendEnabled.as_str(),
                backend = "memory",
                "turn store backend enabled: memory"
            );
            return Ok(Self::new());
        };
        let backend = ValkeyTurnBackend::new(cfg).context("failed to initialize valkey turn store")?;
        tracing::info!(
            event = RelayEvent::StoreBackendEnabled.as_str(),
            backend = "valkey",
            key_prefix = %backend.key_prefix(),
            ttl_secs = ?backend.ttl_secs(),
            "turn store backend enabled: valkey"
        );
        Ok(Self::from_valkey_backend(Some(Arc::new(backend))))
    }

    /// Create a store with explicit Valkey backend parameters.
    pub fn new_with_valkey(
        valkey_url: impl Into<String>,
        key_prefix: Option<String>,
        ttl_secs: Option<u64>,
    ) -> Result<Self> {
        let cfg = ValkeyStoreConfig::from_parts(valkey_url.into(), key_prefix, ttl_secs);
        let backend = ValkeyTurnBackend::new(cfg)?;
        Ok(Self::from_valkey_backend(Some(Arc::new(backend))))
    }

    /// Backend label for logs and health output.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        if self.valkey.is_some() {
            "valkey"
        } else {
            "memory"
        }
    }

    /// Append one turn; same-session appends never interleave.
    pub async fn append(&self, turn: Turn) -> Result<(), StoreError> {
        if let Some(ref valkey) = self.valkey {
            valkey.append(&turn).await?;
            tracing::debug!(
                event = RelayEvent::StoreTurnAppended.as_str(),
                session_id = %turn.session_id,
                turn_id = %turn.id,
                backend = "valkey",
                "turn appended"
            );
            return Ok(());
        }
        let mut g = self.inner.write().await;
        let entry = g.entry(turn.session_id.clone()).or_default();
        let key = (turn.created_at_ms, turn.id);
        let position = entry.partition_point(|existing| (existing.created_at_ms, existing.id) <= key);
        tracing::debug!(
            event = RelayEvent::StoreTurnAppended.as_str(),
            session_id = %turn.session_id,
            turn_id = %turn.id,
            total_turns = entry.len() + 1,
            backend = "memory",
            "turn appended"
        );
        entry.insert(position, turn);
        Ok(())
    }

    /// Up to `limit` turns, newest first.
    pub async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, StoreError> {
        if let Some(ref valkey) = self.valkey {
            let turns = valkey.recent(session_id, limit).await?;
            tracing::debug!(
                event = RelayEvent::StoreTurnsLoaded.as_str(),
                session_id,
                loaded_turns = turns.len(),
                backend = "valkey",
                "turns loaded"
            );
            return Ok(turns);
        }
        let g = self.inner.read().await;
        let turns: Vec<Turn> = g
            .get(session_id)
            .map(|turns| turns.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default();
        tracing::debug!(
            event = RelayEvent::StoreTurnsLoaded.as_str(),
            session_id,
            loaded_turns = turns.len(),
            backend = "memory",
            "turns loaded"
        );
        Ok(turns)
    }

    /// Most recent turn, answered or not.
    pub async fn latest(&self, session_id: &str) -> Result<Option<Turn>, StoreError> {
        Ok(self.recent(session_id, 1).await?.into_iter().next())
    }

    /// Close an answer-less turn. Rejects unknown and already-answered turns.
    pub async fn attach_answer(
        &self,
        session_id: &str,
        turn_id: Uuid,
        answer: &str,
        token_cost: usize,
        parent_id: Option<String>,
    ) -> Result<Turn, StoreError> {
        let backend = self.backend_name();
        let turn = if let Some(ref valkey) = self.valkey {
            valkey
                .attach_answer(session_id, turn_id, answer, token_cost, parent_id)
                .await?
        } else {
            let mut g = self.inner.write().await;
            let turn = g
                .get_mut(session_id)
                .and_then(|turns| turns.iter_mut().find(|turn| turn.id == turn_id))
                .ok_or_else(|| StoreError::UnknownTurn {
                    session_id: session_id.to_string(),
                    turn_id,
                })?;
            if turn.is_answered() {
                return Err(StoreError::AlreadyAnswered {
                    session_id: session_id.to_string(),
                    turn_id,
                });
            }
            turn.answer = Some(answer.to_string());
            turn.token_cost = token_cost;
            turn.parent_id = parent_id;
            turn.clone()
        };
        tracing::debug!(
            event = RelayEvent::StoreAnswerAttached.as_str(),
            session_id,
            turn_id = %turn_id,
            token_cost,
            backend,
            "turn answer attached"
        );
        Ok(turn)
    }

    /// Remove every turn of a session. Clearing an empty session succeeds.
    pub async fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        if let Some(ref valkey) = self.valkey {
            valkey.clear(session_id).await?;
        } else {
            self.inner.write().await.remove(session_id);
        }
        tracing::debug!(
            event = RelayEvent::StoreCleared.as_str(),
            session_id,
            backend = self.backend_name(),
            "session turns cleared"
        );
        Ok(())
    }

    /// Stored turn count for a session.
    pub async fn len(&self, session_id: &str) -> Result<usize, StoreError> {
        if let Some(ref valkey) = self.valkey {
            return valkey.len(session_id).await;
        }
        Ok(self.inner.read().await.get(session_id).map_or(0, Vec::len))
    }
}
