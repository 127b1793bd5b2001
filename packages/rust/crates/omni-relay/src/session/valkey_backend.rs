//! Valkey-backed turn log for multi-instance relays.
//!
//! Layout per session:
//! - `{prefix}:turns:{session}`   hash  turn_id -> turn JSON (as appended)
//! - `{prefix}:answers:{session}` hash  turn_id -> answer JSON (set once via HSETNX)
//! - `{prefix}:order:{session}`   zset  turn_id scored by `created_at_ms`

use anyhow::{Context, Result};
use omni_window::Turn;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::StoreSettings;
use crate::observability::RelayEvent;

use super::error::StoreError;

const DEFAULT_STORE_KEY_PREFIX: &str = "omni-relay:turns";

#[derive(Debug, Clone)]
pub(crate) struct ValkeyStoreConfig {
    pub(crate) url: String,
    pub(crate) key_prefix: String,
    pub(crate) ttl_secs: Option<u64>,
}

impl ValkeyStoreConfig {
    /// Env (`VALKEY_URL`, `OMNI_RELAY_STORE_PREFIX`, `OMNI_RELAY_STORE_TTL_SECS`) over settings.
    pub(crate) fn resolve(settings: &StoreSettings) -> Option<Self> {
        let url = env_non_empty("VALKEY_URL").or_else(|| trimmed(settings.valkey_url.as_deref()))?;
        let key_prefix = env_non_empty("OMNI_RELAY_STORE_PREFIX")
            .or_else(|| trimmed(settings.key_prefix.as_deref()))
            .unwrap_or_else(|| DEFAULT_STORE_KEY_PREFIX.to_string());
        let ttl_secs = match std::env::var("OMNI_RELAY_STORE_TTL_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(v) if v > 0 => Some(v),
                _ => {
                    tracing::warn!(
                        env_var = "OMNI_RELAY_STORE_TTL_SECS",
                        value = %raw,
                        "invalid store ttl env value; using settings/default"
                    );
                    settings.ttl_secs.filter(|v| *v > 0)
                }
            },
            Err(_) => settings.ttl_secs.filter(|v| *v > 0),
        };
        Some(Self {
            url,
            key_prefix,
            ttl_secs,
        })
    }

    pub(crate) fn from_parts(url: String, key_prefix: Option<String>, ttl_secs: Option<u64>) -> Self {
        Self {
            url,
            key_prefix: trimmed(key_prefix.as_deref())
                .unwrap_or_else(|| DEFAULT_STORE_KEY_PREFIX.to_string()),
            ttl_secs: ttl_secs.filter(|v| *v > 0),
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| trimmed(Some(&v)))
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Serialize, Deserialize)]
struct AnswerRecord {
    answer: String,
    token_cost: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
}

impl AnswerRecord {
    fn apply(self, turn: &mut Turn) {
        turn.answer = Some(self.answer);
        turn.token_cost = self.token_cost;
        turn.parent_id = self.parent_id;
    }
}

pub(crate) struct ValkeyTurnBackend {
    client: redis::Client,
    key_prefix: String,
    ttl_secs: Option<u64>,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl ValkeyTurnBackend {
    pub(crate) fn new(cfg: ValkeyStoreConfig) -> Result<Self> {
        let client = redis::Client::open(cfg.url.as_str())
            .with_context(|| format!("invalid valkey url for turn store: {}", cfg.url))?;
        Ok(Self {
            client,
            key_prefix: cfg.key_prefix,
            ttl_secs: cfg.ttl_secs,
            connection: Mutex::new(None),
        })
    }

    pub(crate) fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub(crate) fn ttl_secs(&self) -> Option<u64> {
        self.ttl_secs
    }

    fn turns_key(&self, session_id: &str) -> String {
        format!("{}:turns:{}", self.key_prefix, session_id)
    }

    fn answers_key(&self, session_id: &str) -> String {
        format!("{}:answers:{}", self.key_prefix, session_id)
    }

    fn order_key(&self, session_id: &str) -> String {
        format!("{}:order:{}", self.key_prefix, session_id)
    }

    async fn connection(
        &self,
        operation: &'static str,
        session_id: &str,
    ) -> Result<MultiplexedConnection, StoreError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|source| StoreError::backend(operation, session_id, source))?;
        tracing::debug!(
            event = RelayEvent::StoreValkeyConnected.as_str(),
            key_prefix = %self.key_prefix,
            "valkey turn store connected"
        );
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Drop the cached connection so the next call reconnects; no retry here.
    async fn command_failed(
        &self,
        operation: &'static str,
        session_id: &str,
        source: redis::RedisError,
    ) -> StoreError {
        *self.connection.lock().await = None;
        tracing::warn!(
            event = RelayEvent::StoreValkeyCommandFailed.as_str(),
            operation,
            session_id,
            error = %source,
            "valkey turn store command failed"
        );
        StoreError::backend(operation, session_id, source)
    }

    pub(crate) async fn append(&self, turn: &Turn) -> Result<(), StoreError> {
        let session_id = turn.session_id.as_str();
        let payload =
            serde_json::to_string(turn).map_err(|source| StoreError::codec(session_id, source))?;
        let turn_id = turn.id.to_string();
        let turns_key = self.turns_key(session_id);
        let order_key = self.order_key(session_id);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HSET")
            .arg(&turns_key)
            .arg(&turn_id)
            .arg(payload)
            .ignore()
            .cmd("ZADD")
            .arg(&order_key)
            .arg(turn.created_at_ms)
            .arg(&turn_id)
            .ignore();
        if let Some(ttl) = self.ttl_secs {
            pipe.cmd("EXPIRE")
                .arg(&turns_key)
                .arg(ttl)
                .ignore()
                .cmd("EXPIRE")
                .arg(&order_key)
                .arg(ttl)
                .ignore();
        }

        let mut conn = self.connection("append", session_id).await?;
        let result: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        match result {
            Ok(()) => Ok(()),
            Err(source) => Err(self.command_failed("append", session_id, source).await),
        }
    }

    pub(crate) async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = i64::try_from(limit - 1).unwrap_or(i64::MAX);
        let mut conn = self.connection("recent", session_id).await?;

        let ids: redis::RedisResult<Vec<String>> = redis::cmd("ZREVRANGE")
            .arg(self.order_key(session_id))
            .arg(0)
            .arg(stop)
            .query_async(&mut conn)
            .await;
        let ids = match ids {
            Ok(ids) => ids,
            Err(source) => return Err(self.command_failed("recent", session_id, source).await),
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let fetched: redis::RedisResult<(Vec<Option<String>>, Vec<Option<String>>)> = redis::pipe()
            .cmd("HMGET")
            .arg(self.turns_key(session_id))
            .arg(&ids)
            .cmd("HMGET")
            .arg(self.answers_key(session_id))
            .arg(&ids)
            .query_async(&mut conn)
            .await;
        let (turn_payloads, answer_payloads) = match fetched {
            Ok(values) => values,
            Err(source) => return Err(self.command_failed("recent", session_id, source).await),
        };

        let mut turns = Vec::with_capacity(ids.len());
        for (turn_raw, answer_raw) in turn_payloads.into_iter().zip(answer_payloads) {
            // Cleared between the two reads.
            let Some(turn_raw) = turn_raw else {
                continue;
            };
            let mut turn: Turn = serde_json::from_str(&turn_raw)
                .map_err(|source| StoreError::codec(session_id, source))?;
            if let Some(answer_raw) = answer_raw {
                let record: AnswerRecord = serde_json::from_str(&answer_raw)
                    .map_err(|source| StoreError::codec(session_id, source))?;
                record.apply(&mut turn);
            }
            turns.push(turn);
        }
        Ok(turns)
    }

    pub(crate) async fn attach_answer(
        &self,
        session_id: &str,
        turn_id: Uuid,
        answer: &str,
        token_cost: usize,
        parent_id: Option<String>,
    ) -> Result<Turn, StoreError> {
        let field = turn_id.to_string();
        let mut conn = self.connection("attach_answer", session_id).await?;

        let raw: redis::RedisResult<Option<String>> = redis::cmd("HGET")
            .arg(self.turns_key(session_id))
            .arg(&field)
            .query_async(&mut conn)
            .await;
        let raw = match raw {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                return Err(StoreError::UnknownTurn {
                    session_id: session_id.to_string(),
                    turn_id,
                });
            }
            Err(source) => {
                return Err(self.command_failed("attach_answer", session_id, source).await);
            }
        };
        let mut turn: Turn =
            serde_json::from_str(&raw).map_err(|source| StoreError::codec(session_id, source))?;
        if turn.is_answered() {
            return Err(StoreError::AlreadyAnswered {
                session_id: session_id.to_string(),
                turn_id,
            });
        }

        let record = AnswerRecord {
            answer: answer.to_string(),
            token_cost,
            parent_id,
        };
        let payload =
            serde_json::to_string(&record).map_err(|source| StoreError::codec(session_id, source))?;
        let answers_key = self.answers_key(session_id);
        let mut pipe = redis::pipe();
        pipe.cmd("HSETNX").arg(&answers_key).arg(&field).arg(payload);
        if let Some(ttl) = self.ttl_secs {
            pipe.cmd("EXPIRE").arg(&answers_key).arg(ttl).ignore();
        }
        let inserted: redis::RedisResult<(bool,)> = pipe.query_async(&mut conn).await;
        match inserted {
            Ok((true,)) => {}
            Ok((false,)) => {
                return Err(StoreError::AlreadyAnswered {
                    session_id: session_id.to_string(),
                    turn_id,
                });
            }
            Err(source) => {
                return Err(self.command_failed("attach_answer", session_id, source).await);
            }
        }

        record.apply(&mut turn);
        Ok(turn)
    }

    pub(crate) async fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        let mut conn = self.connection("clear", session_id).await?;
        let result: redis::RedisResult<()> = redis::cmd("DEL")
            .arg(self.turns_key(session_id))
            .arg(self.answers_key(session_id))
            .arg(self.order_key(session_id))
            .query_async(&mut conn)
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(source) => Err(self.command_failed("clear", session_id, source).await),
        }
    }

    pub(crate) async fn len(&self, session_id: &str) -> Result<usize, StoreError> {
        let mut conn = self.connection("len", session_id).await?;
        let result: redis::RedisResult<usize> = redis::cmd("ZCARD")
            .arg(self.order_key(session_id))
            .query_async(&mut conn)
            .await;
        match result {
            Ok(count) => Ok(count),
            Err(source) => Err(self.command_failed("len", session_id, source).await),
        }
    }
}
