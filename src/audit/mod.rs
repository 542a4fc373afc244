//! Durable, append-only audit trail.
//!
//! This is a separate concern from diagnostic `tracing` output: audit
//! entries are written to the log store and queried back by the `/api/logs`
//! endpoint. Entries are never mutated or deleted.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

mod memory;
mod postgres;

pub use memory::MemoryAuditSink;
pub use postgres::PgAuditSink;

/// Request body keys whose values never reach the audit store.
const REDACTED_KEYS: &[&str] = &["password", "new_password", "otp", "token", "secret"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(LogLevel::Info),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Request metadata attached to an entry when the originating request is
/// known (currently the rate-limit rejection path).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestContext {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Redacted snapshot of the request body, when one was readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    #[schema(value_type = String)]
    pub timestamp: DateTime<Utc>,
    pub server: String,
    #[schema(value_type = Object)]
    pub details: Value,
    #[serde(flatten)]
    pub request: Option<RequestContext>,
}

/// Per-server counts of entries by level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LevelCounts {
    pub info: u64,
    pub error: u64,
}

pub type Summary = BTreeMap<String, LevelCounts>;

/// Fold `(server, level, count)` rows into the per-server summary shape.
#[must_use]
pub fn fold_summary<I>(rows: I) -> Summary
where
    I: IntoIterator<Item = (String, LogLevel, u64)>,
{
    let mut summary = Summary::new();
    for (server, level, count) in rows {
        let counts = summary.entry(server).or_default();
        match level {
            LogLevel::Info => counts.info += count,
            LogLevel::Error => counts.error += count,
        }
    }
    summary
}

/// Replace credential-bearing fields in a body snapshot. The original
/// request keeps flowing untouched; only the stored copy is scrubbed.
#[must_use]
pub fn redact_body(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        for key in REDACTED_KEYS {
            if let Some(value) = map.get_mut(*key) {
                *value = Value::String("[redacted]".to_string());
            }
        }
    }
    body
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry. The store owns it from here on.
    async fn record(&self, entry: LogEntry) -> Result<()>;

    /// Most-recent-first page of entries.
    async fn recent(&self, limit: i64) -> Result<Vec<LogEntry>>;

    /// Entry counts grouped by server identifier and level.
    async fn summary(&self) -> Result<Summary>;
}

/// Sink front-end carrying this instance's server identifier.
///
/// Emission happens after the response value is built and a sink failure is
/// reported on the diagnostic channel only; it never turns into a second
/// user-facing error.
#[derive(Clone)]
pub struct Audit {
    sink: Arc<dyn AuditSink>,
    server_id: String,
}

impl Audit {
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>, server_id: String) -> Self {
        Self { sink, server_id }
    }

    #[must_use]
    pub fn sink(&self) -> &dyn AuditSink {
        self.sink.as_ref()
    }

    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub async fn info(&self, message: &str, details: Value) {
        self.emit(LogLevel::Info, message, details, None).await;
    }

    pub async fn error(&self, message: &str, details: Value) {
        self.emit(LogLevel::Error, message, details, None).await;
    }

    pub async fn emit(
        &self,
        level: LogLevel,
        message: &str,
        details: Value,
        request: Option<RequestContext>,
    ) {
        let entry = LogEntry {
            level,
            message: message.to_string(),
            timestamp: Utc::now(),
            server: self.server_id.clone(),
            details,
            request,
        };
        if let Err(err) = self.sink.record(entry).await {
            error!("failed to append audit log entry: {err}");
        }
    }
}
