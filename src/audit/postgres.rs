//! Postgres-backed audit sink over the append-only `logs` table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::{fold_summary, AuditSink, LogEntry, LogLevel, RequestContext, Summary};

#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `logs` table if missing.
    ///
    /// # Errors
    /// Returns an error if the DDL fails.
    pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
        let query = r"
            CREATE TABLE IF NOT EXISTS logs (
                id BIGSERIAL PRIMARY KEY,
                level TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                server TEXT NOT NULL,
                details JSONB NOT NULL DEFAULT '{}'::jsonb,
                method TEXT,
                url TEXT,
                ip TEXT,
                user_agent TEXT,
                body JSONB
            )
        ";
        sqlx::query(query)
            .execute(pool)
            .await
            .context("failed to create logs table")?;
        Ok(())
    }
}

fn entry_from_row(row: &sqlx::postgres::PgRow) -> LogEntry {
    let level: String = row.get("level");
    let method: Option<String> = row.get("method");
    let url: Option<String> = row.get("url");
    let request = match (method, url) {
        (Some(method), Some(url)) => Some(RequestContext {
            method,
            url,
            ip: row.get("ip"),
            user_agent: row.get("user_agent"),
            body: row.get::<Option<Value>, _>("body"),
        }),
        _ => None,
    };

    LogEntry {
        level: LogLevel::parse(&level).unwrap_or(LogLevel::Error),
        message: row.get("message"),
        timestamp: row.get::<DateTime<Utc>, _>("timestamp"),
        server: row.get("server"),
        details: row.get::<Value, _>("details"),
        request,
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, entry: LogEntry) -> Result<()> {
        let query = r"
            INSERT INTO logs (level, message, timestamp, server, details, method, url, ip, user_agent, body)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        let request = entry.request.as_ref();
        sqlx::query(query)
            .bind(entry.level.as_str())
            .bind(&entry.message)
            .bind(entry.timestamp)
            .bind(&entry.server)
            .bind(&entry.details)
            .bind(request.map(|r| r.method.as_str()))
            .bind(request.map(|r| r.url.as_str()))
            .bind(request.and_then(|r| r.ip.as_deref()))
            .bind(request.and_then(|r| r.user_agent.as_deref()))
            .bind(request.and_then(|r| r.body.as_ref()))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to append log entry")?;
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<LogEntry>> {
        let query = r"
            SELECT level, message, timestamp, server, details, method, url, ip, user_agent, body
            FROM logs
            ORDER BY timestamp DESC
            LIMIT $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let rows = sqlx::query(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to read recent log entries")?;

        Ok(rows.iter().map(entry_from_row).collect())
    }

    async fn summary(&self) -> Result<Summary> {
        let query = "SELECT server, level, COUNT(*) AS total FROM logs GROUP BY server, level";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to summarize log entries")?;

        Ok(fold_summary(rows.iter().filter_map(|row| {
            let server: String = row.get("server");
            let level: String = row.get("level");
            let total: i64 = row.get("total");
            LogLevel::parse(&level).map(|level| (server, level, total.unsigned_abs()))
        })))
    }
}
