use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use tracelink_core::SessionId;

use crate::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::error::StoreError;
use crate::row_helpers;
use crate::schema;

/// Schema-less attributes attached to an event, stored verbatim.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Largest page the operator surface will request.
pub const MAX_PAGE: u32 = 200;

const EVENT_COLUMNS: &str = "id, time, ip, ua, session, payload";

/// A stored capture event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(rename = "time")]
    pub timestamp: String,
    #[serde(rename = "ip")]
    pub source_address: String,
    #[serde(rename = "ua")]
    pub user_agent: String,
    #[serde(rename = "session")]
    pub session_id: SessionId,
    pub payload: Payload,
}

/// An event about to be appended.
#[derive(Clone, Debug)]
pub struct NewEvent {
    pub timestamp: DateTime<Utc>,
    pub source_address: String,
    pub user_agent: String,
    pub session_id: SessionId,
    pub payload: Payload,
}

impl NewEvent {
    /// A visit: no payload.
    pub fn visit(
        session_id: SessionId,
        source_address: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self::report(session_id, source_address, user_agent, Payload::new())
    }

    pub fn report(
        session_id: SessionId,
        source_address: impl Into<String>,
        user_agent: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            source_address: source_address.into(),
            user_agent: user_agent.into(),
            session_id,
            payload,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Filter for [`EventStore::query`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventQuery {
    /// Exact session id match.
    pub session: Option<SessionId>,
    /// Only events with an id lower than this (paging cursor).
    pub before_id: Option<i64>,
    /// Clamped to `1..=MAX_PAGE`.
    pub limit: u32,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            session: None,
            before_id: None,
            limit: MAX_PAGE,
        }
    }
}

impl EventQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE)
    }
}

/// Per-session aggregate over the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session: SessionId,
    pub events: i64,
    /// Events that carried a non-empty payload.
    pub reports: i64,
    pub first_seen: String,
    pub last_seen: String,
    pub last_event_id: i64,
}

/// Render a capture instant the way it is stored: RFC 3339, microseconds, `Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Durable, append-only event log shared by both listeners.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct EventStore {
    pool: ConnectionPool,
}

impl EventStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with(path, &ConnectionConfig::default())
    }

    pub fn open_with(path: &Path, config: &ConnectionConfig) -> Result<Self, StoreError> {
        let pool = connection::new_file(path, config)?;
        let store = Self { pool };
        store.init_schema()?;
        info!(path = %path.display(), "event store opened");
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(|e| StoreError::Unavailable(format!("schema: {e}")))?;

        let version: Option<u32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .ok();
        if version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [schema::SCHEMA_VERSION],
            )
            .map_err(|e| StoreError::Unavailable(format!("schema version: {e}")))?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection, StoreError> {
        Ok(self.pool.get()?)
    }

    /// Durably append one event and return its id.
    #[instrument(skip(self, event), fields(session_id = %event.session_id))]
    pub fn append(&self, event: NewEvent) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(&event.payload)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO events (time, ip, ua, session, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                format_timestamp(event.timestamp),
                event.source_address,
                event.user_agent,
                event.session_id.as_str(),
                payload,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(event_id = id, "event appended");
        Ok(id)
    }

    /// At most `limit` events, newest first.
    #[instrument(skip(self))]
    pub fn list(&self, limit: u32) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY id DESC LIMIT ?1"
        ))?;
        let mut rows = stmt.query([limit])?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(row_to_event(row)?);
        }
        Ok(results)
    }

    /// Filtered listing, newest first.
    #[instrument(skip(self))]
    pub fn query(&self, q: &EventQuery) -> Result<Vec<Event>, StoreError> {
        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(session) = &q.session {
            sql.push_str(&format!(" AND session = ?{}", params.len() + 1));
            params.push(Box::new(session.as_str().to_string()));
        }
        if let Some(before) = q.before_id {
            sql.push_str(&format!(" AND id < ?{}", params.len() + 1));
            params.push(Box::new(before));
        }
        sql.push_str(&format!(" ORDER BY id DESC LIMIT ?{}", params.len() + 1));
        params.push(Box::new(q.effective_limit()));

        let conn = self.conn()?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(param_refs.as_slice())?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(row_to_event(row)?);
        }
        Ok(results)
    }

    /// Number of stored events.
    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
    }

    /// Aggregate events per session id, most recently active first.
    #[instrument(skip(self))]
    pub fn sessions(&self, limit: u32) -> Result<Vec<SessionSummary>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session,
                    COUNT(*),
                    SUM(CASE WHEN payload IS NULL OR TRIM(payload) IN ('', '{}', 'null') THEN 0 ELSE 1 END),
                    MIN(time),
                    MAX(time),
                    MAX(id)
             FROM events
             GROUP BY session
             ORDER BY MAX(id) DESC
             LIMIT ?1",
        )?;
        let mut rows = stmt.query([limit])?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(SessionSummary {
                session: SessionId::from_raw(row_helpers::get::<String>(row, 0, "events", "session")?),
                events: row_helpers::get(row, 1, "events", "id")?,
                reports: row_helpers::get(row, 2, "events", "payload")?,
                first_seen: row_helpers::get(row, 3, "events", "time")?,
                last_seen: row_helpers::get(row, 4, "events", "time")?,
                last_event_id: row_helpers::get(row, 5, "events", "id")?,
            });
        }
        Ok(results)
    }

    /// Delete every event. Returns rows removed.
    ///
    /// The id sequence keeps its high-water mark, so ids issued after a clear
    /// never collide with ids a reader saw before it.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM events", [])?;
        info!(removed, "event store cleared");
        Ok(removed as u64)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<Event, StoreError> {
    let payload_raw: Option<String> = row_helpers::get_opt(row, 5, "events", "payload")?;
    let payload = row_helpers::parse_payload(payload_raw.as_deref(), "events", "payload")?;

    Ok(Event {
        id: row_helpers::get(row, 0, "events", "id")?,
        timestamp: row_helpers::get(row, 1, "events", "time")?,
        source_address: row_helpers::get(row, 2, "events", "ip")?,
        user_agent: row_helpers::get(row, 3, "events", "ua")?,
        session_id: SessionId::from_raw(row_helpers::get::<String>(row, 4, "events", "session")?),
        payload,
    })
}
