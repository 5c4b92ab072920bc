//! SQLite-backed message store.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use textledger_core::{
    Message, MessageStore, MessageType, MmsAddress, MmsHeader, MmsPart, MmsSelection,
    SmsSelection, StoreUnavailableError,
};

use crate::error::Result;

/// Message store backed by a local SQLite telephony database.
///
/// The `sms` table keeps dates in milliseconds, the `mms` table in
/// whole seconds, matching the device shapes the engine was built
/// around. Part content is either inline text or an externally stored
/// blob; for this backend the external content reference handed out in
/// [`MmsPart::data`] is the part id itself.
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    /// Open a store at the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema
    /// creation fails.
    pub async fn open(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        debug!(path = %database_path, "opened message store");
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema
    /// creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        // Flat SMS table, dates in epoch milliseconds
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                date INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // MMS header table, dates in epoch seconds
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS mms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Participant rows, one per address slot
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS mms_addr (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mms_id INTEGER NOT NULL,
                address TEXT NOT NULL DEFAULT '',
                type INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Body parts: inline text or an externally stored blob
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS mms_part (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mms_id INTEGER NOT NULL,
                content_type TEXT NOT NULL DEFAULT '',
                data BLOB,
                text TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Indexes for date windows and batch lookups
        sqlx::query(r"CREATE INDEX IF NOT EXISTS idx_sms_date ON sms(date)")
            .execute(&self.pool)
            .await?;
        sqlx::query(r"CREATE INDEX IF NOT EXISTS idx_mms_date ON mms(date)")
            .execute(&self.pool)
            .await?;
        sqlx::query(r"CREATE INDEX IF NOT EXISTS idx_mms_addr_mms ON mms_addr(mms_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(r"CREATE INDEX IF NOT EXISTS idx_mms_part_mms ON mms_part(mms_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert an SMS row, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_sms(&self, sender: &str, body: &str, date_millis: i64) -> Result<String> {
        let result = sqlx::query(
            r"
            INSERT INTO sms (address, body, date)
            VALUES (?, ?, ?)
            ",
        )
        .bind(sender)
        .bind(body)
        .bind(date_millis)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid().to_string())
    }

    /// Insert an MMS with its address and part rows, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn insert_mms(
        &self,
        date_secs: i64,
        addresses: &[SeedAddress],
        parts: &[SeedPart],
    ) -> Result<String> {
        let result = sqlx::query(r"INSERT INTO mms (date) VALUES (?)")
            .bind(date_secs)
            .execute(&self.pool)
            .await?;
        let mms_id = result.last_insert_rowid();

        for address in addresses {
            sqlx::query(
                r"
                INSERT INTO mms_addr (mms_id, address, type)
                VALUES (?, ?, ?)
                ",
            )
            .bind(mms_id)
            .bind(&address.address)
            .bind(address.kind)
            .execute(&self.pool)
            .await?;
        }

        for part in parts {
            sqlx::query(
                r"
                INSERT INTO mms_part (mms_id, content_type, data, text)
                VALUES (?, ?, ?, ?)
                ",
            )
            .bind(mms_id)
            .bind(&part.content_type)
            .bind(part.data.as_deref())
            .bind(part.text.as_deref())
            .execute(&self.pool)
            .await?;
        }

        Ok(mms_id.to_string())
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn query_sms(
        &self,
        selection: &SmsSelection,
    ) -> std::result::Result<Vec<Message>, StoreUnavailableError> {
        let mut sql = String::from("SELECT CAST(id AS TEXT) AS id, address, body, date FROM sms");
        let mut clauses: Vec<String> = Vec::new();
        if !selection.ids.is_empty() {
            clauses.push(format!("id IN ({})", placeholders(selection.ids.len())));
        }
        if selection.min_date.is_some() {
            clauses.push("date >= ?".to_owned());
        }
        if selection.max_date.is_some() {
            clauses.push("date <= ?".to_owned());
        }
        if selection.sender.is_some() {
            clauses.push("address = ?".to_owned());
        }
        if selection.body.is_some() {
            clauses.push("body LIKE ?".to_owned());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY date DESC");
        if selection.fetch_ceiling.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        for id in &selection.ids {
            query = query.bind(id);
        }
        if let Some(min) = selection.min_date {
            query = query.bind(min);
        }
        if let Some(max) = selection.max_date {
            query = query.bind(max);
        }
        if let Some(sender) = &selection.sender {
            query = query.bind(sender);
        }
        if let Some(body) = &selection.body {
            query = query.bind(format!("%{body}%"));
        }
        if let Some(ceiling) = selection.fetch_ceiling {
            query = query.bind(ceiling);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreUnavailableError::with_source("sms query failed", err))?;

        Ok(rows
            .iter()
            .map(|row| Message {
                id: row.get("id"),
                sender: row.get("address"),
                body: row.get("body"),
                date: row.get::<i64, _>("date"),
                message_type: MessageType::Sms,
            })
            .collect())
    }

    async fn query_mms_headers(
        &self,
        selection: &MmsSelection,
    ) -> std::result::Result<Vec<MmsHeader>, StoreUnavailableError> {
        let mut sql = String::from("SELECT CAST(id AS TEXT) AS id, date FROM mms");
        let mut clauses: Vec<String> = Vec::new();
        if !selection.ids.is_empty() {
            clauses.push(format!("id IN ({})", placeholders(selection.ids.len())));
        }
        if selection.min_date_secs.is_some() {
            clauses.push("date >= ?".to_owned());
        }
        if selection.max_date_secs.is_some() {
            clauses.push("date <= ?".to_owned());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY date DESC");
        if selection.fetch_ceiling.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        for id in &selection.ids {
            query = query.bind(id);
        }
        if let Some(min) = selection.min_date_secs {
            query = query.bind(min);
        }
        if let Some(max) = selection.max_date_secs {
            query = query.bind(max);
        }
        if let Some(ceiling) = selection.fetch_ceiling {
            query = query.bind(ceiling);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreUnavailableError::with_source("mms header query failed", err))?;

        Ok(rows
            .iter()
            .map(|row| MmsHeader {
                id: row.get("id"),
                date_secs: row.get::<i64, _>("date"),
            })
            .collect())
    }

    async fn query_mms_addresses(
        &self,
        ids: &[String],
    ) -> std::result::Result<Vec<MmsAddress>, StoreUnavailableError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT CAST(mms_id AS TEXT) AS mms_id, address, type FROM mms_addr \
             WHERE mms_id IN ({}) ORDER BY id ASC",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreUnavailableError::with_source("mms address query failed", err))?;

        Ok(rows
            .iter()
            .map(|row| MmsAddress {
                message_id: row.get("mms_id"),
                sender: row.get("address"),
                kind: row.get::<i64, _>("type"),
            })
            .collect())
    }

    async fn query_mms_parts(
        &self,
        ids: &[String],
    ) -> std::result::Result<Vec<MmsPart>, StoreUnavailableError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT CAST(mms_id AS TEXT) AS mms_id, CAST(id AS TEXT) AS part_id, \
             content_type, data IS NOT NULL AS has_data, text FROM mms_part \
             WHERE mms_id IN ({}) ORDER BY id ASC",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreUnavailableError::with_source("mms part query failed", err))?;

        Ok(rows
            .iter()
            .map(|row| {
                let part_id: String = row.get("part_id");
                let has_data: bool = row.get("has_data");
                MmsPart {
                    message_id: row.get("mms_id"),
                    data: has_data.then(|| part_id.clone()),
                    part_id,
                    content_type: row.get("content_type"),
                    text: row.get("text"),
                }
            })
            .collect())
    }

    async fn read_part_text(
        &self,
        part_id: &str,
    ) -> std::result::Result<String, StoreUnavailableError> {
        let row = sqlx::query(r"SELECT data FROM mms_part WHERE id = ?")
            .bind(part_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StoreUnavailableError::with_source("part content read failed", err))?;

        let Some(row) = row else {
            return Ok(String::new());
        };
        let bytes: Option<Vec<u8>> = row.get("data");
        let Some(bytes) = bytes else {
            return Ok(String::new());
        };

        // Stored text is consumed line by line and concatenated, so
        // line breaks inside a stored part do not survive the read.
        Ok(String::from_utf8_lossy(&bytes).lines().collect())
    }
}

/// Address row to attach when seeding an MMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAddress {
    /// Participant address.
    pub address: String,
    /// Slot type code.
    pub kind: i64,
}

impl SeedAddress {
    /// Convenience constructor.
    #[must_use]
    pub fn new(address: &str, kind: i64) -> Self {
        Self {
            address: address.to_owned(),
            kind,
        }
    }
}

/// Part row to attach when seeding an MMS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedPart {
    /// MIME content type of the part.
    pub content_type: String,
    /// Externally stored content bytes, if any.
    pub data: Option<Vec<u8>>,
    /// Inline text, if any.
    pub text: Option<String>,
}

impl SeedPart {
    /// Part carrying inline text.
    #[must_use]
    pub fn inline(content_type: &str, text: &str) -> Self {
        Self {
            content_type: content_type.to_owned(),
            data: None,
            text: Some(text.to_owned()),
        }
    }

    /// Part whose content is stored externally as bytes.
    #[must_use]
    pub fn external(content_type: &str, data: Vec<u8>) -> Self {
        Self {
            content_type: content_type.to_owned(),
            data: Some(data),
            text: None,
        }
    }
}

/// Build a `?, ?, ...` placeholder list for an `IN` clause.
fn placeholders(count: usize) -> String {
    let mut list = String::with_capacity(count.saturating_mul(3));
    for index in 0..count {
        if index > 0 {
            list.push_str(", ");
        }
        list.push('?');
    }
    list
}
