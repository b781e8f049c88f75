//! Draft persistence: promotional content aggregates in SQLite.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection};
use shared::{ColorSettings, ContentData, PromotionType, Provider};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct ContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl ContentStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join("contents.db"))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS contents (
                id TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                promotion_type TEXT NOT NULL,
                generated_text TEXT NOT NULL,
                generated_image TEXT NOT NULL,
                colors TEXT NOT NULL,
                selected_provider TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert or replace by id.
    pub fn save(&self, content: &ContentData) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO contents
             (id, description, promotion_type, generated_text, generated_image,
              colors, selected_provider, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                content.id,
                content.description,
                serde_json::to_string(&content.promotion_type)?,
                content.generated_text,
                content.generated_image,
                serde_json::to_string(&content.colors)?,
                content.selected_provider.as_str(),
                content.created_at.timestamp(),
                content.updated_at.timestamp(),
            ],
        )?;
        debug!(id = %content.id, "content saved");
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<Option<ContentData>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, description, promotion_type, generated_text, generated_image,
                    colors, selected_provider, created_at, updated_at
             FROM contents WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_content(row)?)),
            None => Ok(None),
        }
    }

    /// All drafts, most recently updated first.
    pub fn list(&self) -> Result<Vec<ContentData>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, description, promotion_type, generated_text, generated_image,
                    colors, selected_provider, created_at, updated_at
             FROM contents ORDER BY updated_at DESC",
        )?;
        let mut rows = stmt.query([])?;
        let mut contents = Vec::new();
        while let Some(row) = rows.next()? {
            contents.push(Self::row_to_content(row)?);
        }
        Ok(contents)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM contents WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn row_to_content(row: &rusqlite::Row<'_>) -> Result<ContentData> {
        let promotion_type: String = row.get(2)?;
        let colors: String = row.get(5)?;
        let provider: String = row.get(6)?;
        let created_at: i64 = row.get(7)?;
        let updated_at: i64 = row.get(8)?;

        Ok(ContentData {
            id: row.get(0)?,
            description: row.get(1)?,
            promotion_type: serde_json::from_str::<PromotionType>(&promotion_type)?,
            generated_text: row.get(3)?,
            generated_image: row.get(4)?,
            colors: serde_json::from_str::<ColorSettings>(&colors)?,
            selected_provider: Provider::from_str(&provider).unwrap_or(Provider::OpenAi),
            created_at: Utc.timestamp_opt(created_at, 0).single().unwrap_or_default(),
            updated_at: Utc.timestamp_opt(updated_at, 0).single().unwrap_or_default(),
        })
    }
}
