//! Durable per-provider API key storage.
//!
//! One live row per provider: saving a key first deletes whatever was
//! stored for that provider. Keys are plaintext in a local, single-user
//! database; the validation cache layered on top never touches disk.

use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection};
use shared::Provider;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct CredentialStore {
    conn: Arc<Mutex<Connection>>,
}

impl CredentialStore {
    /// Open (or create) the credential database under `data_dir`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join("credentials.db"))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS api_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider TEXT NOT NULL,
                key TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Store a key, superseding any previous key for the provider.
    pub fn save_key(&self, provider: Provider, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM api_keys WHERE provider = ?1",
            params![provider.as_str()],
        )?;
        conn.execute(
            "INSERT INTO api_keys (provider, key, created_at) VALUES (?1, ?2, ?3)",
            params![provider.as_str(), key, Utc::now().timestamp()],
        )?;
        debug!(provider = provider.as_str(), "credential saved");
        Ok(())
    }

    pub fn get_key(&self, provider: Provider) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key FROM api_keys WHERE provider = ?1")?;
        let mut rows = stmt.query(params![provider.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Every stored key, absent providers omitted.
    pub fn all_keys(&self) -> Result<HashMap<Provider, String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT provider, key FROM api_keys")?;
        let mut keys = HashMap::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let provider: String = row.get(0)?;
            if let Some(provider) = Provider::from_str(&provider) {
                keys.insert(provider, row.get(1)?);
            }
        }
        Ok(keys)
    }

    pub fn delete_key(&self, provider: Provider) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM api_keys WHERE provider = ?1",
            params![provider.as_str()],
        )?;
        Ok(())
    }

    #[cfg(test)]
    fn row_count(&self, provider: Provider) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM api_keys WHERE provider = ?1",
            params![provider.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .unwrap() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path()).unwrap();

        store.save_key(Provider::OpenAi, "sk-first").unwrap();
        assert_eq!(
            store.get_key(Provider::OpenAi).unwrap().as_deref(),
            Some("sk-first")
        );
        assert_eq!(store.get_key(Provider::Gemini).unwrap(), None);
    }

    #[test]
    fn resaving_supersedes_instead_of_accumulating() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path()).unwrap();

        store.save_key(Provider::Claude, "sk-ant-old").unwrap();
        store.save_key(Provider::Claude, "sk-ant-new").unwrap();

        assert_eq!(store.row_count(Provider::Claude), 1);
        assert_eq!(
            store.get_key(Provider::Claude).unwrap().as_deref(),
            Some("sk-ant-new")
        );
    }

    #[test]
    fn all_keys_skips_missing_providers() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path()).unwrap();

        store.save_key(Provider::OpenAi, "sk-a").unwrap();
        store.save_key(Provider::Deepseek, "ds-b").unwrap();

        let keys = store.all_keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[&Provider::OpenAi], "sk-a");
        assert_eq!(keys[&Provider::Deepseek], "ds-b");
    }

    #[test]
    fn delete_removes_the_row() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path()).unwrap();

        store.save_key(Provider::Grok, "xai-k").unwrap();
        store.delete_key(Provider::Grok).unwrap();
        assert_eq!(store.get_key(Provider::Grok).unwrap(), None);
    }
}
