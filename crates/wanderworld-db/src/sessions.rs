//! Session persistence for tower-sessions, backed by the `sessions` table.
//!
//! Records are stored as their JSON data map next to a unix-seconds expiry
//! so expired rows can be pruned with a single indexed DELETE.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};

use crate::Database;

#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Deletes every session whose expiry has passed. Returns how many went.
    pub async fn delete_expired(&self) -> anyhow::Result<usize> {
        let db = self.db.clone();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        tokio::task::spawn_blocking(move || {
            db.with_conn(|conn| {
                Ok(conn.execute("DELETE FROM sessions WHERE expiry_date < ?1", [now])?)
            })
        })
        .await?
    }

    async fn blocking<F, T>(&self, f: F) -> session_store::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| session_store::Error::Backend(e.to_string()))?
            .map_err(|e| session_store::Error::Backend(e.to_string()))
    }
}

fn encode(record: &Record) -> session_store::Result<(String, String, i64)> {
    let data = serde_json::to_string(&record.data)
        .map_err(|e| session_store::Error::Encode(e.to_string()))?;
    Ok((record.id.to_string(), data, record.expiry_date.unix_timestamp()))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        loop {
            let (id, data, expiry) = encode(record)?;
            let inserted = self
                .blocking(move |db| {
                    db.with_conn(|conn| {
                        Ok(conn.execute(
                            "INSERT OR IGNORE INTO sessions (id, data, expiry_date) VALUES (?1, ?2, ?3)",
                            rusqlite::params![id, data, expiry],
                        )?)
                    })
                })
                .await?;

            if inserted > 0 {
                return Ok(());
            }
            // Id collision: draw a fresh one and retry.
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let (id, data, expiry) = encode(record)?;
        self.blocking(move |db| {
            db.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO sessions (id, data, expiry_date) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET data = excluded.data, expiry_date = excluded.expiry_date",
                    rusqlite::params![id, data, expiry],
                )?;
                Ok(())
            })
        })
        .await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let key = session_id.to_string();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let row = self
            .blocking(move |db| {
                db.with_conn(|conn| {
                    Ok(conn
                        .query_row(
                            "SELECT data, expiry_date FROM sessions WHERE id = ?1 AND expiry_date > ?2",
                            rusqlite::params![key, now],
                            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                        )
                        .optional()?)
                })
            })
            .await?;

        let Some((data, expiry)) = row else {
            return Ok(None);
        };

        let data: HashMap<String, serde_json::Value> = serde_json::from_str(&data)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;
        let expiry_date = OffsetDateTime::from_unix_timestamp(expiry)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;

        Ok(Some(Record {
            id: *session_id,
            data,
            expiry_date,
        }))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let key = session_id.to_string();
        self.blocking(move |db| {
            db.with_conn(|conn| {
                conn.execute("DELETE FROM sessions WHERE id = ?1", [key])?;
                Ok(())
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn store() -> SqliteSessionStore {
        SqliteSessionStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn record(expires_in: Duration) -> Record {
        let mut data = HashMap::new();
        data.insert("user_id".to_string(), serde_json::json!("abc"));
        Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn saved_record_loads_back() {
        let store = store();
        let mut rec = record(Duration::days(7));
        store.create(&mut rec).await.unwrap();

        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.data, rec.data);
        assert_eq!(
            loaded.expiry_date.unix_timestamp(),
            rec.expiry_date.unix_timestamp()
        );

        rec.data.clear();
        store.save(&rec).await.unwrap();
        assert!(store.load(&rec.id).await.unwrap().unwrap().data.is_empty());
    }

    #[tokio::test]
    async fn deleted_and_expired_records_do_not_load() {
        let store = store();
        let mut live = record(Duration::days(1));
        let mut stale = record(Duration::hours(-1));
        store.create(&mut live).await.unwrap();
        store.create(&mut stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
        assert_eq!(store.delete_expired().await.unwrap(), 1);

        store.delete(&live.id).await.unwrap();
        assert!(store.load(&live.id).await.unwrap().is_none());
    }
}
