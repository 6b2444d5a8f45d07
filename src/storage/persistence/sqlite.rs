//! `SQLite`-based entry store.
//!
//! Provides durable storage using `SQLite` as the authoritative source of truth.
//!
//! # Schema
//!
//! One row per skill. The full skill is stored as JSON in `data`; `title`,
//! `tier`, `is_active` and `updated_at` are duplicated into columns so the
//! database stays inspectable. `position` preserves the native list order.

use crate::models::{NewSkill, Skill, SkillId, SkillPatch};
use crate::storage::sqlite::{StoreTimer, acquire_lock, configure_connection};
use crate::storage::traits::EntryStore;
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::instrument;

/// `SQLite`-based entry store.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access; WAL mode and
/// `busy_timeout` handle contention from other processes. Updates run in an
/// immediate transaction so read-modify-write is atomic per skill.
pub struct SqliteEntryStore {
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteEntryStore {
    /// Opens (or creates) a store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_db_dir".to_string(),
                cause: e.to_string(),
            })?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_in_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS skills (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                tier TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_skills_position ON skills(position);",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_skills_table".to_string(),
            cause: e.to_string(),
        })
    }

    fn encode(skill: &Skill) -> Result<String> {
        serde_json::to_string(skill).map_err(|e| Error::OperationFailed {
            operation: "encode_skill".to_string(),
            cause: e.to_string(),
        })
    }

    fn decode(data: &str) -> Result<Skill> {
        serde_json::from_str(data).map_err(|e| Error::OperationFailed {
            operation: "decode_skill".to_string(),
            cause: e.to_string(),
        })
    }

    fn sql_error(operation: &str) -> impl FnOnce(rusqlite::Error) -> Error + '_ {
        move |e| Error::OperationFailed {
            operation: operation.to_string(),
            cause: e.to_string(),
        }
    }

    /// Inserts a new row at the end of the order, or replaces an existing row
    /// in place.
    fn upsert(conn: &Connection, skill: &Skill) -> Result<()> {
        let data = Self::encode(skill)?;
        conn.execute(
            "INSERT INTO skills (id, position, title, tier, is_active, updated_at, data)
             VALUES (?1, (SELECT COALESCE(MAX(position), -1) + 1 FROM skills), ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                tier = excluded.tier,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at,
                data = excluded.data",
            params![
                skill.id.as_str(),
                skill.title,
                skill.tier.as_str(),
                skill.is_active,
                skill.updated_at.to_rfc3339(),
                data,
            ],
        )
        .map_err(Self::sql_error("upsert_skill"))?;
        Ok(())
    }

    fn fetch(conn: &Connection, id: &SkillId) -> Result<Option<Skill>> {
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM skills WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(Self::sql_error("get_skill"))?;
        data.as_deref().map(Self::decode).transpose()
    }
}

impl EntryStore for SqliteEntryStore {
    #[instrument(skip(self), fields(component = "storage", backend = "sqlite"))]
    fn list(&self) -> Result<Vec<Skill>> {
        let timer = StoreTimer::start("sqlite", "list");
        let result = (|| {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare("SELECT data FROM skills ORDER BY position ASC")
                .map_err(Self::sql_error("list_skills"))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(Self::sql_error("list_skills"))?;

            let mut skills = Vec::new();
            for row in rows {
                let data = row.map_err(Self::sql_error("list_skills"))?;
                skills.push(Self::decode(&data)?);
            }
            Ok(skills)
        })();
        timer.finish(result)
    }

    fn get(&self, id: &SkillId) -> Result<Option<Skill>> {
        let timer = StoreTimer::start("sqlite", "get");
        let result = {
            let conn = acquire_lock(&self.conn);
            Self::fetch(&conn, id)
        };
        timer.finish(result)
    }

    #[instrument(skip(self, skill), fields(component = "storage", backend = "sqlite"))]
    fn create(&self, skill: NewSkill) -> Result<Skill> {
        let timer = StoreTimer::start("sqlite", "create");
        let created = skill.into_skill(SkillId::generate(), Utc::now());
        let result = {
            let conn = acquire_lock(&self.conn);
            Self::upsert(&conn, &created).map(|()| created)
        };
        timer.finish(result)
    }

    fn import(&self, skill: Skill) -> Result<Skill> {
        let timer = StoreTimer::start("sqlite", "import");
        let result = {
            let conn = acquire_lock(&self.conn);
            Self::upsert(&conn, &skill).map(|()| skill)
        };
        timer.finish(result)
    }

    #[instrument(skip(self, patch), fields(component = "storage", backend = "sqlite", skill_id = %id))]
    fn update(&self, id: &SkillId, patch: &SkillPatch) -> Result<Skill> {
        let timer = StoreTimer::start("sqlite", "update");
        let result = (|| {
            let mut conn = acquire_lock(&self.conn);
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(Self::sql_error("begin_transaction"))?;

            let mut skill = Self::fetch(&tx, id)?.ok_or_else(|| Error::NotFound {
                kind: "skill",
                id: id.to_string(),
            })?;
            patch.apply_to(&mut skill, Utc::now());
            Self::upsert(&tx, &skill)?;

            tx.commit().map_err(Self::sql_error("commit_transaction"))?;
            Ok(skill)
        })();
        timer.finish(result)
    }

    #[instrument(skip(self), fields(component = "storage", backend = "sqlite", skill_id = %id))]
    fn delete(&self, id: &SkillId) -> Result<()> {
        let timer = StoreTimer::start("sqlite", "delete");
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.execute("DELETE FROM skills WHERE id = ?1", params![id.as_str()])
                .map_err(Self::sql_error("delete_skill"))
                .and_then(|deleted| {
                    if deleted > 0 {
                        Ok(())
                    } else {
                        Err(Error::NotFound {
                            kind: "skill",
                            id: id.to_string(),
                        })
                    }
                })
        };
        timer.finish(result)
    }

    fn count(&self) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM skills", [], |row| row.get(0))
            .map_err(Self::sql_error("count_skills"))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
