//! SQLite-backed drink repository.
//!
//! One `drink` table: `id` (autoincrement), `title` (unique) and `recipe`
//! (JSON array of [`Ingredient`]). The connection sits behind a mutex so the
//! store can be shared across request handlers; every operation is a short
//! critical section.

mod drink;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info};

pub use drink::{Drink, DrinkPatch, Ingredient, LongDrink, NewDrink, ShortDrink, ShortIngredient};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a drink titled '{0}' already exists")]
    Conflict(String),

    #[error("invalid drink: {0}")]
    Invalid(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("recipe encoding: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS drink (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL UNIQUE,
        recipe TEXT NOT NULL
    );
";

pub struct DrinkStore {
    conn: Mutex<Connection>,
}

impl DrinkStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Pragmas applied: `journal_mode = WAL`, `busy_timeout = 5000`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "drink store opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Drop every drink and reseed the menu with a single `water`.
    pub fn drop_and_create_all(&self) -> Result<Drink, StoreError> {
        {
            let conn = self.lock()?;
            conn.execute_batch("DROP TABLE IF EXISTS drink;")?;
            conn.execute_batch(SCHEMA)?;
        }
        info!("drink table reset");
        self.insert(NewDrink {
            title: "water".into(),
            recipe: vec![Ingredient {
                name: "water".into(),
                color: "blue".into(),
                parts: 1,
            }],
        })
    }

    /// All drinks ordered by id.
    pub fn list(&self) -> Result<Vec<Drink>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, title, recipe FROM drink ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;
        rows.map(|row| -> Result<Drink, StoreError> {
            let (id, title, recipe) = row?;
            Ok(Drink {
                id,
                title,
                recipe: serde_json::from_str(&recipe)?,
            })
        })
        .collect()
    }

    pub fn get(&self, id: i64) -> Result<Option<Drink>, StoreError> {
        let conn = self.lock()?;
        Self::get_locked(&conn, id)
    }

    fn get_locked(conn: &Connection, id: i64) -> Result<Option<Drink>, StoreError> {
        let row = conn
            .query_row(
                "SELECT title, recipe FROM drink WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            Some((title, recipe)) => Ok(Some(Drink {
                id,
                title,
                recipe: serde_json::from_str(&recipe)?,
            })),
            None => Ok(None),
        }
    }

    pub fn insert(&self, new: NewDrink) -> Result<Drink, StoreError> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Invalid("title is required".into()));
        }
        if new.recipe.is_empty() {
            return Err(StoreError::Invalid("recipe must contain at least one ingredient".into()));
        }
        let recipe = serde_json::to_string(&new.recipe)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO drink (title, recipe) VALUES (?1, ?2)",
            params![title, recipe],
        )
        .map_err(|e| conflict_or(e, &title))?;
        let id = conn.last_insert_rowid();
        debug!(id, %title, "drink inserted");

        Ok(Drink {
            id,
            title,
            recipe: new.recipe,
        })
    }

    /// Returns `Ok(None)` when `id` does not exist.
    pub fn update(&self, id: i64, patch: DrinkPatch) -> Result<Option<Drink>, StoreError> {
        let conn = self.lock()?;
        let Some(mut drink) = Self::get_locked(&conn, id)? else {
            return Ok(None);
        };

        if let Some(title) = patch.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            drink.title = title;
        }
        if let Some(recipe) = patch.recipe.filter(|r| !r.is_empty()) {
            drink.recipe = recipe;
        }

        conn.execute(
            "UPDATE drink SET title = ?1, recipe = ?2 WHERE id = ?3",
            params![drink.title, serde_json::to_string(&drink.recipe)?, id],
        )
        .map_err(|e| conflict_or(e, &drink.title))?;
        debug!(id, title = %drink.title, "drink updated");

        Ok(Some(drink))
    }

    /// Returns `false` when `id` does not exist.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let n = conn.execute("DELETE FROM drink WHERE id = ?1", params![id])?;
        if n > 0 {
            debug!(id, "drink deleted");
        }
        Ok(n > 0)
    }
}

fn conflict_or(e: rusqlite::Error, title: &str) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreError::Conflict(title.to_string()),
        _ => StoreError::Sqlite(e),
    }
}
