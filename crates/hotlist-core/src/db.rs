// SQLite persistence for events, users, trades and the vote log.

use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::model::{Event, NewEvent, NewUser, TradeRecord, User, Vote};
use crate::store::Repository;

/// SQLite-backed store. All access goes through a single connection guarded
/// by a mutex, and every core operation runs in its own transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                user_name TEXT NOT NULL,
                gender    TEXT NOT NULL,
                age       INTEGER NOT NULL,
                email     TEXT NOT NULL,
                phone     TEXT NOT NULL,
                vote_num  INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS rs_events (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                event_name TEXT NOT NULL,
                keyword    TEXT NOT NULL,
                vote_num   INTEGER NOT NULL DEFAULT 0 CHECK (vote_num >= 0),
                user_id    INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS trades (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                amount   INTEGER NOT NULL CHECK (amount > 0),
                rank_num INTEGER NOT NULL CHECK (rank_num >= 1),
                event_id INTEGER NOT NULL REFERENCES rs_events(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS votes (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL REFERENCES rs_events(id) ON DELETE CASCADE,
                user_id  INTEGER NOT NULL REFERENCES users(id),
                num      INTEGER NOT NULL,
                time     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_trades_rank_num ON trades(rank_num);
            CREATE INDEX IF NOT EXISTS idx_trades_event_id ON trades(event_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Run `f` inside one transaction. Commits when `f` succeeds; any error
    /// drops the transaction, which rolls back every write made through it.
    ///
    /// Holding the connection lock for the whole closure also makes reads
    /// inside `f` see a single snapshot.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        event_name: row.get(1)?,
        keyword: row.get(2)?,
        vote_num: row.get(3)?,
        user_id: row.get(4)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        user_name: row.get(1)?,
        gender: row.get(2)?,
        age: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        vote_num: row.get(6)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<TradeRecord> {
    Ok(TradeRecord {
        id: row.get(0)?,
        amount: row.get(1)?,
        rank_num: row.get(2)?,
        event_id: row.get(3)?,
    })
}

impl Repository for Connection {
    fn list_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self.prepare(
            "SELECT id, event_name, keyword, vote_num, user_id FROM rs_events ORDER BY id",
        )?;
        let events = stmt
            .query_map([], event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let event = self
            .query_row(
                "SELECT id, event_name, keyword, vote_num, user_id FROM rs_events WHERE id = ?1",
                params![id],
                event_from_row,
            )
            .optional()?;
        Ok(event)
    }

    fn insert_event(&self, event: &NewEvent) -> Result<i64> {
        let id = self.query_row(
            "INSERT INTO rs_events (event_name, keyword, vote_num, user_id)
             VALUES (?1, ?2, 0, ?3)
             RETURNING id",
            params![event.event_name, event.keyword, event.user_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn save_event(&self, event: &Event) -> Result<()> {
        self.execute(
            "UPDATE rs_events SET event_name = ?2, keyword = ?3, vote_num = ?4, user_id = ?5
             WHERE id = ?1",
            params![
                event.id,
                event.event_name,
                event.keyword,
                event.vote_num,
                event.user_id,
            ],
        )?;
        Ok(())
    }

    fn delete_event(&self, id: i64) -> Result<()> {
        self.execute("DELETE FROM rs_events WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn insert_user(&self, user: &NewUser, vote_num: i64) -> Result<i64> {
        let id = self.query_row(
            "INSERT INTO users (user_name, gender, age, email, phone, vote_num)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id",
            params![
                user.user_name,
                user.gender,
                user.age,
                user.email,
                user.phone,
                vote_num,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .query_row(
                "SELECT id, user_name, gender, age, email, phone, vote_num FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn save_user(&self, user: &User) -> Result<()> {
        self.execute(
            "UPDATE users SET user_name = ?2, gender = ?3, age = ?4, email = ?5, phone = ?6,
                vote_num = ?7
             WHERE id = ?1",
            params![
                user.id,
                user.user_name,
                user.gender,
                user.age,
                user.email,
                user.phone,
                user.vote_num,
            ],
        )?;
        Ok(())
    }

    fn list_trades(&self) -> Result<Vec<TradeRecord>> {
        let mut stmt =
            self.prepare("SELECT id, amount, rank_num, event_id FROM trades ORDER BY id")?;
        let trades = stmt
            .query_map([], trade_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trades)
    }

    fn list_trades_for_rank(&self, rank_num: u32) -> Result<Vec<TradeRecord>> {
        let mut stmt = self.prepare(
            "SELECT id, amount, rank_num, event_id FROM trades
             WHERE rank_num = ?1 ORDER BY amount DESC, id",
        )?;
        let trades = stmt
            .query_map(params![rank_num], trade_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trades)
    }

    fn save_trade(&self, amount: u32, rank_num: u32, event_id: i64) -> Result<i64> {
        let id = self.query_row(
            "INSERT INTO trades (amount, rank_num, event_id) VALUES (?1, ?2, ?3) RETURNING id",
            params![amount, rank_num, event_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn delete_trades_for_event(&self, event_id: i64) -> Result<usize> {
        let removed = self.execute("DELETE FROM trades WHERE event_id = ?1", params![event_id])?;
        Ok(removed)
    }

    fn record_vote(&self, vote: &Vote) -> Result<()> {
        self.execute(
            "INSERT INTO votes (event_id, user_id, num, time) VALUES (?1, ?2, ?3, ?4)",
            params![vote.event_id, vote.user_id, vote.vote_num, vote.time.to_rfc3339()],
        )?;
        Ok(())
    }
}
