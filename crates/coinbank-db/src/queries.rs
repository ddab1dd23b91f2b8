use chrono::{SecondsFormat, Utc};
use rand::Rng;
use rusqlite::Connection;

use coinbank_types::models::{Account, ExternalIdentity};

use crate::models::{AccountRow, ExternalIdentityRow};
use crate::{Database, StoreError};

/// Account numbers are nine digits, so zero is never assigned.
const ACCOUNT_NUMBER_MIN: i64 = 100_000_000;
const ACCOUNT_NUMBER_MAX: i64 = 1_000_000_000;
const MAX_NUMBER_ATTEMPTS: usize = 16;

impl Database {
    // -- Accounts --

    pub fn create_account(&self, first_name: &str, last_name: &str) -> Result<Account, StoreError> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let number = reserve_account_number(&tx)?;
            tx.execute(
                "INSERT INTO accounts (first_name, last_name, number, balance, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                rusqlite::params![first_name, last_name, number, created_at],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            Ok(AccountRow {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                number,
                balance: 0,
                created_at,
            }
            .into())
        })
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, first_name, last_name, number, balance, created_at
                 FROM accounts ORDER BY id",
            )?;

            let rows = stmt
                .query_map([], account_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(Account::from).collect())
        })
    }

    pub fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, first_name, last_name, number, balance, created_at
                     FROM accounts WHERE id = ?1",
                    [id],
                    account_row,
                )
                .optional()?;

            Ok(row.map(Account::from))
        })
    }

    /// Returns whether a row was removed.
    pub fn delete_account(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    // -- External identities --

    pub fn external_identity_exists(&self, id: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM external_identities WHERE id = ?1", [id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Fails with [`StoreError::Duplicate`] when the id is already linked.
    pub fn create_external_identity(&self, identity: &ExternalIdentity) -> Result<(), StoreError> {
        let last_seen = identity.last_seen.to_rfc3339_opts(SecondsFormat::Secs, true);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO external_identities (id, display_name, avatar, last_seen)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![identity.id, identity.display_name, identity.avatar, last_seen],
            )?;
            Ok(())
        })
    }

    pub fn get_external_identity(&self, id: &str) -> Result<Option<ExternalIdentity>, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, display_name, avatar, last_seen FROM external_identities WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(ExternalIdentityRow {
                            id: row.get(0)?,
                            display_name: row.get(1)?,
                            avatar: row.get(2)?,
                            last_seen: row.get(3)?,
                        })
                    },
                )
                .optional()?;

            Ok(row.map(ExternalIdentity::from))
        })
    }

    pub fn count_external_identities(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM external_identities", [], |r| r.get(0))?)
        })
    }

    // -- Login states --

    /// Record a freshly issued login state. States issued before
    /// `expire_before` are purged in the same call.
    pub fn save_login_state(
        &self,
        state: &str,
        issued_at: i64,
        expire_before: i64,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM login_states WHERE issued_at < ?1", [expire_before])?;
            conn.execute(
                "INSERT INTO login_states (state, issued_at) VALUES (?1, ?2)",
                rusqlite::params![state, issued_at],
            )?;
            Ok(())
        })
    }

    /// Delete the state if it was issued at or after `not_before`.
    /// Returns true for exactly one caller per state.
    pub fn consume_login_state(&self, state: &str, not_before: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM login_states WHERE state = ?1 AND issued_at >= ?2",
                rusqlite::params![state, not_before],
            )?;
            Ok(removed == 1)
        })
    }
}

fn account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        number: row.get(3)?,
        balance: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn reserve_account_number(conn: &Connection) -> Result<i64, StoreError> {
    let mut rng = rand::rng();
    for _ in 0..MAX_NUMBER_ATTEMPTS {
        let candidate = rng.random_range(ACCOUNT_NUMBER_MIN..ACCOUNT_NUMBER_MAX);
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO issued_account_numbers (number) VALUES (?1)",
            [candidate],
        )?;
        if inserted == 1 {
            return Ok(candidate);
        }
    }
    Err(StoreError::Exhausted(MAX_NUMBER_ATTEMPTS))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
