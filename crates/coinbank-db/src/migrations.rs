use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts, external identities, login states)");
        conn.execute_batch(
            "
            CREATE TABLE accounts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name  TEXT NOT NULL,
                last_name   TEXT NOT NULL,
                number      INTEGER NOT NULL UNIQUE,
                balance     INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
                created_at  TEXT NOT NULL
            );

            -- Every account number ever handed out. Rows are never deleted,
            -- so a number freed by an account deletion is not issued again.
            CREATE TABLE issued_account_numbers (
                number      INTEGER PRIMARY KEY
            );

            CREATE TABLE external_identities (
                id            TEXT PRIMARY KEY,
                display_name  TEXT NOT NULL,
                avatar        TEXT,
                last_seen     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            );

            CREATE TABLE login_states (
                state       TEXT PRIMARY KEY,
                issued_at   INTEGER NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
