//! Database row types: these map directly to SQLite rows.
//! Distinct from coinbank-types models to keep the DB layer independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use coinbank_types::models::{Account, ExternalIdentity};

pub struct AccountRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub number: i64,
    pub balance: i64,
    pub created_at: String,
}

pub struct ExternalIdentityRow {
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub last_seen: String,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        let created_at = parse_timestamp(&row.created_at, "account", &row.id.to_string());
        Account {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            number: row.number,
            balance: row.balance,
            created_at,
        }
    }
}

impl From<ExternalIdentityRow> for ExternalIdentity {
    fn from(row: ExternalIdentityRow) -> Self {
        let last_seen = parse_timestamp(&row.last_seen, "external identity", &row.id);
        ExternalIdentity {
            id: row.id,
            display_name: row.display_name,
            avatar: row.avatar,
            last_seen,
        }
    }
}

/// Timestamps are written as RFC 3339. Rows touched by hand in the sqlite
/// shell may carry the bare "YYYY-MM-DD HH:MM:SS" form instead.
fn parse_timestamp(raw: &str, kind: &str, id: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {} '{}': {}", raw, kind, id, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_sqlite_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T12:30:00Z", "t", "1"), expected);
        assert_eq!(parse_timestamp("2024-05-01 12:30:00", "t", "1"), expected);
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday", "t", "1"), DateTime::<Utc>::default());
    }
}
