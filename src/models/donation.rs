use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;

/// One settled donation. Append-only: rows are never updated or deleted,
/// they exist as the audit trail behind the funded_amount counter.
#[derive(Debug, Clone, Serialize)]
pub struct Donation {
    pub id: i64,
    pub request_id: i64,
    pub donor_id: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// Record a donation event, returning its id.
pub fn insert(
    conn: &Connection,
    request_id: i64,
    donor_id: &str,
    amount: f64,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO donations (request_id, donor_id, amount, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![request_id, donor_id, amount, now.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All donations recorded against a request, newest first.
pub fn find_by_request(conn: &Connection, request_id: i64) -> rusqlite::Result<Vec<Donation>> {
    let mut stmt = conn.prepare(
        "SELECT id, request_id, donor_id, amount, created_at \
         FROM donations WHERE request_id = ?1 ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt
        .query_map(params![request_id], |row| {
            let raw: String = row.get("created_at")?;
            let created_at = DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            Ok(Donation {
                id: row.get("id")?,
                request_id: row.get("request_id")?,
                donor_id: row.get("donor_id")?,
                amount: row.get("amount")?,
                created_at,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
