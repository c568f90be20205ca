use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, Value, ValueRef};
use rusqlite::{Connection, ToSql, params, params_from_iter};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enumerations (serialized lowercase; stored as TEXT)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Meds,
    Groceries,
    Shelter,
    Transport,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Meds => "meds",
            Category::Groceries => "groceries",
            Category::Shelter => "shelter",
            Category::Transport => "transport",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "meds" => Some(Category::Meds),
            "groceries" => Some(Category::Groceries),
            "shelter" => Some(Category::Shelter),
            "transport" => Some(Category::Transport),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Now,
    Today,
    Week,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Now => "now",
            Urgency::Today => "today",
            Urgency::Week => "week",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "now" => Some(Urgency::Now),
            "today" => Some(Urgency::Today),
            "week" => Some(Urgency::Week),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Funded,
    Claimed,
    Delivered,
    Cancelled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Funded => "funded",
            Status::Claimed => "claimed",
            Status::Delivered => "delivered",
            Status::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Status::Open),
            "funded" => Some(Status::Funded),
            "claimed" => Some(Status::Claimed),
            "delivered" => Some(Status::Delivered),
            "cancelled" => Some(Status::Cancelled),
            _ => None,
        }
    }
}

macro_rules! impl_sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()
                    .and_then(|s| <$ty>::parse(s).ok_or(FromSqlError::InvalidType))
            }
        }
    };
}

impl_sql_text_enum!(Category);
impl_sql_text_enum!(Urgency);
impl_sql_text_enum!(Status);

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

fn default_qty() -> f64 {
    1.0
}

fn default_unit() -> String {
    "unit".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default = "default_qty")]
    pub qty: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub notes: String,
}

/// Exclusive assignment of a funded request to one helper.
/// Immutable once set; present iff status is claimed or delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub helper_id: String,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub id: i64,
    pub created_by: String,
    pub raw_text: String,
    pub category: Category,
    pub urgency_window: Urgency,
    pub severity: i64,
    pub items: Vec<Item>,
    pub location: LatLng,
    pub status: Status,
    pub estimated_total: f64,
    pub requester_afford: f64,
    pub funding_goal: f64,
    pub funded_amount: f64,
    pub progress: f64,
    pub rank_score: f64,
    pub rank_reason: String,
    pub claim: Option<Claim>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload. Enum fields reject unknown variants at deserialization;
/// range checks happen once in `lifecycle::create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestIn {
    pub raw_text: String,
    pub category: Category,
    pub urgency_window: Urgency,
    pub severity: i64,
    #[serde(default)]
    pub items: Vec<Item>,
    pub estimated_total: f64,
    pub requester_afford: f64,
    pub location: LatLng,
}

/// Fully computed row ready for insertion (status open, funded_amount 0).
#[derive(Debug)]
pub struct NewRequest<'a> {
    pub created_by: &'a str,
    pub raw_text: &'a str,
    pub category: Category,
    pub urgency_window: Urgency,
    pub severity: i64,
    pub items: &'a [Item],
    pub location: LatLng,
    pub estimated_total: f64,
    pub requester_afford: f64,
    pub funding_goal: f64,
    pub progress: f64,
    pub rank_score: f64,
    pub rank_reason: &'a str,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const COLUMNS: &str = "id, created_by, raw_text, category, urgency_window, severity, items, \
     lat, lng, status, estimated_total, requester_afford, funding_goal, funded_amount, \
     progress, rank_score, rank_reason, claim_helper_id, claim_claimed_at, created_at, updated_at";

fn decode_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_error(idx, e))
}

fn row_to_request(row: &rusqlite::Row) -> rusqlite::Result<Request> {
    let items_json: String = row.get("items")?;
    let items: Vec<Item> = serde_json::from_str(&items_json).map_err(|e| decode_error(6, e))?;

    let claim = match (
        row.get::<_, Option<String>>("claim_helper_id")?,
        row.get::<_, Option<String>>("claim_claimed_at")?,
    ) {
        (Some(helper_id), Some(raw)) => Some(Claim {
            helper_id,
            claimed_at: parse_ts(18, raw)?,
        }),
        _ => None,
    };

    Ok(Request {
        id: row.get("id")?,
        created_by: row.get("created_by")?,
        raw_text: row.get("raw_text")?,
        category: row.get("category")?,
        urgency_window: row.get("urgency_window")?,
        severity: row.get("severity")?,
        items,
        location: LatLng {
            lat: row.get("lat")?,
            lng: row.get("lng")?,
        },
        status: row.get("status")?,
        estimated_total: row.get("estimated_total")?,
        requester_afford: row.get("requester_afford")?,
        funding_goal: row.get("funding_goal")?,
        funded_amount: row.get("funded_amount")?,
        progress: row.get("progress")?,
        rank_score: row.get("rank_score")?,
        rank_reason: row.get("rank_reason")?,
        claim,
        created_at: parse_ts(19, row.get("created_at")?)?,
        updated_at: parse_ts(20, row.get("updated_at")?)?,
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a freshly created request, returning its id.
pub fn insert(conn: &Connection, new: &NewRequest) -> rusqlite::Result<i64> {
    let items_json = serde_json::to_string(new.items)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let ts = new.created_at.to_rfc3339();
    conn.execute(
        "INSERT INTO requests (created_by, raw_text, category, urgency_window, severity, items, \
         lat, lng, status, estimated_total, requester_afford, funding_goal, funded_amount, \
         progress, rank_score, rank_reason, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'open', ?9, ?10, ?11, 0, ?12, ?13, ?14, ?15, ?15)",
        params![
            new.created_by,
            new.raw_text,
            new.category,
            new.urgency_window,
            new.severity,
            items_json,
            new.location.lat,
            new.location.lng,
            new.estimated_total,
            new.requester_afford,
            new.funding_goal,
            new.progress,
            new.rank_score,
            new.rank_reason,
            ts,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Request>> {
    let sql = format!("SELECT {COLUMNS} FROM requests WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![id], row_to_request)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM requests WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Rank,
    Newest,
}

#[derive(Debug, Clone, Copy)]
pub struct Bbox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ListFilter {
    pub status: Option<Status>,
    pub bbox: Option<Bbox>,
    pub sort: SortOrder,
    pub limit: i64,
}

/// List requests with optional status and bounding-box filters.
pub fn list(conn: &Connection, filter: &ListFilter) -> rusqlite::Result<Vec<Request>> {
    let mut sql = format!("SELECT {COLUMNS} FROM requests WHERE 1=1");
    let mut values: Vec<Value> = Vec::new();

    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(bbox) = filter.bbox {
        sql.push_str(" AND lat BETWEEN ? AND ? AND lng BETWEEN ? AND ?");
        values.push(Value::Real(bbox.min_lat));
        values.push(Value::Real(bbox.max_lat));
        values.push(Value::Real(bbox.min_lng));
        values.push(Value::Real(bbox.max_lng));
    }

    match filter.sort {
        SortOrder::Rank => sql.push_str(" ORDER BY rank_score DESC, created_at DESC"),
        SortOrder::Newest => sql.push_str(" ORDER BY created_at DESC"),
    }
    sql.push_str(" LIMIT ?");
    values.push(Value::Integer(filter.limit));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), row_to_request)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Atomic funding increment: applies iff the request is still fundable at the
/// moment of the write. Returns the number of rows updated (0 or 1).
pub fn add_funding(
    conn: &Connection,
    id: i64,
    amount: f64,
    now: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE requests SET funded_amount = funded_amount + ?1, updated_at = ?2 \
         WHERE id = ?3 AND status IN ('open', 'funded')",
        params![amount, now.to_rfc3339(), id],
    )
}

/// Second step of a donation: refresh progress/status from the live counter
/// and persist the freshly computed rank.
///
/// Progress and the funded transition are derived inside the statement so a
/// stale read can never regress them, no matter how concurrent snapshot
/// writes interleave. The row guard keeps a racing claim untouched, and
/// funded_amount is never written here.
pub fn apply_funding_snapshot(
    conn: &Connection,
    id: i64,
    rank_score: f64,
    rank_reason: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE requests SET \
            progress = CASE WHEN funding_goal <= 0 THEN 1.0 \
                ELSE MIN(1.0, MAX(0.0, funded_amount / funding_goal)) END, \
            status = CASE WHEN funding_goal <= 0 OR funded_amount >= funding_goal \
                THEN 'funded' ELSE status END, \
            rank_score = ?1, rank_reason = ?2, updated_at = ?3 \
         WHERE id = ?4 AND status IN ('open', 'funded')",
        params![rank_score, rank_reason, now.to_rfc3339(), id],
    )
}

/// Compare-and-set claim: succeeds for exactly one caller on a funded,
/// unclaimed request. Returns the number of rows updated (0 or 1).
pub fn set_claim(
    conn: &Connection,
    id: i64,
    helper_id: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    let ts = now.to_rfc3339();
    conn.execute(
        "UPDATE requests SET status = 'claimed', claim_helper_id = ?1, claim_claimed_at = ?2, \
         updated_at = ?2 WHERE id = ?3 AND status = 'funded' AND claim_helper_id IS NULL",
        params![helper_id, ts, id],
    )
}

/// Mark a claimed request delivered. Returns the number of rows updated.
pub fn set_delivered(conn: &Connection, id: i64, now: DateTime<Utc>) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE requests SET status = 'delivered', updated_at = ?1 \
         WHERE id = ?2 AND status = 'claimed'",
        params![now.to_rfc3339(), id],
    )
}

/// Minimal view of a request for batch re-ranking.
#[derive(Debug)]
pub struct RankableRow {
    pub id: i64,
    pub urgency_window: Urgency,
    pub severity: i64,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
}

pub fn find_rankable(conn: &Connection) -> rusqlite::Result<Vec<RankableRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, urgency_window, severity, progress, created_at \
         FROM requests WHERE status IN ('open', 'funded')",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RankableRow {
                id: row.get("id")?,
                urgency_window: row.get("urgency_window")?,
                severity: row.get("severity")?,
                progress: row.get("progress")?,
                created_at: parse_ts(4, row.get("created_at")?)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Refresh rank fields for one request; only open/funded rows are touched,
/// so a request claimed mid-batch is skipped rather than regressed.
pub fn update_rank(
    conn: &Connection,
    id: i64,
    rank_score: f64,
    rank_reason: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE requests SET rank_score = ?1, rank_reason = ?2, updated_at = ?3 \
         WHERE id = ?4 AND status IN ('open', 'funded')",
        params![rank_score, rank_reason, now.to_rfc3339(), id],
    )
}
