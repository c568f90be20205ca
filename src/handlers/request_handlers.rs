use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::require_device;
use crate::db::DbPool;
use crate::errors::ApiError;
use crate::lifecycle;
use crate::models::request::{
    Bbox, Category, Claim, CreateRequestIn, Item, ListFilter, Request, SortOrder, Status, Urgency,
};

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::Validation("invalid id".to_string()))
}

// ---------------------------------------------------------------------------
// Response shapes (field names are the client compatibility surface)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct RequestCard {
    pub id: String,
    pub category: Category,
    pub urgency_window: Urgency,
    pub severity: i64,
    pub status: Status,
    pub lat: f64,
    pub lng: f64,
    pub estimated_total: f64,
    pub requester_afford: f64,
    pub funding_goal: f64,
    pub funded_amount: f64,
    pub progress: f64,
    pub rank_score: f64,
}

impl RequestCard {
    fn from_request(r: &Request) -> Self {
        RequestCard {
            id: r.id.to_string(),
            category: r.category,
            urgency_window: r.urgency_window,
            severity: r.severity,
            status: r.status,
            lat: r.location.lat,
            lng: r.location.lng,
            estimated_total: r.estimated_total,
            requester_afford: r.requester_afford,
            funding_goal: r.funding_goal,
            funded_amount: r.funded_amount,
            progress: r.progress,
            rank_score: r.rank_score,
        }
    }
}

#[derive(Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub card: RequestCard,
    pub raw_text: String,
    pub items: Vec<Item>,
    pub rank_reason: String,
    pub claim: Option<Claim>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestDetail {
    fn from_request(r: Request) -> Self {
        RequestDetail {
            card: RequestCard::from_request(&r),
            raw_text: r.raw_text,
            items: r.items,
            rank_reason: r.rank_reason,
            claim: r.claim,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/requests - Create a request from a structured draft.
pub async fn create(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    payload: web::Json<CreateRequestIn>,
) -> Result<HttpResponse, ApiError> {
    let device = require_device(&req)?;
    let conn = pool.get()?;

    let created = lifecycle::create(&conn, &device, &payload)?;
    Ok(HttpResponse::Ok().json(json!({
        "request": {
            "id": created.id.to_string(),
            "status": created.status,
            "funding_goal": created.funding_goal,
            "funded_amount": created.funded_amount,
            "progress": created.progress,
            "rank_score": created.rank_score,
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub bbox: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
}

fn parse_bbox(raw: &str) -> Result<Bbox, ApiError> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ApiError::Validation("bbox must be minLat,minLng,maxLat,maxLng".to_string()))?;
    if parts.len() != 4 {
        return Err(ApiError::Validation(
            "bbox must be minLat,minLng,maxLat,maxLng".to_string(),
        ));
    }
    Ok(Bbox {
        min_lat: parts[0],
        min_lng: parts[1],
        max_lat: parts[2],
        max_lng: parts[3],
    })
}

/// GET /v1/requests - List request cards.
/// Query params: bbox (minLat,minLng,maxLat,maxLng), status (filter),
/// sort (rank|new, default rank), limit (1-1000, default 200).
pub async fn list(
    pool: web::Data<DbPool>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            Status::parse(raw).ok_or_else(|| ApiError::Validation("invalid status".to_string()))?,
        ),
        None => None,
    };
    let bbox = match query.bbox.as_deref() {
        Some(raw) => Some(parse_bbox(raw)?),
        None => None,
    };
    let sort = match query.sort.as_deref() {
        Some("new") => SortOrder::Newest,
        _ => SortOrder::Rank,
    };
    let limit = query.limit.unwrap_or(200).clamp(1, 1000);

    let conn = pool.get()?;
    let requests = crate::models::request::list(&conn, &ListFilter { status, bbox, sort, limit })?;
    let cards: Vec<RequestCard> = requests.iter().map(RequestCard::from_request).collect();
    Ok(HttpResponse::Ok().json(json!({ "requests": cards })))
}

/// GET /v1/requests/{id} - Full request detail.
pub async fn detail(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let conn = pool.get()?;
    let request = crate::models::request::find_by_id(&conn, id)?.ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(json!({ "request": RequestDetail::from_request(request) })))
}

#[derive(Debug, Deserialize)]
pub struct DonateIn {
    pub amount: f64,
}

/// POST /v1/requests/{id}/donate - Record a settled donation and apply it.
pub async fn donate(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<DonateIn>,
) -> Result<HttpResponse, ApiError> {
    let donor = require_device(&req)?;
    let id = parse_id(&path)?;
    let conn = pool.get()?;

    let updated = lifecycle::donate(&conn, id, &donor, payload.amount)?;
    Ok(HttpResponse::Ok().json(json!({
        "request": {
            "id": updated.id.to_string(),
            "funded_amount": updated.funded_amount,
            "funding_goal": updated.funding_goal,
            "progress": updated.progress,
            "status": updated.status,
            "rank_score": updated.rank_score,
            "rank_reason": updated.rank_reason,
        }
    })))
}

/// POST /v1/requests/{id}/claim - Claim a funded request for delivery.
pub async fn claim(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let helper = require_device(&req)?;
    let id = parse_id(&path)?;
    let conn = pool.get()?;

    let updated = lifecycle::claim(&conn, id, &helper)?;
    Ok(HttpResponse::Ok().json(json!({
        "request": {
            "id": updated.id.to_string(),
            "status": updated.status,
            "claim": updated.claim,
        }
    })))
}

/// POST /v1/requests/{id}/delivered - Mark a claimed request delivered.
pub async fn delivered(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let helper = require_device(&req)?;
    let id = parse_id(&path)?;
    let conn = pool.get()?;

    let updated = lifecycle::mark_delivered(&conn, id, &helper)?;
    Ok(HttpResponse::Ok().json(json!({
        "request": {
            "id": updated.id.to_string(),
            "status": updated.status,
        }
    })))
}

/// POST /v1/ai/rank - Recompute rank for all open/funded requests.
pub async fn rerank(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let updated = lifecycle::rerank(&conn)?;
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}
