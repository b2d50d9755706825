use actix_web::web::{Bytes, Data, Path, Query};
use actix_web::{get, post, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::checkout::CheckoutPayload;
use crate::models::common::ApiResponse;
use crate::models::program::PurchasedProgram;
use crate::services::database::DatabaseService;
use crate::services::expiration::{classify_expiration, SubscriptionStatus};
use crate::services::orders::OrderServiceClient;
use crate::services::programs::{filter_expired_subscriptions_at, get_expired_subscriptions_at};

pub const SIGNATURE_HEADER: &str = "X-Signature";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramListQuery {
    pub include_expired: Option<bool>,
}

/// A purchased program together with its live status for the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramView {
    #[serde(flatten)]
    pub program: PurchasedProgram,
    pub status: SubscriptionStatus,
}

fn to_views(programs: Vec<PurchasedProgram>, now: DateTime<Utc>, app: &AppConfig) -> Vec<ProgramView> {
    programs
        .into_iter()
        .map(|program| {
            let status = classify_expiration(program.expiration_date, now, app.expiring_soon_days);
            ProgramView { program, status }
        })
        .collect()
}

// POST /users/{uid}/programs
// Called by the order backend once payment has cleared.
#[post("/users/{uid}/programs")]
pub async fn record_purchase(
    db: Data<DatabaseService>,
    orders: Data<OrderServiceClient>,
    req: HttpRequest,
    path: Path<String>,
    body: Bytes,
) -> Result<HttpResponse, AppError> {
    let uid = path.into_inner();

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;
    if !orders.validate_signature(&body, signature) {
        log::warn!("Rejected purchase callback for user {} with bad signature", uid);
        return Err(AppError::InvalidSignature);
    }

    let payload: CheckoutPayload = serde_json::from_slice(&body)?;
    if payload.user_id != uid {
        return Err(AppError::BadRequest(format!(
            "Payload belongs to user {}, not {}",
            payload.user_id, uid
        )));
    }

    let programs = db.record_purchase(&payload).await?;
    let message = format!("Recorded {} programs", programs.len());

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(programs, message)))
}

// GET /users/{uid}/programs?includeExpired=true
#[get("/users/{uid}/programs")]
pub async fn list_programs(
    db: Data<DatabaseService>,
    app: Data<AppConfig>,
    path: Path<String>,
    query: Query<ProgramListQuery>,
) -> Result<HttpResponse, AppError> {
    let uid = path.into_inner();
    let now = Utc::now();

    let programs = db.mark_expired(&uid, now).await?;
    let visible = if query.include_expired.unwrap_or(false) {
        programs
    } else {
        filter_expired_subscriptions_at(&programs, now)
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(to_views(visible, now, &app))))
}

// GET /users/{uid}/programs/expired
#[get("/users/{uid}/programs/expired")]
pub async fn list_expired_programs(
    db: Data<DatabaseService>,
    app: Data<AppConfig>,
    path: Path<String>,
) -> Result<HttpResponse, AppError> {
    let uid = path.into_inner();
    let now = Utc::now();

    let programs = db.mark_expired(&uid, now).await?;
    let expired = get_expired_subscriptions_at(&programs, now);

    Ok(HttpResponse::Ok().json(ApiResponse::success(to_views(expired, now, &app))))
}
