//! Route handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use sdk::errors::AppError;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::extract::{ApiJson, ApiQuery, AuthUser};
use super::AppState;
use crate::auth::IssuedSession;
use crate::db::{CancellationGuide, Subscription, User};
use crate::reminders::{today, ReminderReport};
use crate::subscriptions::{NewSubscription, SubscriptionUpdate};

type ApiResult<T> = Result<T, ApiError>;

const DEFAULT_UPCOMING_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReminderQuery {
    /// Check as of this date instead of today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct GuideRequest {
    pub service_name: String,
    #[serde(default)]
    pub refresh: bool,
}

pub async fn status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Credentials>,
) -> ApiResult<(StatusCode, Json<IssuedSession>)> {
    let issued = state.auth.register(&req.email, &req.password).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Credentials>,
) -> ApiResult<Json<IssuedSession>> {
    let issued = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(issued))
}

pub async fn logout(State(state): State<AppState>, user: AuthUser) -> ApiResult<StatusCode> {
    state.auth.logout(&user.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.auth.current_user(&user.user_id).await?))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Subscription>>> {
    Ok(Json(state.subscriptions.list(&user.user_id).await?))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewSubscription>,
) -> ApiResult<(StatusCode, Json<Subscription>)> {
    let sub = state.subscriptions.create(&user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(sub)))
}

pub async fn upcoming_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<UpcomingQuery>,
) -> ApiResult<Json<Vec<Subscription>>> {
    let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    let subs = state
        .subscriptions
        .upcoming(&user.user_id, today(), days)
        .await?;
    Ok(Json(subs))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Subscription>> {
    Ok(Json(state.subscriptions.get(&user.user_id, &id).await?))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<SubscriptionUpdate>,
) -> ApiResult<Json<Subscription>> {
    let sub = state
        .subscriptions
        .update(&user.user_id, &id, patch)
        .await?;
    Ok(Json(sub))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.subscriptions.delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Subscription>> {
    Ok(Json(state.subscriptions.cancel(&user.user_id, &id).await?))
}

pub async fn check_reminders(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<ReminderQuery>,
) -> ApiResult<Json<ReminderReport>> {
    let date = query.date.unwrap_or_else(today);
    let report = state.reminders.check(Some(&user.user_id), date).await?;
    Ok(Json(report))
}

pub async fn get_guide(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(service): Path<String>,
) -> ApiResult<Json<CancellationGuide>> {
    let guide = state
        .guides
        .lookup(&service)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No cancellation guide for {}", service.trim())))?;
    Ok(Json(guide))
}

pub async fn generate_guide(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<GuideRequest>,
) -> ApiResult<Json<CancellationGuide>> {
    let guide = state
        .guides
        .get_or_generate(&req.service_name, req.refresh)
        .await?;
    Ok(Json(guide))
}
