use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use cartrack::accounts::{
    AccountServiceError, DirectoryRepository, Household, HouseholdDraft, LoginRequest,
    ReminderPreferences, SignupRequest, User,
};
use cartrack::fleet::{
    Car, CarDraft, CarId, CarPatch, FleetRepository, FleetServiceError, RenewalDraft, RenewalId,
    RenewalKind, RenewalPatch, RenewalRecord, UpcomingRenewal, DEFAULT_LOOKAHEAD_DAYS,
};

use crate::infra::{ApiContext, AppState};

/// Router exposing the full API surface plus the operational endpoints.
pub(crate) fn api_router<D, F>(context: Arc<ApiContext<D, F>>) -> Router
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/auth/signup", axum::routing::post(signup_handler::<D, F>))
        .route("/api/auth/login", axum::routing::post(login_handler::<D, F>))
        .route(
            "/api/households",
            axum::routing::post(create_household_handler::<D, F>),
        )
        .route(
            "/api/households/current",
            get(current_household_handler::<D, F>),
        )
        .route(
            "/api/cars",
            get(list_cars_handler::<D, F>).post(create_car_handler::<D, F>),
        )
        .route(
            "/api/cars/:car_id",
            get(get_car_handler::<D, F>).patch(update_car_handler::<D, F>),
        )
        .route(
            "/api/cars/:car_id/archive",
            axum::routing::post(archive_car_handler::<D, F>),
        )
        .route(
            "/api/cars/:car_id/unarchive",
            axum::routing::post(unarchive_car_handler::<D, F>),
        )
        .route(
            "/api/cars/:car_id/renewals",
            get(list_renewals_handler::<D, F>).post(create_renewal_handler::<D, F>),
        )
        .route("/api/renewals/upcoming", get(upcoming_handler::<D, F>))
        .route(
            "/api/renewals/:renewal_id",
            axum::routing::patch(update_renewal_handler::<D, F>)
                .delete(delete_renewal_handler::<D, F>),
        )
        .route(
            "/api/settings/reminders",
            get(get_reminders_handler::<D, F>).put(put_reminders_handler::<D, F>),
        )
        .with_state(context)
}

/// Handler-level error delegating to the service errors' response mapping.
#[derive(Debug)]
pub(crate) enum ApiError {
    Account(AccountServiceError),
    Fleet(FleetServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Account(err) => err.into_response(),
            ApiError::Fleet(err) => err.into_response(),
        }
    }
}

impl From<AccountServiceError> for ApiError {
    fn from(value: AccountServiceError) -> Self {
        Self::Account(value)
    }
}

impl From<FleetServiceError> for ApiError {
    fn from(value: FleetServiceError) -> Self {
        Self::Fleet(value)
    }
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AccountServiceError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AccountServiceError::InvalidToken)
}

fn current_user<D, F>(
    context: &ApiContext<D, F>,
    headers: &HeaderMap,
) -> Result<User, AccountServiceError>
where
    D: DirectoryRepository,
    F: FleetRepository,
{
    context.accounts.authenticate(bearer_token(headers)?)
}

fn current_household<D, F>(
    context: &ApiContext<D, F>,
    headers: &HeaderMap,
) -> Result<Household, AccountServiceError>
where
    D: DirectoryRepository,
    F: FleetRepository,
{
    let user = current_user(context, headers)?;
    context.accounts.current_household(&user)
}

/// A malformed UUID in the path reads as an unknown resource, never a
/// parse error.
fn parse_car_id(raw: &str) -> Result<CarId, FleetServiceError> {
    Uuid::parse_str(raw)
        .map(CarId)
        .map_err(|_| FleetServiceError::CarNotFound)
}

fn parse_renewal_id(raw: &str) -> Result<RenewalId, FleetServiceError> {
    Uuid::parse_str(raw)
        .map(RenewalId)
        .map_err(|_| FleetServiceError::RenewalNotFound)
}

pub(crate) async fn signup_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    Json(request): Json<SignupRequest>,
) -> Result<Response, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let user = context.accounts.signup(request)?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub(crate) async fn login_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let token = context.accounts.login(request)?;
    Ok(Json(token).into_response())
}

pub(crate) async fn create_household_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Json(draft): Json<HouseholdDraft>,
) -> Result<Response, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let user = current_user(&context, &headers)?;
    let household = context.accounts.create_household(&user, draft)?;
    Ok((StatusCode::CREATED, Json(household)).into_response())
}

pub(crate) async fn current_household_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    Ok(Json(household).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CarListQuery {
    #[serde(default)]
    include_archived: bool,
}

pub(crate) async fn list_cars_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Query(query): Query<CarListQuery>,
) -> Result<Json<Vec<Car>>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let cars = context
        .fleet
        .list_cars(household.id, query.include_archived)?;
    Ok(Json(cars))
}

pub(crate) async fn create_car_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Json(draft): Json<CarDraft>,
) -> Result<Response, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let car = context.fleet.register_car(household.id, draft)?;
    Ok((StatusCode::CREATED, Json(car)).into_response())
}

pub(crate) async fn get_car_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Path(car_id): Path<String>,
) -> Result<Json<Car>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let car = context.fleet.get_car(household.id, parse_car_id(&car_id)?)?;
    Ok(Json(car))
}

pub(crate) async fn update_car_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Path(car_id): Path<String>,
    Json(patch): Json<CarPatch>,
) -> Result<Json<Car>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let car = context
        .fleet
        .update_car(household.id, parse_car_id(&car_id)?, patch)?;
    Ok(Json(car))
}

pub(crate) async fn archive_car_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Path(car_id): Path<String>,
) -> Result<Json<Car>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let car = context
        .fleet
        .set_archived(household.id, parse_car_id(&car_id)?, true)?;
    Ok(Json(car))
}

pub(crate) async fn unarchive_car_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Path(car_id): Path<String>,
) -> Result<Json<Car>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let car = context
        .fleet
        .set_archived(household.id, parse_car_id(&car_id)?, false)?;
    Ok(Json(car))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RenewalListQuery {
    #[serde(default)]
    kind: Option<RenewalKind>,
}

pub(crate) async fn list_renewals_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Path(car_id): Path<String>,
    Query(query): Query<RenewalListQuery>,
) -> Result<Json<Vec<RenewalRecord>>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let records =
        context
            .fleet
            .list_renewals(household.id, parse_car_id(&car_id)?, query.kind)?;
    Ok(Json(records))
}

pub(crate) async fn create_renewal_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Path(car_id): Path<String>,
    Json(draft): Json<RenewalDraft>,
) -> Result<Response, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let record = context
        .fleet
        .record_renewal(household.id, parse_car_id(&car_id)?, draft)?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

pub(crate) async fn update_renewal_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Path(renewal_id): Path<String>,
    Json(patch): Json<RenewalPatch>,
) -> Result<Json<RenewalRecord>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let record =
        context
            .fleet
            .amend_renewal(household.id, parse_renewal_id(&renewal_id)?, patch)?;
    Ok(Json(record))
}

pub(crate) async fn delete_renewal_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Path(renewal_id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    context
        .fleet
        .remove_renewal(household.id, parse_renewal_id(&renewal_id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpcomingQuery {
    #[serde(default)]
    days: Option<i64>,
}

pub(crate) async fn upcoming_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<UpcomingRenewal>>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let household = current_household(&context, &headers)?;
    let today = Local::now().date_naive();
    let report = context.fleet.upcoming(
        household.id,
        today,
        query.days.unwrap_or(DEFAULT_LOOKAHEAD_DAYS),
    )?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReminderPreferencesPayload {
    preferences: ReminderPreferences,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReminderPreferencesView {
    preferences: ReminderPreferences,
}

pub(crate) async fn get_reminders_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
) -> Result<Json<ReminderPreferencesView>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let user = current_user(&context, &headers)?;
    let preferences = context.accounts.reminder_preferences(&user)?;
    Ok(Json(ReminderPreferencesView { preferences }))
}

pub(crate) async fn put_reminders_handler<D, F>(
    State(context): State<Arc<ApiContext<D, F>>>,
    headers: HeaderMap,
    Json(payload): Json<ReminderPreferencesPayload>,
) -> Result<Json<ReminderPreferencesView>, ApiError>
where
    D: DirectoryRepository + 'static,
    F: FleetRepository + 'static,
{
    let user = current_user(&context, &headers)?;
    let preferences = context
        .accounts
        .save_reminder_preferences(&user, payload.preferences)?;
    Ok(Json(ReminderPreferencesView { preferences }))
}
