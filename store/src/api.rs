use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use orders::{
    error::OrderError,
    model::{Actor, ActorRole, ModelId, NewAddress, NewOrder, StaffOrderUpdate, UserOrderUpdate},
    payment::Refund,
    service::OrderService,
};
use orders::model::Order;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
}

impl AppState {
    pub fn new(service: Arc<OrderService>) -> Self {
        Self { service }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/orders", post(place_order).get(list_orders))
        .route("/api/v1/orders/{id}", get(get_order).put(update_own_order))
        .route(
            "/api/v1/admin/orders/{id}",
            put(staff_update_order).delete(delete_order),
        )
        .route("/api/v1/admin/orders/{id}/refund", post(refund_order))
        .route("/api/v1/addresses", post(create_address).get(list_addresses))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub fn initialize_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Error body shape shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError(OrderError);

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Identity is established upstream; the gateway forwards it in headers.
fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let user_id: ModelId = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| {
            ApiError(OrderError::Authorization(
                "Missing or invalid x-user-id header".to_string(),
            ))
        })?;

    let role = match headers.get("x-user-role").and_then(|v| v.to_str().ok()) {
        Some("staff") => ActorRole::Staff,
        Some("customer") | None => ActorRole::Customer,
        Some(other) => {
            return Err(ApiError(OrderError::Authorization(format!(
                "Unknown role: {other}"
            ))))
        }
    };

    Ok(Actor { user_id, role })
}

async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewOrder>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let started = Instant::now();
    let order = state.service.place_order(&actor, body).await?;
    metrics::histogram!("order_placement_duration_seconds")
        .record(started.elapsed().as_secs_f64());
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let orders = state.service.list_orders(&actor).await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<ModelId>,
) -> Result<Json<Order>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state.service.get_order(&actor, id).await?;
    Ok(Json(order))
}

async fn update_own_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<ModelId>,
    Json(body): Json<UserOrderUpdate>,
) -> Result<Json<Order>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state.service.update_own_order(&actor, id, body).await?;
    Ok(Json(order))
}

async fn staff_update_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<ModelId>,
    Json(body): Json<StaffOrderUpdate>,
) -> Result<Json<Order>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state.service.staff_update_order(&actor, id, body).await?;
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<ModelId>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state.service.delete_order(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefundResponse {
    pub order: Order,
    pub refund: Refund,
}

async fn refund_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<ModelId>,
    Json(body): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let reason = body.reason;
    let (order, refund) = state.service.refund_order(&actor, id, reason).await?;
    Ok(Json(RefundResponse { order, refund }))
}

async fn create_address(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewAddress>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let address = state.service.create_address(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

async fn list_addresses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let addresses = state.service.list_addresses(&actor).await?;
    Ok(Json(addresses))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
