use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    checkout::{
        selection::{SeatState, ToggleOutcome},
        session::{RecordingNavigator, Route},
        CheckoutFlow, CheckoutSettings, FlowError, Step,
    },
    error::CheckoutError,
    middleware::ClientSession,
    models::{
        BookingConfirmation, Money, Movie, PaymentMethod, Room, SeatId, SeatType, Showtime,
        TicketLine,
    },
    services::registry::CheckoutEntry,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checkouts", post(open_checkout))
        .route("/checkouts/{id}", get(get_checkout).delete(close_checkout))
        .route("/checkouts/{id}/seats", patch(toggle_seat))
        .route("/checkouts/{id}/payment-method", patch(select_payment_method))
        .route("/checkouts/{id}/next", post(next_step))
        .route("/checkouts/{id}/back", post(previous_step))
        .route("/checkouts/{id}/navigate", post(navigate))
}

/* ---------- views ---------- */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatCellView {
    pub id: SeatId,
    pub label: String,
    pub seat_type: SeatType,
    pub status: SeatState,
    pub price: Money,
}

#[derive(Debug, Serialize)]
pub struct SeatRowView {
    pub row: String,
    pub cells: Vec<Option<SeatCellView>>,
}

#[derive(Debug, Serialize)]
pub struct SeatMapView {
    pub columns: Vec<u32>,
    pub rows: Vec<SeatRowView>,
}

#[derive(Debug, Serialize)]
pub struct RedirectView {
    pub route: Route,
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    /// Нет у сценария, который не попал в реестр.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub showtime_id: i64,
    pub step: Step,
    pub step_index: u8,
    pub loading: bool,
    pub error: Option<FlowError>,
    pub showtime: Option<Showtime>,
    pub movie: Option<Movie>,
    pub room: Option<Room>,
    pub seat_map: SeatMapView,
    pub selected_seats: Vec<String>,
    pub tickets: Vec<TicketLine>,
    pub total: Money,
    pub total_display: String,
    pub payment_method: PaymentMethod,
    pub confirmation: Option<BookingConfirmation>,
    pub redirect: Option<RedirectView>,
}

impl CheckoutView {
    fn render(
        id: impl Into<Option<Uuid>>,
        flow: &CheckoutFlow,
        navigator: &RecordingNavigator,
    ) -> Self {
        let map = flow.seat_map();
        let rows = map
            .grid()
            .map(|(row, cells)| SeatRowView {
                row: row.to_string(),
                cells: cells
                    .into_iter()
                    .map(|cell| {
                        cell.map(|seat| SeatCellView {
                            id: seat.id,
                            label: seat.label(),
                            price: flow.prices().price_for(&seat.kind()),
                            seat_type: seat.kind(),
                            status: flow.seat_status(seat),
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            id: id.into(),
            showtime_id: flow.showtime_id(),
            step: flow.step(),
            step_index: flow.step().index(),
            loading: flow.is_loading(),
            error: flow.error().cloned(),
            showtime: flow.showtime().cloned(),
            movie: flow.movie().cloned(),
            room: flow.room().cloned(),
            seat_map: SeatMapView {
                columns: map.columns().to_vec(),
                rows,
            },
            selected_seats: flow.selected_seats().iter().map(|s| s.label()).collect(),
            tickets: flow.ticket_lines(),
            total: flow.total(),
            total_display: flow.total_display(),
            payment_method: flow.payment_method(),
            confirmation: flow.confirmation().cloned(),
            redirect: navigator.last().map(RedirectView::from),
        }
    }
}

impl From<Route> for RedirectView {
    fn from(route: Route) -> Self {
        Self {
            path: route.path(),
            route,
        }
    }
}

/* ---------- errors ---------- */

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkout: Option<CheckoutView>,
}

type HandlerResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

fn to_error(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { success: false, message: message.to_string(), checkout: None }))
}

fn status_for(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        CheckoutError::NoSeatsSelected => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::NotReady | CheckoutError::Cancelled => StatusCode::CONFLICT,
        CheckoutError::ShowtimeFetch(_)
        | CheckoutError::MovieFetch(_)
        | CheckoutError::RoomFetch(_)
        | CheckoutError::SeatsFetch(_)
        | CheckoutError::BookingFailed(_)
        | CheckoutError::PaymentConfirmationFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn checkout_error(err: CheckoutError, view: CheckoutView) -> (StatusCode, Json<ErrorResponse>) {
    (
        status_for(&err),
        Json(ErrorResponse { success: false, message: err.to_string(), checkout: Some(view) }),
    )
}

fn validation_error(errors: validator::ValidationErrors) -> (StatusCode, Json<ErrorResponse>) {
    tracing::debug!("Rejected request: {}", errors);
    to_error(StatusCode::BAD_REQUEST, &errors.to_string())
}

async fn find(state: &AppState, id: Uuid) -> HandlerResult<Arc<CheckoutEntry>> {
    state
        .checkouts
        .get(id)
        .await
        .ok_or_else(|| to_error(StatusCode::NOT_FOUND, "Checkout not found"))
}

/* ---------- handlers ---------- */

// POST /api/checkouts
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenCheckoutRequest {
    #[validate(range(min = 1, message = "showtimeId must be > 0"))]
    pub showtime_id: i64,
}

async fn open_checkout(
    State(state): State<Arc<AppState>>,
    ClientSession(session): ClientSession,
    Json(req): Json<OpenCheckoutRequest>,
) -> HandlerResult<impl IntoResponse> {
    req.validate().map_err(validation_error)?;

    let navigator = Arc::new(RecordingNavigator::new());
    let flow = CheckoutFlow::open(
        req.showtime_id,
        session,
        Arc::clone(&state.api),
        navigator.clone(),
        CheckoutSettings::from(&state.config.checkout),
    )
    .await;

    // Анонимный сценарий в реестр не попадает: клиент сам уходит на экран входа
    if flow.session().user_id().is_none() {
        let mut view = CheckoutView::render(None, &flow, &navigator);
        view.redirect = Some(Route::login_for_showtime(req.showtime_id).into());
        return Err(checkout_error(CheckoutError::NotAuthenticated, view));
    }

    let (id, entry) = state.checkouts.insert(flow, navigator).await.map_err(|e| {
        tracing::error!("open_checkout rejected: {}", e);
        to_error(StatusCode::SERVICE_UNAVAILABLE, "Too many open checkouts, try again later")
    })?;

    let flow = entry.flow.lock().await;
    Ok((StatusCode::CREATED, Json(CheckoutView::render(id, &flow, &entry.navigator))))
}

// GET /api/checkouts/{id}
async fn get_checkout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<impl IntoResponse> {
    let entry = find(&state, id).await?;
    let flow = entry.flow.lock().await;
    Ok(Json(CheckoutView::render(id, &flow, &entry.navigator)))
}

// PATCH /api/checkouts/{id}/seats
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ToggleSeatRequest {
    #[validate(range(min = 1, message = "seatId must be > 0"))]
    pub seat_id: SeatId,
}

#[derive(Debug, Serialize)]
struct ToggleResponse {
    outcome: ToggleOutcome,
    checkout: CheckoutView,
}

async fn toggle_seat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleSeatRequest>,
) -> HandlerResult<impl IntoResponse> {
    req.validate().map_err(validation_error)?;

    let entry = find(&state, id).await?;
    let mut flow = entry.flow.lock().await;
    let outcome = flow.toggle_seat(req.seat_id);
    Ok(Json(ToggleResponse {
        outcome,
        checkout: CheckoutView::render(id, &flow, &entry.navigator),
    }))
}

// PATCH /api/checkouts/{id}/payment-method
#[derive(Debug, Deserialize)]
pub struct PaymentMethodRequest {
    pub method: PaymentMethod,
}

async fn select_payment_method(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PaymentMethodRequest>,
) -> HandlerResult<impl IntoResponse> {
    let entry = find(&state, id).await?;
    let mut flow = entry.flow.lock().await;
    flow.select_payment_method(req.method);
    Ok(Json(CheckoutView::render(id, &flow, &entry.navigator)))
}

// POST /api/checkouts/{id}/next
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStepRequest {
    /// Шаг, который видит клиент. Повторный запрос с устаревшим шагом отклоняется.
    pub expected_step: Option<Step>,
}

async fn next_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<Json<NextStepRequest>>,
) -> HandlerResult<impl IntoResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let entry = find(&state, id).await?;
    let mut flow = entry.flow.lock().await;

    if let Some(expected) = req.expected_step.filter(|step| *step != flow.step()) {
        tracing::debug!(
            "Checkout {} is at {:?}, client expected {:?}",
            id,
            flow.step(),
            expected
        );
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                success: false,
                message: "Checkout has moved on, refresh and try again".to_string(),
                checkout: Some(CheckoutView::render(id, &flow, &entry.navigator)),
            }),
        ));
    }

    match flow.next().await {
        Ok(_) => Ok(Json(CheckoutView::render(id, &flow, &entry.navigator))),
        Err(e) => Err(checkout_error(e, CheckoutView::render(id, &flow, &entry.navigator))),
    }
}

// POST /api/checkouts/{id}/back
async fn previous_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<impl IntoResponse> {
    let entry = find(&state, id).await?;
    let mut flow = entry.flow.lock().await;
    flow.back();
    Ok(Json(CheckoutView::render(id, &flow, &entry.navigator)))
}

// POST /api/checkouts/{id}/navigate
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigateTarget {
    Home,
    Profile,
    Retreat,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub target: NavigateTarget,
}

async fn navigate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> HandlerResult<impl IntoResponse> {
    let entry = find(&state, id).await?;
    let flow = entry.flow.lock().await;
    match req.target {
        NavigateTarget::Home => flow.go_home(),
        NavigateTarget::Profile => flow.view_profile(),
        NavigateTarget::Retreat => flow.retreat(),
    }
    Ok(Json(CheckoutView::render(id, &flow, &entry.navigator)))
}

// DELETE /api/checkouts/{id}
async fn close_checkout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<impl IntoResponse> {
    if state.checkouts.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(to_error(StatusCode::NOT_FOUND, "Checkout not found"))
    }
}
