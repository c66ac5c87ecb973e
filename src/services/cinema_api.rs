//! Доступ к данным для сценария оформления.
//!
//! `CinemaApi` - контракт, под который написан сценарий. `HttpCinemaApi`
//! реализует его поверх REST API кинотеатра через reqwest. Каждый запрос идёт
//! через [`CircuitBreaker`], чтобы упавший бэкенд отказывал сразу.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::{CinemaApiConfig, CircuitBreakerConfig};
use crate::error::{ApiError, ErrorBody};
use crate::models::{
    BookingDraft, CreateBookingResponse, Movie, PaymentCompletion, Room, Seat, Showtime,
    TicketPrice,
};
use crate::services::circuit_breaker::{CircuitBreaker, CircuitState};

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait CinemaApi: Send + Sync {
    async fn get_showtime(&self, showtime_id: i64) -> ApiResult<Showtime>;

    async fn get_movie(&self, movie_id: i64) -> ApiResult<Movie>;

    async fn get_room(&self, room_id: i64) -> ApiResult<Room>;

    async fn get_seats_for_showtime(&self, showtime_id: i64) -> ApiResult<Vec<Seat>>;

    async fn get_seats_by_room(&self, room_id: i64) -> ApiResult<Vec<Seat>>;

    async fn get_ticket_prices(&self) -> ApiResult<Vec<TicketPrice>>;

    async fn create_booking(&self, draft: &BookingDraft) -> ApiResult<CreateBookingResponse>;

    async fn complete_payment(&self, payment_id: &str) -> ApiResult<PaymentCompletion>;
}

// --- Конверты ответов API ---

#[derive(Deserialize)]
struct ShowtimeEnvelope {
    showtime: Showtime,
}

#[derive(Deserialize)]
struct MovieEnvelope {
    movie: Movie,
}

#[derive(Deserialize)]
struct RoomEnvelope {
    room: Room,
}

#[derive(Deserialize)]
struct SeatsEnvelope {
    #[serde(default)]
    seats: Vec<Seat>,
}

#[derive(Deserialize)]
struct TicketsEnvelope {
    #[serde(default)]
    tickets: Vec<TicketPrice>,
}

/// Клиент REST API кинотеатра.
#[derive(Clone)]
pub struct HttpCinemaApi {
    base_url: String,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl HttpCinemaApi {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        circuit_breaker: CircuitBreaker,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            circuit_breaker: Arc::new(circuit_breaker),
        })
    }

    pub fn from_config(
        api: &CinemaApiConfig,
        breaker: &CircuitBreakerConfig,
    ) -> Result<Self, ApiError> {
        Self::new(
            api.base_url.clone(),
            Duration::from_secs(api.timeout_seconds),
            CircuitBreaker::from_config(breaker),
        )
    }

    /// Текущее состояние выключателя и число сбоев подряд.
    pub fn circuit_breaker_status(&self) -> (CircuitState, u32) {
        (self.circuit_breaker.state(), self.circuit_breaker.failure_count())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Отправляет запрос через выключатель и разбирает тело ответа.
    ///
    /// Сбоем считаются только ошибки транспорта и ответы 5xx. Ответ 4xx -
    /// штатная работа бэкенда.
    async fn execute<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ApiResult<T> {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking cinema API request");
            return Err(ApiError::CircuitOpen);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Cinema API request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                return Err(ApiError::Transport(e));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                self.circuit_breaker.record_failure();
                return Err(ApiError::Transport(e));
            }
        };

        if status.is_server_error() {
            self.circuit_breaker.record_failure();
        } else {
            self.circuit_breaker.record_success();
        }

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_message);
            debug!("Cinema API answered {} ({:?})", status, message);
            return Err(ApiError::Status { status, message });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl CinemaApi for HttpCinemaApi {
    async fn get_showtime(&self, showtime_id: i64) -> ApiResult<Showtime> {
        let request = self.http_client.get(self.url(&format!("/showtimes/{showtime_id}")));
        let envelope: ShowtimeEnvelope = self.execute(request).await?;
        Ok(envelope.showtime)
    }

    async fn get_movie(&self, movie_id: i64) -> ApiResult<Movie> {
        let request = self.http_client.get(self.url(&format!("/movies/{movie_id}")));
        let envelope: MovieEnvelope = self.execute(request).await?;
        Ok(envelope.movie)
    }

    async fn get_room(&self, room_id: i64) -> ApiResult<Room> {
        let request = self.http_client.get(self.url(&format!("/rooms/{room_id}")));
        let envelope: RoomEnvelope = self.execute(request).await?;
        Ok(envelope.room)
    }

    async fn get_seats_for_showtime(&self, showtime_id: i64) -> ApiResult<Vec<Seat>> {
        let request = self.http_client.get(self.url(&format!("/seats/showtime/{showtime_id}")));
        let envelope: SeatsEnvelope = self.execute(request).await?;
        Ok(envelope.seats)
    }

    async fn get_seats_by_room(&self, room_id: i64) -> ApiResult<Vec<Seat>> {
        let request = self.http_client.get(self.url(&format!("/seats/room/{room_id}")));
        let envelope: SeatsEnvelope = self.execute(request).await?;
        Ok(envelope.seats)
    }

    async fn get_ticket_prices(&self) -> ApiResult<Vec<TicketPrice>> {
        let request = self.http_client.get(self.url("/tickets"));
        let envelope: TicketsEnvelope = self.execute(request).await?;
        Ok(envelope.tickets)
    }

    async fn create_booking(&self, draft: &BookingDraft) -> ApiResult<CreateBookingResponse> {
        let request = self.http_client.post(self.url("/bookings")).json(draft);
        self.execute(request).await
    }

    async fn complete_payment(&self, payment_id: &str) -> ApiResult<PaymentCompletion> {
        let request = self
            .http_client
            .post(self.url(&format!("/payments/{payment_id}/complete")));
        self.execute(request).await
    }
}
