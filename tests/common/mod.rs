#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinema_checkout::checkout::session::{RecordingNavigator, SessionContext};
use cinema_checkout::checkout::{CheckoutFlow, CheckoutSettings};
use cinema_checkout::config::{
    AppConfig, CheckoutConfig, CinemaApiConfig, CircuitBreakerConfig, Config,
};
use cinema_checkout::error::ApiError;
use cinema_checkout::models::{
    BookedSeatRef, Booking, BookingDraft, CreateBookingResponse, Movie, PaymentCompletion,
    PaymentRef, Room, Seat, SeatStatus, SeatType, Showtime, TicketPrice,
};
use cinema_checkout::services::cinema_api::{ApiResult, CinemaApi};

pub const SHOWTIME_ID: i64 = 5;
pub const MOVIE_ID: i64 = 9;
pub const ROOM_ID: i64 = 3;
pub const USER_ID: &str = "user-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Showtime,
    Movie,
    Room,
    SeatsForShowtime,
    SeatsByRoom,
    TicketPrices,
    CreateBooking,
    CompletePayment,
}

/// Бэкенд кинотеатра в памяти с включаемыми сбоями.
pub struct FakeCinemaApi {
    pub showtime: Mutex<Showtime>,
    pub seats: Mutex<Vec<Seat>>,
    pub tickets: Mutex<Vec<TicketPrice>>,
    pub booking: Mutex<CreateBookingResponse>,
    pub completion: Mutex<PaymentCompletion>,
    failing: Mutex<HashSet<Call>>,
    hanging: Mutex<HashSet<Call>>,
    failure_message: Mutex<Option<String>>,
    calls: Mutex<Vec<Call>>,
    drafts: Mutex<Vec<BookingDraft>>,
}

impl FakeCinemaApi {
    /// Место 1: свободное стандартное A1, место 2: проданное VIP A2.
    /// Стандарт стоит 70 000, VIP 90 000.
    pub fn scenario() -> Self {
        Self {
            showtime: Mutex::new(Showtime {
                id: SHOWTIME_ID,
                movie_id: MOVIE_ID,
                room_id: ROOM_ID,
                start_time: None,
                booked_seats: Vec::new(),
            }),
            seats: Mutex::new(vec![
                Seat::new(1, "A", 1).with_type(SeatType::Standard),
                Seat::new(2, "A", 2).with_type(SeatType::Vip).with_status(SeatStatus::Sold),
            ]),
            tickets: Mutex::new(vec![
                TicketPrice { ticket_type: SeatType::Standard, price: 70_000 },
                TicketPrice { ticket_type: SeatType::Vip, price: 90_000 },
            ]),
            booking: Mutex::new(CreateBookingResponse {
                booking: Booking { id: 100, status: Some("pending".to_string()), total_amount: None },
                payment: Some(PaymentRef { id: "pay-100".to_string(), status: None }),
            }),
            completion: Mutex::new(PaymentCompletion { success: true, showtime: None }),
            failing: Mutex::new(HashSet::new()),
            hanging: Mutex::new(HashSet::new()),
            failure_message: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_seats(self, seats: Vec<Seat>) -> Self {
        *self.seats.lock().unwrap() = seats;
        self
    }

    pub fn with_booked(self, refs: Vec<BookedSeatRef>) -> Self {
        self.showtime.lock().unwrap().booked_seats = refs;
        self
    }

    pub fn without_payment(self) -> Self {
        self.booking.lock().unwrap().payment = None;
        self
    }

    pub fn fail(&self, call: Call) {
        self.failing.lock().unwrap().insert(call);
    }

    pub fn fail_with_message(&self, call: Call, message: &str) {
        *self.failure_message.lock().unwrap() = Some(message.to_string());
        self.fail(call);
    }

    /// Вызов никогда не отвечает.
    pub fn hang(&self, call: Call) {
        self.hanging.lock().unwrap().insert(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn drafts(&self) -> Vec<BookingDraft> {
        self.drafts.lock().unwrap().clone()
    }

    async fn enter(&self, call: Call) -> ApiResult<()> {
        self.calls.lock().unwrap().push(call);
        let hangs = self.hanging.lock().unwrap().contains(&call);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(&call) {
            return Err(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: self.failure_message.lock().unwrap().clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CinemaApi for FakeCinemaApi {
    async fn get_showtime(&self, showtime_id: i64) -> ApiResult<Showtime> {
        self.enter(Call::Showtime).await?;
        let showtime = self.showtime.lock().unwrap().clone();
        if showtime.id != showtime_id {
            return Err(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                message: Some("Showtime not found".to_string()),
            });
        }
        Ok(showtime)
    }

    async fn get_movie(&self, movie_id: i64) -> ApiResult<Movie> {
        self.enter(Call::Movie).await?;
        Ok(Movie {
            id: movie_id,
            title: "Mai".to_string(),
            duration: Some(131),
            genre: Some("drama".to_string()),
            poster_url: None,
        })
    }

    async fn get_room(&self, room_id: i64) -> ApiResult<Room> {
        self.enter(Call::Room).await?;
        Ok(Room { id: room_id, name: "Room 3".to_string(), cinema_id: Some(1), capacity: Some(2) })
    }

    async fn get_seats_for_showtime(&self, _showtime_id: i64) -> ApiResult<Vec<Seat>> {
        self.enter(Call::SeatsForShowtime).await?;
        Ok(self.seats.lock().unwrap().clone())
    }

    async fn get_seats_by_room(&self, _room_id: i64) -> ApiResult<Vec<Seat>> {
        self.enter(Call::SeatsByRoom).await?;
        Ok(self.seats.lock().unwrap().clone())
    }

    async fn get_ticket_prices(&self) -> ApiResult<Vec<TicketPrice>> {
        self.enter(Call::TicketPrices).await?;
        Ok(self.tickets.lock().unwrap().clone())
    }

    async fn create_booking(&self, draft: &BookingDraft) -> ApiResult<CreateBookingResponse> {
        self.drafts.lock().unwrap().push(draft.clone());
        self.enter(Call::CreateBooking).await?;

        // забронированные места теперь проданы
        for seat in self.seats.lock().unwrap().iter_mut() {
            if draft.seat_ids.contains(&seat.id) {
                seat.status = SeatStatus::Sold;
            }
        }
        Ok(self.booking.lock().unwrap().clone())
    }

    async fn complete_payment(&self, _payment_id: &str) -> ApiResult<PaymentCompletion> {
        self.enter(Call::CompletePayment).await?;
        Ok(self.completion.lock().unwrap().clone())
    }
}

pub fn settings() -> CheckoutSettings {
    CheckoutSettings { login_redirect_delay: Duration::from_secs(2) }
}

pub async fn open_flow(
    api: &Arc<FakeCinemaApi>,
    session: SessionContext,
) -> (CheckoutFlow, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::new());
    let flow = CheckoutFlow::open(
        SHOWTIME_ID,
        session,
        api.clone(),
        navigator.clone(),
        settings(),
    )
    .await;
    (flow, navigator)
}

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            rust_log: "cinema_checkout=debug".to_string(),
        },
        cinema_api: CinemaApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_seconds: 1,
        },
        circuit_breaker: CircuitBreakerConfig { failure_threshold: 5, timeout_seconds: 60 },
        checkout: CheckoutConfig {
            login_redirect_delay_ms: 2000,
            session_limit: 8,
            idle_ttl_seconds: 60,
        },
    }
}
