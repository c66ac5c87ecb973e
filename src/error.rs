use reqwest::StatusCode;
use serde::Deserialize;

/// Ошибка вызова REST API кинотеатра.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("cinema API answered {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("cinema API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cinema API returned an unexpected body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("circuit breaker is open - cinema API temporarily unavailable")]
    CircuitOpen,
}

impl ApiError {
    /// Сообщение сервера из тела ошибки, если оно есть.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }

    /// Сообщение сервера, а без него текст по умолчанию для места вызова.
    pub fn user_message(&self, default: &str) -> String {
        self.server_message().unwrap_or(default).to_string()
    }
}

/// Формат тела ошибки API кинотеатра.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

pub const SHOWTIME_FETCH_FAILED: &str = "Could not load the showtime. Please try again later.";
pub const MOVIE_FETCH_FAILED: &str = "Could not load the movie details. Please try again later.";
pub const ROOM_FETCH_FAILED: &str = "Could not load the screening room. Please try again later.";
pub const SEATS_FETCH_FAILED: &str = "Could not load the seat map. Please try again later.";
pub const BOOKING_FAILED: &str = "Booking failed. Please try again.";
pub const PAYMENT_CONFIRMATION_FAILED: &str = "Payment confirmation failed.";

/// Всё, что сценарий оформления может показать пользователю.
///
/// `Display` - текст на оверлее ошибки.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Please log in to book tickets.")]
    NotAuthenticated,
    #[error("{}", .0.user_message(SHOWTIME_FETCH_FAILED))]
    ShowtimeFetch(#[source] ApiError),
    #[error("{}", .0.user_message(MOVIE_FETCH_FAILED))]
    MovieFetch(#[source] ApiError),
    #[error("{}", .0.user_message(ROOM_FETCH_FAILED))]
    RoomFetch(#[source] ApiError),
    #[error("{}", .0.user_message(SEATS_FETCH_FAILED))]
    SeatsFetch(#[source] ApiError),
    #[error("Please select at least one seat.")]
    NoSeatsSelected,
    #[error("{}", .0.user_message(BOOKING_FAILED))]
    BookingFailed(#[source] ApiError),
    #[error("{}", .0.user_message(PAYMENT_CONFIRMATION_FAILED))]
    PaymentConfirmationFailed(#[source] ApiError),
    #[error("Checkout data is not loaded yet.")]
    NotReady,
    #[error("The checkout was closed.")]
    Cancelled,
}

impl CheckoutError {
    /// Фатальные ошибки останавливают сценарий и предлагают уйти назад.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CheckoutError::NotAuthenticated
                | CheckoutError::ShowtimeFetch(_)
                | CheckoutError::MovieFetch(_)
                | CheckoutError::RoomFetch(_)
                | CheckoutError::SeatsFetch(_)
                | CheckoutError::BookingFailed(_)
        )
    }
}
