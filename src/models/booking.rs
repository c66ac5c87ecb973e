use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Money, SeatId, SeatType, Showtime};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    EWallet,
    BankTransfer,
    Cash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::EWallet => "e_wallet",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cash => "cash",
        };
        f.write_str(name)
    }
}

/// Выбранные места одного типа с ценой за штуку.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketLine {
    pub ticket_type: SeatType,
    pub quantity: u32,
    pub unit_price: Money,
}

impl TicketLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price * Money::from(self.quantity)
    }
}

/// Запрос на бронь. Собирается на каждую попытку отправки и после отправки
/// не меняется.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub showtime_id: i64,
    pub movie_id: i64,
    pub seat_ids: Vec<SeatId>,
    pub tickets: Vec<TicketLine>,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(alias = "_id")]
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_amount: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRef {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking: Booking,
    #[serde(default)]
    pub payment: Option<PaymentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletion {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub showtime: Option<Showtime>,
}

/// То, что показывает экран успешной брони.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking: Booking,
    pub payment: Option<PaymentRef>,
    pub payment_completed: bool,
    pub draft: BookingDraft,
}
