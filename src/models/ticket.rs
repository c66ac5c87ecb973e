use serde::{Deserialize, Serialize};

use super::SeatType;

/// Сумма во вьетнамских донгах. Копеек у валюты нет.
pub type Money = i64;

/// Строка прайс-листа билетов от бэкенда.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPrice {
    #[serde(rename = "type")]
    pub ticket_type: SeatType,
    pub price: Money,
}
