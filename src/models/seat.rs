use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор места.
///
/// REST API кинотеатра нумерует все сущности целыми числами: места, сеансы,
/// фильмы, залы и брони. Старые ответы кладут тот же номер под ключ `_id`,
/// поэтому у моделей есть алиас `_id`, но строковые id документной базы не
/// принимаются: такой ответ не разбирается и уходит в ошибку декодирования.
pub type SeatId = i64;

/// Ценовая категория места.
///
/// Новые типы от бэкенда сохраняются как есть в `Other`, цена для них
/// берётся по умолчанию.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SeatType {
    #[default]
    Standard,
    Vip,
    Couple,
    Other(String),
}

impl SeatType {
    pub fn as_str(&self) -> &str {
        match self {
            SeatType::Standard => "standard",
            SeatType::Vip => "vip",
            SeatType::Couple => "couple",
            SeatType::Other(name) => name,
        }
    }
}

impl From<String> for SeatType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => SeatType::Standard,
            "vip" => SeatType::Vip,
            "couple" => SeatType::Couple,
            _ => SeatType::Other(value),
        }
    }
}

impl From<&str> for SeatType {
    fn from(value: &str) -> Self {
        SeatType::from(value.to_string())
    }
}

impl From<SeatType> for String {
    fn from(value: SeatType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Доступность места по данным бэкенда. Выбор пользователя здесь не хранится.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SeatStatus {
    #[default]
    Available,
    Sold,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "available",
            SeatStatus::Sold => "sold",
            SeatStatus::Booked => "booked",
        }
    }

    /// Проданные и забронированные места не продаются.
    pub fn is_taken(&self) -> bool {
        matches!(self, SeatStatus::Sold | SeatStatus::Booked)
    }
}

impl From<String> for SeatStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "sold" => SeatStatus::Sold,
            "booked" => SeatStatus::Booked,
            _ => SeatStatus::Available,
        }
    }
}

impl From<SeatStatus> for String {
    fn from(value: SeatStatus) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    #[serde(alias = "_id")]
    pub id: SeatId,
    pub row: String,
    #[serde(alias = "number", alias = "col")]
    pub column: u32,
    #[serde(rename = "type", default)]
    pub seat_type: Option<SeatType>,
    #[serde(default)]
    pub status: SeatStatus,
}

impl Seat {
    pub fn new(id: SeatId, row: impl Into<String>, column: u32) -> Self {
        Self {
            id,
            row: row.into(),
            column,
            seat_type: None,
            status: SeatStatus::Available,
        }
    }

    pub fn with_type(mut self, seat_type: SeatType) -> Self {
        self.seat_type = Some(seat_type);
        self
    }

    pub fn with_status(mut self, status: SeatStatus) -> Self {
        self.status = status;
        self
    }

    /// Тип места; если не указан, считается стандартным.
    pub fn kind(&self) -> SeatType {
        self.seat_type.clone().unwrap_or_default()
    }

    /// Подпись для людей, например `A7`.
    pub fn label(&self) -> String {
        format!("{}{}", self.row, self.column)
    }
}
