use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SeatId;

/// Сеанс: показ фильма в зале по расписанию.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    #[serde(alias = "_id")]
    pub id: i64,
    pub movie_id: i64,
    pub room_id: i64,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub booked_seats: Vec<BookedSeatRef>,
}

/// Элемент списка занятых мест сеанса. Бэкенд присылает либо голый id места,
/// либо вложенный объект места.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookedSeatRef {
    Id(SeatId),
    Embedded {
        #[serde(alias = "_id")]
        id: SeatId,
    },
}

impl BookedSeatRef {
    pub fn seat_id(&self) -> SeatId {
        match self {
            BookedSeatRef::Id(id) | BookedSeatRef::Embedded { id } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booked_list_accepts_ids_and_objects() {
        let showtime: Showtime = serde_json::from_str(
            r#"{
                "id": 5,
                "movieId": 9,
                "roomId": 3,
                "startTime": "2026-10-18T19:30:00Z",
                "bookedSeats": [4, {"_id": 6, "row": "A", "column": 6}, {"id": 8}]
            }"#,
        )
        .unwrap();

        let ids: Vec<SeatId> = showtime.booked_seats.iter().map(BookedSeatRef::seat_id).collect();
        assert_eq!(ids, vec![4, 6, 8]);
        assert!(showtime.start_time.is_some());
    }

    #[test]
    fn booked_list_is_optional() {
        let showtime: Showtime =
            serde_json::from_str(r#"{"id": 5, "movieId": 9, "roomId": 3}"#).unwrap();
        assert!(showtime.booked_seats.is_empty());
        assert!(showtime.start_time.is_none());
    }
}
