use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::models::{BookedSeatRef, Seat, SeatId, SeatStatus, Showtime};

/// Статус, с которым место показывается на схеме.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Selected,
    Sold,
    Booked,
}

/// Id мест, которые сеанс считает занятыми.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookedSeats(HashSet<SeatId>);

impl BookedSeats {
    pub fn from_refs(refs: &[BookedSeatRef]) -> Self {
        Self(refs.iter().map(BookedSeatRef::seat_id).collect())
    }

    pub fn from_showtime(showtime: Option<&Showtime>) -> Self {
        showtime
            .map(|s| Self::from_refs(&s.booked_seats))
            .unwrap_or_default()
    }

    pub fn contains(&self, seat_id: SeatId) -> bool {
        self.0.contains(&seat_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Место продано или занято и в выбор не попадает.
    Unavailable,
    /// Места нет, либо на этом шаге выбор менять нельзя.
    Ignored,
}

/// Выбранные пользователем места, уникальные по id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeatSelection {
    seats: BTreeMap<SeatId, Seat>,
}

impl SeatSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Переключает `seat`. Проданные и занятые места можно только убрать.
    pub fn toggle(&mut self, seat: &Seat, booked: &BookedSeats) -> ToggleOutcome {
        if self.seats.remove(&seat.id).is_some() {
            return ToggleOutcome::Deselected;
        }
        if seat.status.is_taken() || booked.contains(seat.id) {
            return ToggleOutcome::Unavailable;
        }
        self.seats.insert(seat.id, seat.clone());
        ToggleOutcome::Selected
    }

    pub fn contains(&self, seat_id: SeatId) -> bool {
        self.seats.contains_key(&seat_id)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    /// Выбранные места в порядке показа: по ряду, затем по колонке.
    pub fn sorted(&self) -> Vec<&Seat> {
        let mut seats: Vec<&Seat> = self.seats.values().collect();
        seats.sort_by(|a, b| a.row.cmp(&b.row).then(a.column.cmp(&b.column)));
        seats
    }
}

/// Статус для показа: сначала выбор, затем статус бэкенда, затем список
/// занятых мест сеанса.
pub fn resolve_status(seat: &Seat, selection: &SeatSelection, booked: &BookedSeats) -> SeatState {
    if selection.contains(seat.id) {
        return SeatState::Selected;
    }
    match seat.status {
        SeatStatus::Sold => SeatState::Sold,
        SeatStatus::Booked => SeatState::Booked,
        SeatStatus::Available if booked.contains(seat.id) => SeatState::Booked,
        SeatStatus::Available => SeatState::Available,
    }
}
