use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::models::{Money, Seat, SeatType, TicketLine, TicketPrice};

pub const STANDARD_PRICE: Money = 70_000;
pub const VIP_PRICE: Money = 90_000;
pub const COUPLE_PRICE: Money = 150_000;

/// Встроенные цены на случай, если бэкенд не знает тип места.
pub fn fallback_price(seat_type: &SeatType) -> Option<Money> {
    match seat_type {
        SeatType::Standard => Some(STANDARD_PRICE),
        SeatType::Vip => Some(VIP_PRICE),
        SeatType::Couple => Some(COUPLE_PRICE),
        SeatType::Other(_) => None,
    }
}

/// Цена за место по типам, как её отдаёт бэкенд.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: HashMap<SeatType, Money>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Строит таблицу из списка бэкенда. Для повторяющегося типа берётся первая запись.
    pub fn from_tickets(tickets: &[TicketPrice]) -> Self {
        let mut prices = HashMap::with_capacity(tickets.len());
        for ticket in tickets {
            if prices.contains_key(&ticket.ticket_type) {
                debug!("Ignoring repeated price for ticket type {}", ticket.ticket_type);
                continue;
            }
            prices.insert(ticket.ticket_type.clone(), ticket.price);
        }
        Self { prices }
    }

    pub fn with_price(mut self, seat_type: SeatType, price: Money) -> Self {
        self.prices.insert(seat_type, price);
        self
    }

    /// Цена бэкенда, затем встроенная, затем стандартная.
    pub fn price_for(&self, seat_type: &SeatType) -> Money {
        self.prices
            .get(seat_type)
            .copied()
            .or_else(|| fallback_price(seat_type))
            .unwrap_or(STANDARD_PRICE)
    }
}

/// Сумма цен всех мест.
pub fn total<'a>(seats: impl IntoIterator<Item = &'a Seat>, prices: &PriceTable) -> Money {
    seats.into_iter().map(|seat| prices.price_for(&seat.kind())).sum()
}

/// Группирует места по типам в строки билетов.
pub fn ticket_lines<'a>(
    seats: impl IntoIterator<Item = &'a Seat>,
    prices: &PriceTable,
) -> Vec<TicketLine> {
    let mut quantities: BTreeMap<SeatType, u32> = BTreeMap::new();
    for seat in seats {
        *quantities.entry(seat.kind()).or_default() += 1;
    }

    quantities
        .into_iter()
        .map(|(ticket_type, quantity)| TicketLine {
            unit_price: prices.price_for(&ticket_type),
            ticket_type,
            quantity,
        })
        .collect()
}

/// Форматирует сумму как во вьетнамских чеках: `70.000 ₫`.
pub fn format_vnd(amount: Money) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-{grouped} ₫")
    } else {
        format!("{grouped} ₫")
    }
}
