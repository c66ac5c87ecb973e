use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use crate::models::Seat;

/// Сетка зала: уникальные ряды и колонки плюс поиск места по координатам.
///
/// Ряды сортируются как строки, колонки как числа. Координата без места -
/// пустая ячейка, а не ошибка.
#[derive(Debug, Clone, Default)]
pub struct SeatMap {
    rows: Vec<String>,
    columns: Vec<u32>,
    cells: HashMap<(String, u32), Seat>,
}

impl SeatMap {
    pub fn build(seats: &[Seat]) -> Self {
        let mut rows = BTreeSet::new();
        let mut columns = BTreeSet::new();
        let mut cells = HashMap::with_capacity(seats.len());

        for seat in seats {
            rows.insert(seat.row.clone());
            columns.insert(seat.column);

            match cells.entry((seat.row.clone(), seat.column)) {
                Entry::Vacant(slot) => {
                    slot.insert(seat.clone());
                }
                Entry::Occupied(existing) => {
                    warn!(
                        "Seat {} duplicates {} at {}, keeping the first",
                        seat.id,
                        existing.get().id,
                        seat.label()
                    );
                }
            }
        }

        Self {
            rows: rows.into_iter().collect(),
            columns: columns.into_iter().collect(),
            cells,
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[u32] {
        &self.columns
    }

    pub fn get(&self, row: &str, column: u32) -> Option<&Seat> {
        self.cells.get(&(row.to_string(), column))
    }

    /// Сколько мест легло на сетку.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Ряды в порядке показа, по ячейке на каждую колонку.
    pub fn grid(&self) -> impl Iterator<Item = (&str, Vec<Option<&Seat>>)> + '_ {
        self.rows.iter().map(move |row| {
            let cells = self
                .columns
                .iter()
                .map(|&column| self.cells.get(&(row.clone(), column)))
                .collect();
            (row.as_str(), cells)
        })
    }
}
