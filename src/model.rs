use std::fmt;

use serde::{Deserialize, Serialize};

/// A railway station row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: u64,
    pub city: String,
    pub name: String,
}

/// A train row. `capacity` is the field the isolation simulator reads twice
/// and increments once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
    pub id: u64,
    pub code: String,
    pub capacity: i64,
}

/// A seat row, produced in bulk by the seat-generation utility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: u64,
    pub label: String,
}

/// The tables the store keeps rows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Stations,
    Trains,
    Seats,
}

impl Table {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stations => "stations",
            Self::Trains => "trains",
            Self::Seats => "seats",
        }
    }
}

/// Identifies one row in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub table: Table,
    pub id: u64,
}

impl RowKey {
    pub const fn station(id: u64) -> Self {
        Self { table: Table::Stations, id }
    }

    pub const fn train(id: u64) -> Self {
        Self { table: Table::Trains, id }
    }

    pub const fn seat(id: u64) -> Self {
        Self { table: Table::Seats, id }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table.name(), self.id)
    }
}

/// A value stored under a [`RowKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    Station(Station),
    Train(Train),
    Seat(Seat),
}

impl Record {
    pub fn as_train(&self) -> Option<&Train> {
        match self {
            Self::Train(train) => Some(train),
            _ => None,
        }
    }

    pub fn into_station(self) -> Option<Station> {
        match self {
            Self::Station(station) => Some(station),
            _ => None,
        }
    }

    pub fn into_train(self) -> Option<Train> {
        match self {
            Self::Train(train) => Some(train),
            _ => None,
        }
    }

    pub fn into_seat(self) -> Option<Seat> {
        match self {
            Self::Seat(seat) => Some(seat),
            _ => None,
        }
    }
}
