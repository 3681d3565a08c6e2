use chrono::{Local, NaiveDateTime};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub clock: Clock,
}

/// Source of the server's local wall-clock time. Handlers read it once per
/// request and pass the instant down explicitly.
#[derive(Clone, Copy, Debug)]
pub enum Clock {
    System,
    Fixed(NaiveDateTime),
}

impl Clock {
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            Clock::Fixed(instant) => *instant,
        }
    }
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            clock: Clock::System,
        }
    }
}
