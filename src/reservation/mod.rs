//! File Reservation Registry and Conflict Analyzer (C5/C6, `SPEC_FULL.md` §4.5).

mod conflict;
mod registry;

pub use conflict::{classify, suggest, ConflictKind, Resolution};
pub use registry::{Reservation, ReservationFilter, ReservationRegistry};
