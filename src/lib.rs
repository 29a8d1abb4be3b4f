//! cellcore - workflow execution core for a multi-agent TCR/DAG coding
//! orchestrator: cell lifecycle management, file reservation conflict
//! detection, the honesty/integrity gate chain, the Enhanced TCR
//! Orchestrator, and the DAG scheduler.

#![allow(clippy::field_reassign_with_default)]
#![allow(clippy::module_inception)]
#![allow(clippy::needless_borrows_for_generic_args)]

pub mod activities;
pub mod benchmark;
pub mod cell;
pub mod config;
pub mod dag;
pub mod error;
pub mod gates;
pub mod git;
pub mod reservation;
pub mod tcr;

pub use activities::{ActivitySurface, Idempotency};
pub use cell::{Cell, CellAssembly, CellState};
pub use config::CoreConfig;
pub use dag::{DagScheduler, DagTaskRunner, TaskGraph};
pub use error::{CoreError, Result};
pub use gates::GateChain;
pub use reservation::ReservationRegistry;
pub use tcr::{GateKind, Task, TcrOrchestrator, TcrResult};
