//! Domain model module declarations.

pub mod command;
pub mod event;
pub mod grid;
pub mod run;

pub use command::Command;
pub use event::Event;
pub use grid::{Cell, Grid, ALIVE, DEAD};
pub use run::{snapshot_label, Params, Progress, RunPhase, Snapshot};
