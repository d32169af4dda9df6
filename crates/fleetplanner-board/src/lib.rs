//! The Process Board: task state machine execution and capability-filtered
//! reachability queries over one or more DAGs.

pub mod board;
pub mod dispatch;

pub use board::{Board, BoardError};
pub use dispatch::{InMemoryDispatch, WorkerDispatch};
