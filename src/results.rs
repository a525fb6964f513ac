//! Per-statement result values and the ordered transaction result list.

pub mod outcome;
pub mod row;

pub use outcome::{BatchResult, ExecResult, Mapped, StatementOutcome, TxResults};
pub use row::{Columns, Row};
