pub mod cashflows;
pub mod curves;
pub mod error;
pub mod schedule;
pub mod types;

mod math;

pub use error::CashflowError;
pub use types::*;

/// Standard result type for all cash flow operations
pub type CashflowResult<T> = Result<T, CashflowError>;
