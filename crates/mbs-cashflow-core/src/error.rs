use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CashflowError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error(
        "Curve exhaustion: {family} speed pays the pool off at month {month}, \
         covering only {covered} of {required} months"
    )]
    CurveExhaustion {
        family: String,
        month: u32,
        covered: u32,
        required: u32,
    },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CashflowError {
    fn from(e: serde_json::Error) -> Self {
        CashflowError::SerializationError(e.to_string())
    }
}
