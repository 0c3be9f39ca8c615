pub mod amortization;

pub use amortization::{
    am_factor, balance_factor, balance_factor_at_age, payment_factor, schedule_vector,
    ScheduledBalanceVector,
};
