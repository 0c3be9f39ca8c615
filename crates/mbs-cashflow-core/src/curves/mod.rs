pub mod conversions;
pub mod generation;

pub use conversions::{
    abs_to_smm, cdr_to_mdr, cpr_to_psa, cpr_to_smm, historical_abs, historical_cpr,
    historical_psa, historical_smm, psa_to_cpr, psa_to_smm, sda_to_cdr, smm_from_factors,
    smm_to_cpr,
};
pub use generation::{
    generate_default_curve, generate_prepayment_curve, DefaultAssumption, PrepaymentAssumption,
    RateVector,
};
