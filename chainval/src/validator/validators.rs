//! Validators that make up the default RFC 5280 pipeline

pub mod basic_constraints;
pub mod key_identifier;
pub mod key_usage;
pub mod name_chaining;
pub mod name_constraints;
pub mod policy;
pub mod validity;

pub use crate::validator::validators::{
    basic_constraints::*, key_identifier::*, key_usage::*, name_chaining::*, name_constraints::*,
    policy::*, validity::*,
};
