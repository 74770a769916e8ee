//! Utility functionality supporting certificate chain validation

pub mod error;
pub mod pdv_utilities;
pub mod time_of_interest;

pub use crate::{util::error::*, util::pdv_utilities::*, util::time_of_interest::*};
