//! This module contains functionality for additionl constraints around matching
//! such as non-linear left hand sides and conditional rewrite rules.
//!
#![forbid(unsafe_code)]

pub mod conditions;
pub mod nonlinear;
