#![forbid(unsafe_code)]

//! Validation rules and the per-control error set.
//!
//! This module provides:
//! - [`Validator`], a pure predicate paired with a stable [`ValidatorId`]
//! - Built-in rules for common patterns (required, e-mail, length, bounds, pattern)
//! - Composition (`and`, `or`, `negate`, `all`) producing new rules
//! - [`ValidationErrors`], the identity → failed map a control keeps
//!
//! # Example
//!
//! ```rust
//! use formstate::validation::{Validator, ValidationErrors};
//!
//! let required = Validator::required();
//! let mut errors = ValidationErrors::new();
//! errors.update(required.id(), required.test(&String::new()));
//!
//! assert!(errors.get(&required));
//! assert!(!errors.get(&Validator::email())); // never ran
//! ```

mod errors;
mod validators;

pub use errors::ValidationErrors;
pub use validators::{
    Email, LengthUnit, Max, MaxLength, Min, MinLength, Pattern, PatternError, Required,
    RequiredTrue, Validator, ValidatorId,
};
