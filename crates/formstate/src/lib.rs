//! Reactive form state and validation.
//!
//! `formstate` models an input form as a tree of observable controls: each
//! [`FieldControl`] holds a committed value, a staged pending value, a set of
//! [`Validator`]s and the derived validity and dirtiness flags. A [`Form`]
//! aggregates any struct of controls and keeps form-level flags in step with
//! its children.
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`validation`] | Identified predicates, built-in rules, error sets |
//! | [`policy`] | [`UpdatePolicy`]: when a control validates implicitly |
//! | [`notify`] | Synchronous "will change" observers and [`Subscription`] handles |
//! | [`control`] | [`FieldControl`], the per-value state machine |
//! | [`field`] | [`FormField`], the declarative field wrapper |
//! | [`form`] | [`Form`], the [`Fields`] trait and [`impl_fields!`] |
//!
//! # Features
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `tracing` | Emit `tracing` events and spans for value changes, validation and bulk operations |
//!
//! # Example
//!
//! ```rust
//! use formstate::{impl_fields, Form, FormField, UpdatePolicy};
//! use formstate::validation::Validator;
//!
//! struct Signup {
//!     email: FormField<String>,
//!     age: FormField<u32>,
//!     terms: FormField<Option<bool>>,
//! }
//! impl_fields!(Signup { email, age, terms });
//!
//! let policy = UpdatePolicy::ALWAYS;
//! let mut form = Form::new(Signup {
//!     email: FormField::with_policy(String::new(), [Validator::required(), Validator::email()], policy),
//!     age: FormField::with_policy(0, [Validator::min(18)], policy),
//!     terms: FormField::with_policy(None, [Validator::required_true()], policy),
//! });
//! assert!(form.is_invalid());
//! assert_eq!(form.invalid_slots(), vec![0, 1, 2]);
//!
//! form.edit(|f| {
//!     f.email.set("mario@example.com".into());
//!     f.age.set(30);
//!     f.terms.set(Some(true));
//! });
//! assert!(form.is_valid());
//! ```

#![forbid(unsafe_code)]

pub mod control;
pub mod field;
pub mod form;
pub mod notify;
pub mod policy;
pub mod validation;

pub use control::{AnyControl, FieldControl, ParentLink};
pub use field::FormField;
pub use form::{Fields, FieldsMut, Form};
pub use notify::{ChangeNotifier, ControlChange, FormChange, ObserverId, Subscription};
pub use policy::{ParsePolicyError, UPDATE_POLICY_ENV, UpdatePolicy};
pub use validation::{ValidationErrors, Validator, ValidatorId};
