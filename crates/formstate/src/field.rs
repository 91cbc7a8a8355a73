#![forbid(unsafe_code)]

//! Declarative field wrapper for form structs.

use crate::control::{AnyControl, FieldControl};
use crate::form::Fields;
use crate::policy::UpdatePolicy;
use crate::validation::Validator;

/// A form field: owns one [`FieldControl`] and exposes its value directly.
///
/// `get`/`set` read and commit the value; the underlying control stays
/// reachable for errors, pending values and flags.
#[derive(Debug)]
pub struct FormField<V> {
    control: FieldControl<V>,
}

impl<V> FormField<V>
where
    V: PartialEq + Clone + 'static,
{
    #[must_use]
    pub fn new(value: V, validators: impl IntoIterator<Item = Validator<V>>) -> Self {
        Self {
            control: FieldControl::new(value, validators),
        }
    }

    #[must_use]
    pub fn with_policy(
        value: V,
        validators: impl IntoIterator<Item = Validator<V>>,
        policy: UpdatePolicy,
    ) -> Self {
        Self {
            control: FieldControl::with_policy(value, validators, policy),
        }
    }

    /// The committed value.
    #[must_use]
    pub fn get(&self) -> &V {
        self.control.value()
    }

    /// Commit a new value; same as [`FieldControl::set_value`].
    pub fn set(&mut self, value: V) {
        self.control.set_value(value);
    }

    #[must_use]
    pub fn control(&self) -> &FieldControl<V> {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut FieldControl<V> {
        &mut self.control
    }

    #[must_use]
    pub fn into_control(self) -> FieldControl<V> {
        self.control
    }
}

impl<V> From<FieldControl<V>> for FormField<V> {
    fn from(control: FieldControl<V>) -> Self {
        Self { control }
    }
}

impl<V> Fields for FormField<V>
where
    V: PartialEq + Clone + 'static,
{
    fn visit(&self, visitor: &mut dyn FnMut(&dyn AnyControl)) {
        visitor(&self.control);
    }

    fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn AnyControl)) {
        visitor(&mut self.control);
    }
}
