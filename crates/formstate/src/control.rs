#![forbid(unsafe_code)]

//! The atomic observable unit: one value, its staged edit, and derived state.
//!
//! # State machine
//!
//! A [`FieldControl`] holds a committed `value`, a staged `pending_value`,
//! an error set and two derived flags. Transitions:
//!
//! | Operation | value | pending | errors / validity | pristine | parent signal |
//! |-----------|-------|---------|-------------------|----------|---------------|
//! | construct | set | = value | only if `validate_on_init` | true | none |
//! | `set_value` | set | = value | if `validate_on_change` | false | dirty (+ recompute) |
//! | `set_pending_value` | - | set | - | - | none |
//! | `commit` | = pending if different | - | as `set_value` | as `set_value` | as `set_value` |
//! | `validate` | - | - | recomputed | - | recompute |
//! | `mark_dirty(c)` / `mark_pristine(c)` | - | - | - | set | one level if `c` |
//!
//! # Invariants
//!
//! 1. After any validity pass, `is_valid() == !errors().has_any_error()`.
//! 2. `is_invalid() == !is_valid()` and `is_dirty() == !is_pristine()` always.
//! 3. Staging a pending value never touches `value`, validity or dirtiness.
//! 4. `commit` is idempotent: a second call without a new pending value is a no-op.
//!
//! Until the first validity pass a control is *unvalidated*: its error set is
//! empty and `is_valid()` reports `false`.

use std::cell::Cell;
use std::fmt;
use std::rc::Weak;

use crate::notify::{ChangeNotifier, ControlChange, Subscription};
use crate::policy::UpdatePolicy;
use crate::validation::{ValidationErrors, Validator};

/// Non-owning link from a control to the form that owns it.
///
/// The link is the control's slot (declaration-order index) in its form plus
/// the attach generation that assigned it; the control never holds a
/// reference to the form itself. Generations are unique per process, so a
/// link only compares equal to one handed out by the same attach pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentLink {
    slot: usize,
    generation: u64,
}

impl ParentLink {
    pub(crate) const fn new(slot: usize, generation: u64) -> Self {
        Self { slot, generation }
    }

    /// Declaration-order index of the control within its form.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.slot
    }
}

pub(crate) mod private {
    use std::cell::Cell;
    use std::rc::Weak;

    use super::ParentLink;

    /// Upward propagation request queued by an attached control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ParentSignal {
        /// Re-evaluate aggregate validity.
        Recompute,
        /// A child became dirty.
        MarkDirty,
        /// A child became pristine.
        MarkPristine,
    }

    /// Form-facing plumbing, unreachable from outside the crate.
    pub trait Node {
        /// Attach under `link`. `current` is the form's live generation; the
        /// link goes stale as soon as it moves on or the form is dropped.
        fn attach(&mut self, link: ParentLink, current: Weak<Cell<u64>>);
        fn detach(&mut self);
        fn drain_signals(&mut self, out: &mut Vec<ParentSignal>);
    }
}

use private::ParentSignal;

/// A parent link together with the owning form's current generation.
struct Attachment {
    link: ParentLink,
    current: Weak<Cell<u64>>,
}

impl Attachment {
    fn is_live(&self) -> bool {
        self.current
            .upgrade()
            .is_some_and(|generation| generation.get() == self.link.generation)
    }
}

// ---------------------------------------------------------------------------
// FieldControl
// ---------------------------------------------------------------------------

/// An observable form control.
///
/// # Example
///
/// ```rust
/// use formstate::{FieldControl, UpdatePolicy};
/// use formstate::validation::Validator;
///
/// let mut name = FieldControl::with_policy(
///     String::new(),
///     [Validator::required()],
///     UpdatePolicy::ALWAYS,
/// );
/// assert!(name.is_invalid());
/// assert!(name.errors().get(&Validator::required()));
///
/// name.set_value("Mario".to_string());
/// assert!(name.is_valid());
/// assert!(name.is_dirty());
/// ```
pub struct FieldControl<V> {
    value: V,
    pending_value: V,
    validators: Vec<Validator<V>>,
    policy: UpdatePolicy,
    errors: ValidationErrors,
    valid: bool,
    validated: bool,
    pristine: bool,
    parent: Option<Attachment>,
    signals: Vec<ParentSignal>,
    will_change: ChangeNotifier<ControlChange>,
}

impl<V> FieldControl<V>
where
    V: PartialEq + Clone + 'static,
{
    /// Create a control with [`UpdatePolicy::default`].
    #[must_use]
    pub fn new(value: V, validators: impl IntoIterator<Item = Validator<V>>) -> Self {
        Self::with_policy(value, validators, UpdatePolicy::default())
    }

    /// Create a control with an explicit update policy.
    #[must_use]
    pub fn with_policy(
        value: V,
        validators: impl IntoIterator<Item = Validator<V>>,
        policy: UpdatePolicy,
    ) -> Self {
        let mut control = Self {
            pending_value: value.clone(),
            value,
            validators: validators.into_iter().collect(),
            policy,
            errors: ValidationErrors::new(),
            valid: false,
            validated: false,
            pristine: true,
            parent: None,
            signals: Vec::new(),
            will_change: ChangeNotifier::new(),
        };
        if policy.validate_on_init {
            control.validate();
        }
        control
    }

    /// The committed value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// The staged value.
    #[must_use]
    pub fn pending_value(&self) -> &V {
        &self.pending_value
    }

    /// Validators in the order they run.
    #[must_use]
    pub fn validators(&self) -> &[Validator<V>] {
        &self.validators
    }

    /// When this control validates implicitly.
    #[must_use]
    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    /// Outcome of the last validity pass, keyed by validator identity.
    #[must_use]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        !self.valid
    }

    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.pristine
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.pristine
    }

    /// Whether a validity pass has run since construction.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Link to the owning form, if attached.
    ///
    /// `None` once the form has dropped this control, even if it has not
    /// been detached explicitly.
    #[must_use]
    pub fn parent(&self) -> Option<ParentLink> {
        self.parent
            .as_ref()
            .filter(|attachment| attachment.is_live())
            .map(|attachment| attachment.link)
    }

    /// Commit `value` directly.
    ///
    /// Also stages the same value, marks the control dirty (propagating to the
    /// parent) and, under a `validate_on_change` policy, re-validates.
    pub fn set_value(&mut self, value: V) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            slot = ?self.parent().map(ParentLink::slot),
            "control value set"
        );

        self.will_change.emit(&ControlChange::Value);
        self.value = value;
        if self.pending_value != self.value {
            self.will_change.emit(&ControlChange::PendingValue);
            self.pending_value = self.value.clone();
        }
        self.mark_dirty(true);
        if self.policy.validate_on_change {
            self.validate();
        }
    }

    /// Stage `value` without touching the committed state.
    pub fn set_pending_value(&mut self, value: V) {
        self.will_change.emit(&ControlChange::PendingValue);
        self.pending_value = value;
    }

    /// Commit the staged value if it differs from the committed one.
    ///
    /// Returns `true` if a change was applied.
    pub fn commit(&mut self) -> bool {
        if self.pending_value == self.value {
            return false;
        }
        let value = self.pending_value.clone();
        self.set_value(value);
        true
    }

    /// Re-run every validator against the committed value.
    ///
    /// Validators run in order and each one overwrites its identity's entry,
    /// so with shared identities the last validator wins. Validity is derived
    /// from the resulting error set.
    pub fn validate(&mut self) {
        self.will_change.emit(&ControlChange::Validity);
        for validator in &self.validators {
            let passed = validator.test(&self.value);
            self.errors.update(validator.id(), passed);
        }
        self.valid = !self.errors.has_any_error();
        self.validated = true;

        #[cfg(feature = "tracing")]
        tracing::trace!(
            slot = ?self.parent().map(ParentLink::slot),
            valid = self.valid,
            failing = self.errors.failing().count(),
            "control validated"
        );

        self.signal(ParentSignal::Recompute);
    }

    /// Mark the control dirty; with `cascade_to_parent`, the parent marks
    /// itself dirty too (one level, no further).
    pub fn mark_dirty(&mut self, cascade_to_parent: bool) {
        self.set_pristine(false);
        if cascade_to_parent {
            self.signal(ParentSignal::MarkDirty);
        }
    }

    /// Mark the control pristine; with `cascade_to_parent`, the parent
    /// re-evaluates its own pristine state (one level, no further).
    pub fn mark_pristine(&mut self, cascade_to_parent: bool) {
        self.set_pristine(true);
        if cascade_to_parent {
            self.signal(ParentSignal::MarkPristine);
        }
    }

    /// Observe changes before they happen.
    pub fn subscribe(&self, observer: impl FnMut(&ControlChange) + 'static) -> Subscription {
        self.will_change.subscribe(observer)
    }

    fn set_pristine(&mut self, pristine: bool) {
        if self.pristine != pristine {
            self.will_change.emit(&ControlChange::Pristine);
            self.pristine = pristine;
        }
    }

    fn signal(&mut self, signal: ParentSignal) {
        match &self.parent {
            Some(attachment) if attachment.is_live() => self.signals.push(signal),
            Some(_) => self.unlink(),
            None => {}
        }
    }

    fn unlink(&mut self) {
        self.parent = None;
        self.signals.clear();
    }
}

impl<V: fmt::Debug> fmt::Debug for FieldControl<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldControl")
            .field("value", &self.value)
            .field("pending_value", &self.pending_value)
            .field("validators", &self.validators.len())
            .field("policy", &self.policy)
            .field("errors", &self.errors)
            .field("valid", &self.valid)
            .field("pristine", &self.pristine)
            .field(
                "parent",
                &self
                    .parent
                    .as_ref()
                    .filter(|attachment| attachment.is_live())
                    .map(|attachment| attachment.link),
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AnyControl
// ---------------------------------------------------------------------------

/// Type-erased view of a control, as seen by its form.
///
/// Implemented by every [`FieldControl`]; sealed.
pub trait AnyControl: private::Node {
    fn is_valid(&self) -> bool;
    fn is_pristine(&self) -> bool;
    fn errors(&self) -> &ValidationErrors;
    fn parent(&self) -> Option<ParentLink>;
    fn commit(&mut self) -> bool;
    fn validate(&mut self);
    fn mark_dirty(&mut self, cascade_to_parent: bool);
    fn mark_pristine(&mut self, cascade_to_parent: bool);
    fn subscribe_boxed(&self, observer: Box<dyn FnMut(&ControlChange)>) -> Subscription;
}

impl<V> private::Node for FieldControl<V>
where
    V: PartialEq + Clone + 'static,
{
    fn attach(&mut self, link: ParentLink, current: Weak<Cell<u64>>) {
        self.parent = Some(Attachment { link, current });
    }

    fn detach(&mut self) {
        self.unlink();
    }

    fn drain_signals(&mut self, out: &mut Vec<ParentSignal>) {
        out.append(&mut self.signals);
    }
}

impl<V> AnyControl for FieldControl<V>
where
    V: PartialEq + Clone + 'static,
{
    fn is_valid(&self) -> bool {
        Self::is_valid(self)
    }

    fn is_pristine(&self) -> bool {
        Self::is_pristine(self)
    }

    fn errors(&self) -> &ValidationErrors {
        Self::errors(self)
    }

    fn parent(&self) -> Option<ParentLink> {
        Self::parent(self)
    }

    fn commit(&mut self) -> bool {
        Self::commit(self)
    }

    fn validate(&mut self) {
        Self::validate(self);
    }

    fn mark_dirty(&mut self, cascade_to_parent: bool) {
        Self::mark_dirty(self, cascade_to_parent);
    }

    fn mark_pristine(&mut self, cascade_to_parent: bool) {
        Self::mark_pristine(self, cascade_to_parent);
    }

    fn subscribe_boxed(&self, observer: Box<dyn FnMut(&ControlChange)>) -> Subscription {
        self.will_change.subscribe(observer)
    }
}
