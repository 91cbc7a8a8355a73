#![forbid(unsafe_code)]

//! Forms: aggregate validity and dirtiness over a struct of controls.
//!
//! A form owns a user-defined fields value (any type implementing
//! [`Fields`]) and derives two flags from the controls it contains:
//!
//! - `is_valid` is true iff every child control is valid (vacuously true
//!   for a form without controls)
//! - `is_pristine` is cleared whenever a child cascades a dirty mark, and
//!   set again only when a child cascades a pristine mark while every
//!   child is pristine
//!
//! # Propagation
//!
//! Controls do not hold a reference to their form. Each attached control
//! knows its slot and attach generation and queues upward signals; the form
//! applies them when a mutable borrow of its fields ends ([`Form::fields_mut`] guard drop,
//! [`Form::edit`] return, or any bulk operation). Propagation is one level
//! deep: a form never forwards a child's signal further.
//!
//! Whenever the set of controls found differs from the attached one (a field
//! replaced, an element pushed or popped) the form re-attaches every control
//! under a new generation. Controls taken out of the form keep the old
//! generation, so they report no parent and stop queueing signals.
//!
//! Child events are re-published on the form's notifier as
//! [`FormChange::Control`], tagged with the child's slot.
//!
//! # Example
//!
//! ```rust
//! use formstate::{impl_fields, Form, FormField, UpdatePolicy};
//! use formstate::validation::Validator;
//!
//! struct Login {
//!     email: FormField<String>,
//!     password: FormField<String>,
//! }
//! impl_fields!(Login { email, password });
//!
//! let mut form = Form::new(Login {
//!     email: FormField::with_policy(String::new(), [Validator::email()], UpdatePolicy::ALWAYS),
//!     password: FormField::with_policy(String::new(), [Validator::min_length(8)], UpdatePolicy::ALWAYS),
//! });
//! assert!(form.is_invalid());
//!
//! form.edit(|f| {
//!     f.email.set("mario@example.com".into());
//!     f.password.set("correct horse".into());
//! });
//! assert!(form.is_valid());
//! assert!(form.is_dirty());
//! ```

use std::cell::Cell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::control::private::{Node, ParentSignal};
use crate::control::{AnyControl, FieldControl, ParentLink};
use crate::notify::{ChangeNotifier, ControlChange, FormChange, Subscription};

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Enumerates the controls contained in a value, in declaration order.
///
/// Implemented for [`FieldControl`], [`FormField`](crate::FormField),
/// `Vec<T>` and `Option<T>`; use [`impl_fields!`](crate::impl_fields) for
/// structs.
pub trait Fields {
    fn visit(&self, visitor: &mut dyn FnMut(&dyn AnyControl));
    fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn AnyControl));
}

impl<V> Fields for FieldControl<V>
where
    V: PartialEq + Clone + 'static,
{
    fn visit(&self, visitor: &mut dyn FnMut(&dyn AnyControl)) {
        visitor(self);
    }

    fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn AnyControl)) {
        visitor(self);
    }
}

impl<T: Fields> Fields for Vec<T> {
    fn visit(&self, visitor: &mut dyn FnMut(&dyn AnyControl)) {
        for item in self {
            item.visit(visitor);
        }
    }

    fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn AnyControl)) {
        for item in self {
            item.visit_mut(visitor);
        }
    }
}

impl<T: Fields> Fields for Option<T> {
    fn visit(&self, visitor: &mut dyn FnMut(&dyn AnyControl)) {
        if let Some(item) = self {
            item.visit(visitor);
        }
    }

    fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn AnyControl)) {
        if let Some(item) = self {
            item.visit_mut(visitor);
        }
    }
}

/// Implement [`Fields`] for a struct by listing its control-bearing fields.
///
/// Fields are visited in the order listed, which fixes their slots. Nested
/// structs work as long as they implement [`Fields`] too.
///
/// ```rust
/// use formstate::{impl_fields, FormField};
///
/// struct Address { street: FormField<String>, city: FormField<String> }
/// impl_fields!(Address { street, city });
///
/// struct Profile { name: FormField<String>, address: Address }
/// impl_fields!(Profile { name, address });
/// ```
#[macro_export]
macro_rules! impl_fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::Fields for $ty {
            #[allow(unused_variables)]
            fn visit(&self, visitor: &mut dyn FnMut(&dyn $crate::AnyControl)) {
                $( $crate::Fields::visit(&self.$field, visitor); )*
            }

            #[allow(unused_variables)]
            fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn $crate::AnyControl)) {
                $( $crate::Fields::visit_mut(&mut self.$field, visitor); )*
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Allocate a process-unique attach generation. Never returns 0.
fn next_generation() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Aggregate state over a fields value.
pub struct Form<F: Fields> {
    fields: F,
    slots: usize,
    valid: bool,
    pristine: bool,
    generation: Rc<Cell<u64>>,
    will_change: ChangeNotifier<FormChange>,
    forwarding: Vec<Subscription>,
}

impl<F: Fields> Form<F> {
    /// Take ownership of `fields`, attach every control and compute the
    /// initial aggregate state.
    pub fn new(fields: F) -> Self {
        let mut form = Self {
            fields,
            slots: 0,
            valid: false,
            pristine: true,
            generation: Rc::new(Cell::new(0)),
            will_change: ChangeNotifier::new(),
            forwarding: Vec::new(),
        };
        form.attach_children();
        form.pristine = form.children_pristine();
        form.recompute();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            controls = form.slots,
            valid = form.valid,
            "form created"
        );

        form
    }

    /// Read access to the fields.
    pub fn fields(&self) -> &F {
        &self.fields
    }

    /// Write access to the fields; aggregate state is updated when the
    /// guard is dropped.
    pub fn fields_mut(&mut self) -> FieldsMut<'_, F> {
        FieldsMut { form: self }
    }

    /// Run `f` against the fields, then update aggregate state.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut F) -> R) -> R {
        let result = f(&mut self.fields);
        self.sync();
        result
    }

    /// Detach every control and hand the fields back.
    pub fn into_fields(mut self) -> F {
        self.forwarding.clear();
        self.fields.visit_mut(&mut |control| control.detach());
        self.fields
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

    /// Number of attached controls.
    #[must_use]
    pub fn control_count(&self) -> usize {
        self.slots
    }

    /// Slots of controls that are currently invalid.
    #[must_use]
    pub fn invalid_slots(&self) -> Vec<usize> {
        self.slots_where(|control| !control.is_valid())
    }

    /// Slots of controls that are currently dirty.
    #[must_use]
    pub fn dirty_slots(&self) -> Vec<usize> {
        self.slots_where(|control| !control.is_pristine())
    }

    /// Re-derive aggregate validity from the children's current flags.
    ///
    /// Does not re-run any validator.
    pub fn recompute(&mut self) {
        let mut valid = true;
        self.fields.visit(&mut |control| valid &= control.is_valid());
        if valid != self.valid {
            self.will_change.emit(&FormChange::Validity);
            self.valid = valid;
        }
    }

    /// Commit every control's pending value.
    ///
    /// Returns the number of controls whose value changed.
    pub fn commit_all(&mut self) -> usize {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("form_commit_all", controls = self.slots).entered();

        let mut committed = 0;
        self.fields.visit_mut(&mut |control| {
            if control.commit() {
                committed += 1;
            }
        });
        self.sync();
        self.recompute();

        #[cfg(feature = "tracing")]
        tracing::debug!(committed, valid = self.valid, "pending values committed");

        committed
    }

    /// Re-run validation on every control.
    pub fn recompute_all(&mut self) {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("form_recompute_all", controls = self.slots).entered();

        self.fields.visit_mut(&mut |control| control.validate());
        self.sync();
        self.recompute();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            valid = self.valid,
            invalid = self.invalid_slots().len(),
            "form revalidated"
        );
    }

    /// Mark the form and every control dirty.
    pub fn mark_all_dirty(&mut self) {
        self.set_pristine(false);
        self.fields
            .visit_mut(&mut |control| control.mark_dirty(false));
    }

    /// Mark the form and every control pristine.
    pub fn mark_all_pristine(&mut self) {
        self.set_pristine(true);
        self.fields
            .visit_mut(&mut |control| control.mark_pristine(false));
    }

    /// Observe form-level changes and every forwarded child change.
    pub fn subscribe(&self, observer: impl FnMut(&FormChange) + 'static) -> Subscription {
        self.will_change.subscribe(observer)
    }

    fn attach_children(&mut self) {
        self.forwarding.clear();
        let generation = next_generation();
        self.generation.set(generation);
        let current = Rc::downgrade(&self.generation);
        let notifier = self.will_change.clone();
        let forwarding = &mut self.forwarding;
        let mut slot = 0;
        self.fields.visit_mut(&mut |control| {
            control.attach(ParentLink::new(slot, generation), current.clone());
            let notifier = notifier.clone();
            let child = slot;
            forwarding.push(control.subscribe_boxed(Box::new(move |change: &ControlChange| {
                notifier.emit(&FormChange::Control {
                    slot: child,
                    change: *change,
                });
            })));
            slot += 1;
        });
        self.slots = slot;
    }

    /// Whether the controls found now differ from the ones attached by the
    /// last pass.
    fn needs_reattach(&self) -> bool {
        let generation = self.generation.get();
        let mut slot = 0;
        let mut stale = false;
        self.fields.visit(&mut |control| {
            stale |= control.parent() != Some(ParentLink::new(slot, generation));
            slot += 1;
        });
        stale || slot != self.slots
    }

    /// Apply every queued child signal, in per-child order.
    fn sync(&mut self) {
        if self.needs_reattach() {
            #[cfg(feature = "tracing")]
            tracing::debug!(previous = self.slots, "controls replaced, reattaching");

            self.attach_children();
            self.recompute();
        }

        let mut signals = Vec::new();
        self.fields
            .visit_mut(&mut |control| control.drain_signals(&mut signals));
        for signal in signals {
            match signal {
                ParentSignal::Recompute => self.recompute(),
                ParentSignal::MarkDirty => self.set_pristine(false),
                ParentSignal::MarkPristine => {
                    let pristine = self.children_pristine();
                    self.set_pristine(pristine);
                }
            }
        }
    }

    fn children_pristine(&self) -> bool {
        let mut pristine = true;
        self.fields
            .visit(&mut |control| pristine &= control.is_pristine());
        pristine
    }

    fn set_pristine(&mut self, pristine: bool) {
        if self.pristine != pristine {
            self.will_change.emit(&FormChange::Pristine);
            self.pristine = pristine;
        }
    }

    fn slots_where(&self, mut predicate: impl FnMut(&dyn AnyControl) -> bool) -> Vec<usize> {
        let mut slot = 0;
        let mut matched = Vec::new();
        self.fields.visit(&mut |control| {
            if predicate(control) {
                matched.push(slot);
            }
            slot += 1;
        });
        matched
    }
}

impl<F: Fields + fmt::Debug> fmt::Debug for Form<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("fields", &self.fields)
            .field("valid", &self.valid)
            .field("pristine", &self.pristine)
            .field("controls", &self.slots)
            .finish()
    }
}

/// Mutable access to a form's fields.
///
/// Dropping the guard applies every pending child signal to the form.
pub struct FieldsMut<'a, F: Fields> {
    form: &'a mut Form<F>,
}

impl<F: Fields> Deref for FieldsMut<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.form.fields
    }
}

impl<F: Fields> DerefMut for FieldsMut<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        &mut self.form.fields
    }
}

impl<F: Fields> Drop for FieldsMut<'_, F> {
    fn drop(&mut self) {
        self.form.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::UpdatePolicy;
    use crate::validation::Validator;
    use crate::FormField;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Pair {
        first: FormField<String>,
        second: FormField<String>,
    }
    crate::impl_fields!(Pair { first, second });

    fn required(value: &str) -> FormField<String> {
        FormField::with_policy(
            value.to_string(),
            [Validator::required()],
            UpdatePolicy::ALWAYS,
        )
    }

    fn pair(first: &str, second: &str) -> Form<Pair> {
        Form::new(Pair {
            first: required(first),
            second: required(second),
        })
    }

    #[test]
    fn new_attaches_in_declaration_order() {
        let form = pair("", "");
        assert_eq!(form.control_count(), 2);
        assert_eq!(form.fields().first.control().parent().map(ParentLink::slot), Some(0));
        assert_eq!(form.fields().second.control().parent().map(ParentLink::slot), Some(1));
    }

    #[test]
    fn aggregate_validity_follows_children() {
        let mut form = pair("", "");
        assert!(form.is_invalid());
        assert_eq!(form.invalid_slots(), vec![0, 1]);

        form.fields_mut().first.set("a".into());
        assert!(form.is_invalid());
        assert_eq!(form.invalid_slots(), vec![1]);

        form.fields_mut().second.set("b".into());
        assert!(form.is_valid());

        form.fields_mut().second.set(String::new());
        assert!(form.is_invalid());
    }

    #[test]
    fn empty_form_is_valid() {
        let form = Form::new(Vec::<FormField<String>>::new());
        assert!(form.is_valid());
        assert!(form.is_pristine());
        assert_eq!(form.control_count(), 0);
    }

    #[test]
    fn dirty_propagates_one_level() {
        let mut form = pair("a", "b");
        assert!(form.is_pristine());

        form.fields_mut().first.set("c".into());
        assert!(form.is_dirty());
        assert_eq!(form.dirty_slots(), vec![0]);
    }

    #[test]
    fn pristine_needs_every_child() {
        let mut form = pair("a", "b");
        form.edit(|f| {
            f.first.control_mut().mark_dirty(true);
            f.second.control_mut().mark_dirty(true);
        });
        assert!(form.is_dirty());

        form.fields_mut().first.control_mut().mark_pristine(true);
        assert!(form.is_dirty());

        form.fields_mut().second.control_mut().mark_pristine(true);
        assert!(form.is_pristine());
    }

    #[test]
    fn non_cascading_marks_leave_form_alone() {
        let mut form = pair("a", "b");
        form.fields_mut().first.control_mut().mark_dirty(false);
        assert!(form.is_pristine());
        assert!(form.fields().first.control().is_dirty());
    }

    #[test]
    fn manual_recompute_reads_current_flags() {
        let mut form = Form::new(Pair {
            first: FormField::with_policy(String::new(), [Validator::required()], UpdatePolicy::MANUAL),
            second: required("b"),
        });
        assert!(form.is_invalid());

        form.fields_mut().first.set("a".into());
        assert!(form.is_invalid());

        form.recompute_all();
        assert!(form.is_valid());
    }

    #[test]
    fn commit_all_counts_changes() {
        let mut form = pair("", "");
        form.edit(|f| {
            f.first.control_mut().set_pending_value("a".into());
            f.second.control_mut().set_pending_value("b".into());
        });
        assert!(form.is_invalid());
        assert!(form.is_pristine());

        assert_eq!(form.commit_all(), 2);
        assert!(form.is_valid());
        assert!(form.is_dirty());
        assert_eq!(form.commit_all(), 0);
    }

    #[test]
    fn mark_all_resets_every_control() {
        let mut form = pair("a", "b");
        form.mark_all_dirty();
        assert!(form.is_dirty());
        assert_eq!(form.dirty_slots(), vec![0, 1]);

        form.mark_all_pristine();
        assert!(form.is_pristine());
        assert!(form.dirty_slots().is_empty());
    }

    #[test]
    fn replaced_control_is_reattached() {
        let mut form = pair("a", "b");
        form.fields_mut().second = required("");
        assert!(form.is_invalid());
        assert_eq!(form.fields().second.control().parent().map(ParentLink::slot), Some(1));

        form.fields_mut().second.set("c".into());
        assert!(form.is_valid());
        assert!(form.is_dirty());
    }

    #[test]
    fn vec_of_fields_grows() {
        let mut form = Form::new(vec![required("a")]);
        assert!(form.is_valid());

        form.fields_mut().push(required(""));
        assert_eq!(form.control_count(), 2);
        assert!(form.is_invalid());

        form.fields_mut().pop();
        assert_eq!(form.control_count(), 1);
        assert!(form.is_valid());
    }

    #[test]
    fn restored_control_is_forwarded_again() {
        let mut form = pair("a", "b");
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = form.subscribe(move |change| {
            if let FormChange::Control { slot, .. } = change {
                sink.borrow_mut().push(*slot);
            }
        });

        let original = std::mem::replace(&mut form.fields_mut().first, required("tmp"));
        assert!(original.control().parent().is_none());
        let tmp = std::mem::replace(&mut form.fields_mut().first, original);
        assert!(tmp.control().parent().is_none());
        assert_eq!(form.fields().first.control().parent().map(ParentLink::slot), Some(0));

        log.borrow_mut().clear();
        form.fields_mut()
            .first
            .control_mut()
            .set_pending_value("x".into());
        assert_eq!(*log.borrow(), vec![0]);

        form.fields_mut().first.set(String::new());
        assert!(form.is_invalid());
        assert!(form.is_dirty());
    }

    #[test]
    fn removed_control_stops_queueing() {
        let mut form = Form::new(vec![required("a"), required("b")]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = form.subscribe(move |change| sink.borrow_mut().push(*change));

        let mut popped = form.fields_mut().pop().unwrap();
        assert!(popped.control().parent().is_none());
        log.borrow_mut().clear();

        for i in 0..1000 {
            popped.set(i.to_string());
        }
        let mut out = Vec::new();
        popped.control_mut().drain_signals(&mut out);
        assert!(out.is_empty());
        assert!(log.borrow().is_empty());
        assert!(form.is_pristine());
    }

    #[test]
    fn swapped_controls_take_new_slots() {
        let mut form = pair("", "b");
        form.edit(|f| std::mem::swap(&mut f.first, &mut f.second));
        assert_eq!(form.fields().first.control().parent().map(ParentLink::slot), Some(0));
        assert_eq!(form.fields().second.control().parent().map(ParentLink::slot), Some(1));
        assert_eq!(form.invalid_slots(), vec![1]);
    }

    #[test]
    fn struct_without_controls() {
        struct Nothing;
        crate::impl_fields!(Nothing {});

        let mut form = Form::new(Nothing);
        assert_eq!(form.control_count(), 0);
        assert!(form.is_valid());
        assert_eq!(form.commit_all(), 0);
    }

    #[test]
    fn into_fields_detaches() {
        let form = pair("a", "b");
        let fields = form.into_fields();
        assert!(fields.first.control().parent().is_none());
    }

    #[test]
    fn child_events_are_forwarded_with_slot() {
        let mut form = pair("", "");
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = form.subscribe(move |change| sink.borrow_mut().push(*change));

        form.fields_mut().second.control_mut().set_pending_value("x".into());

        assert_eq!(
            *log.borrow(),
            vec![FormChange::Control {
                slot: 1,
                change: ControlChange::PendingValue
            }]
        );
    }

    #[test]
    fn form_flags_notify_on_flip_only() {
        let mut form = pair("", "b");
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = form.subscribe(move |change| {
            if !matches!(change, FormChange::Control { .. }) {
                sink.borrow_mut().push(*change);
            }
        });

        form.fields_mut().first.set("a".into());
        form.fields_mut().first.set("c".into());

        assert_eq!(*log.borrow(), vec![FormChange::Pristine, FormChange::Validity]);
    }
}
