#![forbid(unsafe_code)]

//! Synchronous "will change" notifications.
//!
//! Every control and form owns a [`ChangeNotifier`]. Observers registered via
//! `subscribe` are called synchronously, in subscription order, immediately
//! before the state they are told about is mutated. The returned
//! [`Subscription`] handle stops delivery when cancelled or dropped.
//!
//! # Re-entrancy
//!
//! Observers may subscribe or cancel (themselves or others) while a
//! notification is being delivered:
//! - observers added during delivery first hear the *next* notification
//! - observers cancelled during delivery are skipped for the rest of it
//!
//! An observer cannot reach back into the control that is notifying: the
//! control is mutably borrowed for the whole mutating call.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// A unique identifier for an observer within one notifier.
pub type ObserverId = u64;

type Observer<E> = Box<dyn FnMut(&E)>;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What is about to change on a [`FieldControl`](crate::FieldControl).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlChange {
    /// The committed value.
    Value,
    /// The staged value.
    PendingValue,
    /// Error set and validity flags (sent before every recompute).
    Validity,
    /// Pristine/dirty flags (sent only when they flip).
    Pristine,
}

/// What is about to change on a [`Form`](crate::Form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormChange {
    /// A child control is about to change; forwarded from its notifier.
    Control {
        /// Declaration-order index of the child.
        slot: usize,
        /// The child's own event.
        change: ControlChange,
    },
    /// The form's aggregate validity is about to flip.
    Validity,
    /// The form's aggregate pristine/dirty state is about to flip.
    Pristine,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Registry<E> {
    next_id: ObserverId,
    observers: Vec<(ObserverId, Observer<E>)>,
    /// Nesting depth of in-progress `emit` calls.
    emitting: usize,
    /// Observers cancelled while an `emit` was in progress.
    cancelled: Vec<ObserverId>,
}

impl<E> Registry<E> {
    fn new() -> Self {
        Self {
            next_id: 1,
            observers: Vec::new(),
            emitting: 0,
            cancelled: Vec::new(),
        }
    }
}

/// Type-erased removal, so [`Subscription`] is not generic over the event.
trait Unsubscribe {
    fn unsubscribe(&self, id: ObserverId);
}

impl<E> Unsubscribe for RefCell<Registry<E>> {
    fn unsubscribe(&self, id: ObserverId) {
        let mut registry = self.borrow_mut();
        registry.observers.retain(|(observer_id, _)| *observer_id != id);
        if registry.emitting > 0 {
            registry.cancelled.push(id);
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeNotifier
// ---------------------------------------------------------------------------

/// Fan-out list of observers for events of type `E`.
///
/// Cloning a notifier yields another handle to the same observer list; this is
/// how a form forwards child events into its own notifier.
pub struct ChangeNotifier<E> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E> Clone for ChangeNotifier<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E> Default for ChangeNotifier<E> {
    fn default() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry::new())),
        }
    }
}

impl<E> fmt::Debug for ChangeNotifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl<E: 'static> ChangeNotifier<E> {
    /// Create a notifier with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer`. Delivery continues until the handle is cancelled
    /// or dropped.
    pub fn subscribe(&self, observer: impl FnMut(&E) + 'static) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.observers.push((id, Box::new(observer)));
            id
        };
        let registry: Rc<dyn Unsubscribe> = self.registry.clone();
        Subscription {
            id,
            registry: Some(Rc::downgrade(&registry)),
        }
    }

    /// Deliver `event` to every observer, in subscription order.
    pub fn emit(&self, event: &E) {
        let mut delivering = {
            let mut registry = self.registry.borrow_mut();
            registry.emitting += 1;
            std::mem::take(&mut registry.observers)
        };

        for (id, observer) in &mut delivering {
            if self.registry.borrow().cancelled.contains(id) {
                continue;
            }
            observer(event);
        }

        let mut registry = self.registry.borrow_mut();
        let added = std::mem::replace(&mut registry.observers, delivering);
        registry.observers.extend(added);
        registry.emitting -= 1;
        if registry.emitting == 0 {
            let cancelled = std::mem::take(&mut registry.cancelled);
            registry
                .observers
                .retain(|(id, _)| !cancelled.contains(id));
        }
    }
}

impl<E> ChangeNotifier<E> {
    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.registry.borrow().observers.len()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle to a registered observer.
///
/// Dropping the handle cancels the subscription. Use [`Subscription::detach`]
/// to keep the observer for as long as the notifier lives.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    id: ObserverId,
    registry: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    /// Identifier of the observer within its notifier.
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Whether the observer can still receive events.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .is_some_and(|registry| registry.strong_count() > 0)
    }

    /// Stop delivery. Calling this more than once is a no-op.
    pub fn cancel(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.unsubscribe(self.id);
        }
    }

    /// Release the handle without cancelling.
    pub fn detach(mut self) {
        self.registry = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, impl FnMut(&u32) + 'static) {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        (count, move |_: &u32| seen.set(seen.get() + 1))
    }

    #[test]
    fn emit_reaches_every_observer_in_order() {
        let notifier = ChangeNotifier::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (Rc::clone(&log), Rc::clone(&log));
        let _s1 = notifier.subscribe(move |e| a.borrow_mut().push(("a", *e)));
        let _s2 = notifier.subscribe(move |e| b.borrow_mut().push(("b", *e)));

        notifier.emit(&7);

        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn cancel_stops_delivery_and_is_idempotent() {
        let notifier = ChangeNotifier::<u32>::new();
        let (count, observer) = counter();
        let mut sub = notifier.subscribe(observer);

        notifier.emit(&1);
        sub.cancel();
        sub.cancel();
        notifier.emit(&2);

        assert_eq!(count.get(), 1);
        assert!(!sub.is_active());
        assert_eq!(notifier.observer_count(), 0);
    }

    #[test]
    fn drop_cancels() {
        let notifier = ChangeNotifier::<u32>::new();
        let (count, observer) = counter();
        drop(notifier.subscribe(observer));

        notifier.emit(&1);

        assert_eq!(count.get(), 0);
    }

    #[test]
    fn detach_keeps_observer() {
        let notifier = ChangeNotifier::<u32>::new();
        let (count, observer) = counter();
        notifier.subscribe(observer).detach();

        notifier.emit(&1);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn cancel_after_notifier_dropped_is_noop() {
        let notifier = ChangeNotifier::<u32>::new();
        let (_count, observer) = counter();
        let mut sub = notifier.subscribe(observer);
        drop(notifier);

        assert!(!sub.is_active());
        sub.cancel();
    }

    #[test]
    fn clones_share_observers() {
        let notifier = ChangeNotifier::<u32>::new();
        let (count, observer) = counter();
        let _sub = notifier.subscribe(observer);

        notifier.clone().emit(&1);

        assert_eq!(count.get(), 1);
        assert_eq!(notifier.observer_count(), 1);
    }

    #[test]
    fn cancel_during_emit_skips_remaining_delivery() {
        let notifier = ChangeNotifier::<u32>::new();
        let (count, observer) = counter();
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&victim);
        let _killer = notifier.subscribe(move |_| {
            if let Some(mut sub) = slot.borrow_mut().take() {
                sub.cancel();
            }
        });
        *victim.borrow_mut() = Some(notifier.subscribe(observer));

        notifier.emit(&1);
        notifier.emit(&2);

        assert_eq!(count.get(), 0);
        assert_eq!(notifier.observer_count(), 1);
    }

    #[test]
    fn subscribe_during_emit_waits_for_next_event() {
        let notifier = ChangeNotifier::<u32>::new();
        let count = Rc::new(Cell::new(0));
        let late: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let inner = notifier.clone();
        let (seen, keep) = (Rc::clone(&count), Rc::clone(&late));
        let _adder = notifier.subscribe(move |_| {
            if keep.borrow().is_empty() {
                let seen = Rc::clone(&seen);
                let sub = inner.subscribe(move |_| seen.set(seen.get() + 1));
                keep.borrow_mut().push(sub);
            }
        });

        notifier.emit(&1);
        assert_eq!(count.get(), 0);
        notifier.emit(&2);
        assert_eq!(count.get(), 1);
        assert_eq!(notifier.observer_count(), 2);
    }
}
