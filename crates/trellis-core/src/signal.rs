use std::cell::RefCell;
use std::rc::Rc;

use crate::effects::Effect;

pub type SubId = usize;

/// Observable value cell. Stands in for the reactive engine at the scope
/// boundary: watchers built on it are plain [`Effect`]s, so scopes own them
/// without knowing anything about subscriptions.
pub struct Signal<T: 'static>(Rc<RefCell<Inner<T>>>);

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

struct Inner<T> {
    value: T,
    // Slot per subscription; cleared slots keep later ids stable.
    subs: Vec<Option<Box<dyn Fn(&T)>>>,
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            value,
            subs: Vec::new(),
        })))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().value.clone()
    }

    pub fn set(&self, value: T) {
        self.0.borrow_mut().value = value;
        self.notify();
    }

    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        f(&mut self.0.borrow_mut().value);
        self.notify();
    }

    fn notify(&self) {
        let inner = self.0.borrow();
        for sub in inner.subs.iter().flatten() {
            sub(&inner.value);
        }
    }

    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        let mut inner = self.0.borrow_mut();
        inner.subs.push(Some(Box::new(f)));
        inner.subs.len() - 1
    }

    /// Drops the subscription. Unknown ids are ignored; ids are not reused.
    pub fn unsubscribe(&self, id: SubId) {
        if let Some(slot) = self.0.borrow_mut().subs.get_mut(id) {
            slot.take();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.borrow().subs.iter().flatten().count()
    }
}

pub fn signal<T>(t: T) -> Signal<T> {
    Signal::new(t)
}

/// Subscribes `f` to `signal` for as long as the returned [`Effect`] lives.
///
/// The effect's constructor hands it to the current scope, so watchers
/// created under a running scope unsubscribe automatically when that scope
/// is stopped.
pub fn watch<T: 'static>(signal: &Signal<T>, f: impl Fn(&T) + 'static) -> Effect {
    let sub = signal.subscribe(f);
    let signal = signal.clone();
    Effect::new(move || signal.unsubscribe(sub))
}
