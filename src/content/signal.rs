use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Callback<T> = Box<dyn FnOnce(&T)>;

struct SignalState<T> {
    value: Option<T>,
    callbacks: Vec<Callback<T>>,
}

/// Single-resolution notification slot.
///
/// Clones observe the same slot. Resolving a second time is ignored.
pub struct Signal<T> {
    inner: Rc<RefCell<SignalState<T>>>,
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalState {
                value: None,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Stores `value` and runs pending callbacks. Returns `false` if already resolved.
    pub fn resolve(&self, value: T) -> bool {
        let callbacks = {
            let mut state = self.inner.borrow_mut();
            if state.value.is_some() {
                return false;
            }
            state.value = Some(value.clone());
            std::mem::take(&mut state.callbacks)
        };
        for callback in callbacks {
            callback(&value);
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.borrow().value.is_some()
    }

    pub fn get(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    /// Runs `callback` once the signal resolves, or immediately if it already has.
    pub fn on_resolve(&self, callback: impl FnOnce(&T) + 'static) {
        let resolved = self.inner.borrow().value.clone();
        match resolved {
            Some(value) => callback(&value),
            None => self.inner.borrow_mut().callbacks.push(Box::new(callback)),
        }
    }
}

impl<T: Clone + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.inner.borrow().value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn resolves_once() {
        let signal = Signal::new();
        assert!(signal.resolve(1));
        assert!(!signal.resolve(2));
        assert_eq!(signal.get(), Some(1));
    }

    #[test]
    fn callbacks_run_exactly_once() {
        let signal = Signal::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        signal.on_resolve(move |v: &u32| c.set(c.get() + *v));
        signal.resolve(5);
        signal.resolve(7);
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn late_observer_sees_value_immediately() {
        let signal = Signal::new();
        signal.resolve("done");
        let seen = Rc::new(Cell::new(false));
        let s = seen.clone();
        signal.clone().on_resolve(move |v| s.set(*v == "done"));
        assert!(seen.get());
    }
}
