//! Observer lists.
//!
//! [`TaskObserver`] / [`ObserverSubject`] fan task events out to every
//! registered observer. [`Multicast`] is the value-returning variant: each
//! callback runs in registration order and every return value is collected,
//! instead of only the last one surviving.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::task::TaskEvent;

/// Observer trait for receiving task events.
pub trait TaskObserver: Send + Sync {
    /// Receive an event. Called from worker threads.
    fn on_event(&self, event: &TaskEvent);
}

/// Subject that manages a collection of observers.
pub struct ObserverSubject {
    observers: RwLock<Vec<Arc<dyn TaskObserver>>>,
}

impl ObserverSubject {
    /// Create a new subject with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer.
    pub fn register(&self, observer: Arc<dyn TaskObserver>) {
        self.observers.write().push(observer);
    }

    /// Unregister all observers.
    pub fn clear(&self) {
        self.observers.write().clear();
    }

    /// Notify all observers, in registration order.
    pub fn notify(&self, event: &TaskEvent) {
        let observers = self.observers.read();
        for observer in observers.iter() {
            observer.on_event(event);
        }
    }

    /// Get the number of registered observers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.observers.read().len()
    }
}

impl Default for ObserverSubject {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskObserver for ObserverSubject {
    fn on_event(&self, event: &TaskEvent) {
        self.notify(event);
    }
}

type Callback<A, R> = Box<dyn Fn(&A) -> R + Send + Sync>;

/// Ordered list of named callbacks whose results are all collected.
///
/// ```
/// use taskbatch_core::observer::Multicast;
///
/// let ops: Multicast<(f64, f64), f64> = Multicast::new();
/// ops.subscribe("add", |&(a, b)| a + b);
/// ops.subscribe("mul", |&(a, b)| a * b);
/// assert_eq!(ops.invoke(&(3.0, 4.0)), vec![7.0, 12.0]);
/// ```
pub struct Multicast<A, R> {
    callbacks: RwLock<Vec<(String, Callback<A, R>)>>,
}

impl<A, R> Multicast<A, R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Append a callback. Names need not be unique.
    pub fn subscribe<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        self.callbacks.write().push((name.into(), Box::new(callback)));
    }

    /// Remove the most recently added callback named `name`.
    pub fn unsubscribe(&self, name: &str) -> bool {
        let mut callbacks = self.callbacks.write();
        match callbacks.iter().rposition(|(n, _)| n == name) {
            Some(index) => {
                callbacks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Run every callback in registration order and collect the results.
    pub fn invoke(&self, args: &A) -> Vec<R> {
        self.callbacks.read().iter().map(|(_, f)| f(args)).collect()
    }

    /// Like [`Multicast::invoke`], pairing each result with its callback name.
    pub fn invoke_named(&self, args: &A) -> Vec<(String, R)> {
        self.callbacks
            .read()
            .iter()
            .map(|(name, f)| (name.clone(), f(args)))
            .collect()
    }

    /// Registered callback names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.callbacks.read().iter().map(|(n, _)| n.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    pub fn clear(&self) {
        self.callbacks.write().clear();
    }
}

impl<A, R> Default for Multicast<A, R> {
    fn default() -> Self {
        Self::new()
    }
}
