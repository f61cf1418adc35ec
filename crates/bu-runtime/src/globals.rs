//! Store des variables globales.
//!
//! Presence is explicit: a global bound to `false`, `0`, `""` or `nil` is defined.

use bu_core::Value;
use indexmap::IndexMap;

/// Name → value store used by `GET_GLOBAL`, `DEFINE_GLOBAL` and `SET_GLOBAL`.
pub trait GlobalStore {
    /// Binds a new name; `false` if it is already bound (the old value stays).
    fn define(&mut self, name: &str, value: Value) -> bool;
    /// Current value, `None` if never defined.
    fn get(&self, name: &str) -> Option<Value>;
    /// Rebinds an existing name; `false` if it was never defined.
    fn assign(&mut self, name: &str, value: Value) -> bool;
}

/// Single-owner store, iterated in definition order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Globals {
    vars: IndexMap<String, Value>,
}

impl Globals {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of defined globals.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when nothing is defined.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// True if `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Borrowed lookup.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// `(name, value)` pairs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Forgets every binding.
    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

impl GlobalStore for Globals {
    fn define(&mut self, name: &str, value: Value) -> bool {
        if self.vars.contains_key(name) {
            return false;
        }
        self.vars.insert(name.to_owned(), value);
        true
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.vars.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl<G: GlobalStore + ?Sized> GlobalStore for &mut G {
    fn define(&mut self, name: &str, value: Value) -> bool {
        (**self).define(name, value)
    }
    fn get(&self, name: &str) -> Option<Value> {
        (**self).get(name)
    }
    fn assign(&mut self, name: &str, value: Value) -> bool {
        (**self).assign(name, value)
    }
}

/* ─────────────────────────── Store partagé ─────────────────────────── */

#[cfg(feature = "sync")]
pub use shared::SharedGlobals;

#[cfg(feature = "sync")]
mod shared {
    use std::sync::Arc;

    use bu_core::Value;
    use parking_lot::Mutex;

    use super::{GlobalStore, Globals};

    /// Store shared by several VMs; each operation holds one lock.
    #[derive(Debug, Clone, Default)]
    pub struct SharedGlobals(Arc<Mutex<Globals>>);

    impl SharedGlobals {
        /// Empty shared store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Copy of the current bindings.
        pub fn snapshot(&self) -> Globals {
            self.0.lock().clone()
        }

        /// Runs `f` with the store locked.
        pub fn with<R>(&self, f: impl FnOnce(&mut Globals) -> R) -> R {
            f(&mut self.0.lock())
        }
    }

    impl From<Globals> for SharedGlobals {
        fn from(g: Globals) -> Self {
            Self(Arc::new(Mutex::new(g)))
        }
    }

    impl GlobalStore for SharedGlobals {
        fn define(&mut self, name: &str, value: Value) -> bool {
            self.0.lock().define(name, value)
        }
        fn get(&self, name: &str) -> Option<Value> {
            self.0.lock().get(name)
        }
        fn assign(&mut self, name: &str, value: Value) -> bool {
            self.0.lock().assign(name, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn define_twice_keeps_first_value() {
        let mut g = Globals::new();
        assert!(g.define("x", Value::Int(1)));
        assert!(!g.define("x", Value::Int(2)));
        assert_eq!(g.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn assign_requires_definition() {
        let mut g = Globals::new();
        assert!(!g.assign("y", Value::Int(1)));
        assert!(!g.contains("y"));
        g.define("y", Value::Nil);
        assert!(g.assign("y", Value::Int(1)));
        assert_eq!(g.value("y"), Some(&Value::Int(1)));
    }

    #[test]
    fn absent_is_not_falsy() {
        let mut g = Globals::new();
        assert_eq!(g.get("z"), None);
        g.define("f", Value::Bool(false));
        g.define("zero", Value::Int(0));
        g.define("empty", Value::from(""));
        assert_eq!(g.get("f"), Some(Value::Bool(false)));
        assert_eq!(g.get("zero"), Some(Value::Int(0)));
        assert_eq!(g.get("empty"), Some(Value::from("")));
        let names: Vec<&str> = g.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["f", "zero", "empty"]);
    }

    #[cfg(feature = "sync")]
    #[test]
    fn shared_store_is_seen_by_every_handle() {
        let a = SharedGlobals::new();
        let mut b = a.clone();
        assert!(b.define("n", Value::Int(3)));
        let mut a2 = a.clone();
        assert!(!a2.define("n", Value::Int(4)));
        assert_eq!(a.get("n"), Some(Value::Int(3)));
        assert_eq!(a.with(|g| g.len()), 1);
        assert_eq!(a.snapshot().value("n"), Some(&Value::Int(3)));
    }

    #[cfg(feature = "sync")]
    #[test]
    fn shared_store_across_threads() {
        let store = SharedGlobals::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mut s = store.clone();
                std::thread::spawn(move || s.define("winner", Value::Int(i)))
            })
            .collect();
        let wins = handles.into_iter().map(|h| h.join().unwrap()).filter(|w| *w).count();
        assert_eq!(wins, 1);
    }
}
