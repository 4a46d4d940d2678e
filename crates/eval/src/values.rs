//! Value providers: where a function reads the values of its parameters.

use std::collections::{BTreeMap, HashMap};

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

/// Supplies the current value of a logical field identifier.
///
/// `None` means the identifier has no value; functions treat that as the
/// empty string.
pub trait ValueProvider {
    fn value(&self, id: &str) -> Option<String>;
}

impl ValueProvider for BTreeMap<String, String> {
    fn value(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

impl ValueProvider for HashMap<String, String> {
    fn value(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

impl<P: ValueProvider + ?Sized> ValueProvider for &P {
    fn value(&self, id: &str) -> Option<String> {
        (**self).value(id)
    }
}

// ──────────────────────────────────────────────
// Broadcast
// ──────────────────────────────────────────────

/// Answers every identifier with the same value.
///
/// Used for fields that predate per-parameter wiring: the single value typed
/// into such a field is fed to every parameter of its transformation.
#[derive(Debug, Clone, Copy)]
pub struct Broadcast<'a>(pub &'a str);

impl ValueProvider for Broadcast<'_> {
    fn value(&self, _id: &str) -> Option<String> {
        Some(self.0.to_owned())
    }
}

// ──────────────────────────────────────────────
// Overlay
// ──────────────────────────────────────────────

/// Bound values first, then the underlying provider.
pub struct Overlay<'a> {
    bound: &'a BTreeMap<String, String>,
    base: &'a dyn ValueProvider,
}

impl<'a> Overlay<'a> {
    pub fn new(bound: &'a BTreeMap<String, String>, base: &'a dyn ValueProvider) -> Self {
        Overlay { bound, base }
    }
}

impl ValueProvider for Overlay<'_> {
    fn value(&self, id: &str) -> Option<String> {
        self.bound.get(id).cloned().or_else(|| self.base.value(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_answers_everything() {
        let b = Broadcast("x");
        assert_eq!(b.value("a").as_deref(), Some("x"));
        assert_eq!(b.value("zzz").as_deref(), Some("x"));
    }

    #[test]
    fn overlay_prefers_bound_values() {
        let mut base = BTreeMap::new();
        base.insert("a".to_string(), "base-a".to_string());
        base.insert("b".to_string(), "base-b".to_string());
        let mut bound = BTreeMap::new();
        bound.insert("a".to_string(), "bound-a".to_string());
        let o = Overlay::new(&bound, &base);
        assert_eq!(o.value("a").as_deref(), Some("bound-a"));
        assert_eq!(o.value("b").as_deref(), Some("base-b"));
        assert_eq!(o.value("c"), None);
    }
}
