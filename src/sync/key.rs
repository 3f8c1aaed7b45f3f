use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a protected resource.
///
/// Equality is pointer identity: two keys built from structurally equal
/// values are still different resources. Clone the key (or build it from the
/// same `Arc`) to name the same resource from several call sites.
#[derive(Clone)]
pub struct ResourceKey {
    value: Arc<dyn Any + Send + Sync>,
    label: Option<Arc<str>>,
}

impl ResourceKey {
    /// Wrap a fresh value as a new, distinct resource identity.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            label: None,
        }
    }

    /// Use an existing shared value as the resource identity.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self { value, label: None }
    }

    /// A fresh resource identity carrying a human-readable label for logs.
    pub fn named(label: impl Into<String>) -> Self {
        let label: Arc<str> = Arc::from(label.into());
        Self {
            value: Arc::new(Arc::clone(&label)),
            label: Some(label),
        }
    }

    /// Borrow the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.value) as *const () as usize
    }
}

impl PartialEq for ResourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ResourceKey {}

impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.addr());
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "ResourceKey({label:?}@{:#x})", self.addr()),
            None => write!(f, "ResourceKey({:#x})", self.addr()),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => f.write_str(label),
            None => write!(f, "{:#x}", self.addr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equal_values_are_distinct_keys() {
        let a = ResourceKey::new(String::from("X"));
        let b = ResourceKey::new(String::from("X"));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_from_arc_shares_identity() {
        let shared = Arc::new(42u32);
        let a = ResourceKey::from_arc(Arc::clone(&shared));
        let b = ResourceKey::from_arc(shared);
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_named_key_display_and_downcast() {
        let key = ResourceKey::named("orders");
        assert_eq!(key.to_string(), "orders");
        assert_eq!(key.label(), Some("orders"));
        assert!(key.downcast_ref::<u32>().is_none());

        let key = ResourceKey::new(7u32);
        assert_eq!(key.downcast_ref::<u32>(), Some(&7));
    }
}
