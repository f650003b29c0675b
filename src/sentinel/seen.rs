use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Names already handed to the pipeline during this process's lifetime.
///
/// Grows without bound; there is no eviction.
#[derive(Debug, Default)]
pub struct SeenSet {
    names: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    pub fn add(&self, name: impl Into<String>) {
        self.lock().insert(name.into());
    }

    /// Atomic check-then-add. Returns `true` if `name` was not seen before.
    pub fn insert_if_new(&self, name: &str) -> bool {
        let mut names = self.lock();
        if names.contains(name) {
            return false;
        }
        names.insert(name.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_then_has() {
        let seen = SeenSet::new();
        assert!(seen.is_empty());

        seen.add("foo");
        assert!(seen.has("foo"));
        assert!(!seen.has("bar"));

        seen.add("bar");
        assert!(seen.has("bar"));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_insert_if_new_only_once() {
        let seen = SeenSet::new();
        assert!(seen.insert_if_new("chalk"));
        assert!(!seen.insert_if_new("chalk"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_insert_if_new_across_threads() {
        let seen = Arc::new(SeenSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| seen.insert_if_new(&format!("pkg-{i}")))
                        .count()
                })
            })
            .collect();

        let winners: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(winners, 100);
        assert_eq!(seen.len(), 100);
    }
}
