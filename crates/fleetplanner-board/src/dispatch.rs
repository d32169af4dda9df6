//! `WorkerDispatch`: the trait surface a key-value/queue backend for worker
//! dispatch would implement. No networked implementation ships here, only
//! the in-memory test double used by this crate's own tests.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

/// Mirrors a `{push, pop, set, lrange, llen}` list/hash queue contract.
pub trait WorkerDispatch {
    fn push(&self, key: &str, value: String);
    fn pop(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn get(&self, key: &str) -> Option<String>;
    fn lrange(&self, key: &str, start: usize, stop: usize) -> Vec<String>;
    fn llen(&self, key: &str) -> usize;
}

/// `HashMap`-backed test double. Never used outside tests.
#[derive(Default)]
pub struct InMemoryDispatch {
    strings: Mutex<HashMap<String, String>>,
    lists: Mutex<HashMap<String, VecDeque<String>>>,
}

impl InMemoryDispatch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkerDispatch for InMemoryDispatch {
    fn push(&self, key: &str, value: String) {
        self.lists.lock().entry(key.to_string()).or_default().push_back(value);
    }

    fn pop(&self, key: &str) -> Option<String> {
        self.lists.lock().get_mut(key)?.pop_front()
    }

    fn set(&self, key: &str, value: String) {
        self.strings.lock().insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<String> {
        self.strings.lock().get(key).cloned()
    }

    fn lrange(&self, key: &str, start: usize, stop: usize) -> Vec<String> {
        let lists = self.lists.lock();
        let Some(list) = lists.get(key) else { return Vec::new() };
        list.iter().skip(start).take(stop.saturating_sub(start) + 1).cloned().collect()
    }

    fn llen(&self, key: &str) -> usize {
        self.lists.lock().get(key).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_fifo() {
        let dispatch = InMemoryDispatch::new();
        dispatch.push("workers:w1:pending", "task-a".into());
        dispatch.push("workers:w1:pending", "task-b".into());
        assert_eq!(dispatch.llen("workers:w1:pending"), 2);
        assert_eq!(dispatch.pop("workers:w1:pending"), Some("task-a".into()));
        assert_eq!(dispatch.llen("workers:w1:pending"), 1);
    }

    #[test]
    fn set_get_roundtrip() {
        let dispatch = InMemoryDispatch::new();
        dispatch.set("workers:w1", "{}".into());
        assert_eq!(dispatch.get("workers:w1"), Some("{}".into()));
        assert_eq!(dispatch.get("workers:missing"), None);
    }

    #[test]
    fn lrange_returns_inclusive_window() {
        let dispatch = InMemoryDispatch::new();
        for v in ["a", "b", "c", "d"] {
            dispatch.push("k", v.into());
        }
        assert_eq!(dispatch.lrange("k", 1, 2), vec!["b".to_string(), "c".to_string()]);
    }
}
