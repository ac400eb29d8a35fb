use std::collections::HashMap;

/// Insertion-ordered string table mapping labels to dense ids.
#[derive(Debug, Default, Clone)]
pub struct Quark {
    v: Vec<String>,
    m: HashMap<String, usize>,
}

impl Quark {
    pub fn to_id(&self, s: &str) -> Option<usize> {
        self.m.get(s).copied()
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    pub fn find_or_insert(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.m.get(key) {
            return idx;
        }
        let idx = self.v.len();
        self.m.insert(key.to_string(), idx);
        self.v.push(key.to_string());
        idx
    }

    /// Inserts `key` only if it is new. Returns `None` when the key already exists.
    pub fn insert_new(&mut self, key: &str) -> Option<usize> {
        if self.m.contains_key(key) {
            return None;
        }
        Some(self.find_or_insert(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.v.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_str() {
        let mut quark = Quark::default();
        for (s, id) in [("zero", 0), ("one", 1), ("two", 2), ("three", 3), ("two", 2), ("one", 1), ("zero", 0), ("four", 4)] {
            assert_eq!(id, quark.find_or_insert(s), "{} != {}", s, id);
        }
    }

    #[test]
    fn find_id() {
        let mut quark = Quark::default();
        quark.find_or_insert("zero");
        quark.find_or_insert("one");
        assert_eq!(quark.to_id("zero"), Some(0));
        assert_eq!(quark.to_id("one"), Some(1));
        assert_eq!(quark.to_id("two"), None);
        assert_eq!(quark.len(), 2);
        assert!(!quark.is_empty());
    }

    #[test]
    fn insert_new_rejects_existing() {
        let mut quark = Quark::default();
        assert_eq!(quark.insert_new("JOHN"), Some(0));
        assert_eq!(quark.insert_new("MARY"), Some(1));
        assert_eq!(quark.insert_new("JOHN"), None);
        assert_eq!(quark.iter().collect::<Vec<_>>(), ["JOHN", "MARY"]);
    }
}
