//! Completion candidates and the ordered, de-duplicated set that holds
//! them.

use indexmap::IndexMap;
use serde::Serialize;

/// One completion offered to the user.
///
/// Two candidates are the same completion when their `display` strings
/// match; `prefix` and `score` do not take part in equality.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Full text shown in the list.
    pub display: String,
    /// Already-typed text the completion replaces.
    pub prefix: String,
    /// Higher sorts first. Static analysis scores are non-negative,
    /// sandbox candidates score -1 and keywords score below that.
    pub score: i64,
}

impl Candidate {
    pub fn new(display: impl Into<String>, prefix: impl Into<String>, score: i64) -> Self {
        Candidate {
            display: display.into(),
            prefix: prefix.into(),
            score,
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.display == other.display
    }
}

impl Eq for Candidate {}

/// Insertion-ordered candidates keyed by display text. The first
/// candidate inserted for a display string is kept.
#[derive(Debug, Clone, Default)]
pub struct CompletionSet {
    items: IndexMap<String, Candidate>,
}

impl CompletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless a candidate with the same display text exists.
    /// Returns whether the candidate was added.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if self.items.contains_key(&candidate.display) {
            return false;
        }
        self.items.insert(candidate.display.clone(), candidate);
        true
    }

    /// Merge `other` in without overwriting existing entries.
    pub fn meld(&mut self, other: CompletionSet) {
        for (_, candidate) in other.items {
            self.insert(candidate);
        }
    }

    /// Stable sort by descending score.
    pub fn sort(&mut self) {
        self.items.sort_by(|_, a, _, b| b.score.cmp(&a.score));
    }

    pub fn get(&self, display: &str) -> Option<&Candidate> {
        self.items.get(display)
    }

    pub fn contains(&self, display: &str) -> bool {
        self.items.contains_key(display)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.values()
    }

    pub fn displays(&self) -> Vec<&str> {
        self.items.keys().map(String::as_str).collect()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.items.into_values().collect()
    }
}

impl Serialize for CompletionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.values())
    }
}

impl FromIterator<Candidate> for CompletionSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = CompletionSet::new();
        for candidate in iter {
            set.insert(candidate);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let mut set = CompletionSet::new();
        assert!(set.insert(Candidate::new("bar", "b", 3)));
        assert!(!set.insert(Candidate::new("bar", "b", -1)));
        assert_eq!(set.get("bar").map(|c| c.score), Some(3));
    }

    #[test]
    fn meld_keeps_existing_entries() {
        let mut first: CompletionSet = [Candidate::new("a", "", 0)].into_iter().collect();
        let second: CompletionSet = [Candidate::new("a", "", 9), Candidate::new("b", "", -1)]
            .into_iter()
            .collect();
        first.meld(second);
        assert_eq!(first.displays(), ["a", "b"]);
        assert_eq!(first.get("a").map(|c| c.score), Some(0));
    }

    #[test]
    fn sort_is_stable_and_descending() {
        let mut set: CompletionSet = [
            Candidate::new("x", "", -1),
            Candidate::new("y", "", 2),
            Candidate::new("z", "", -1),
            Candidate::new("w", "", 2),
        ]
        .into_iter()
        .collect();
        set.sort();
        assert_eq!(set.displays(), ["y", "w", "x", "z"]);
    }

    #[test]
    fn serializes_as_a_list() {
        let set: CompletionSet = [Candidate::new("bar", "b", 0)].into_iter().collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0]["display"], "bar");
        assert_eq!(json[0]["prefix"], "b");
    }
}
