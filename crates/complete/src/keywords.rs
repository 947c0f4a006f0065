//! JavaScript keyword candidates.

use crate::candidate::{Candidate, CompletionSet};

/// Keywords ordered by how often they appear in real-world scripts, most
/// common first.
pub static KEYWORDS: &[&str] = &[
    "this",
    "function",
    "return",
    "var",
    "if",
    "else",
    "true",
    "false",
    "null",
    "new",
    "typeof",
    "for",
    "const",
    "let",
    "in",
    "undefined",
    "break",
    "case",
    "while",
    "instanceof",
    "throw",
    "catch",
    "try",
    "delete",
    "switch",
    "default",
    "class",
    "continue",
    "of",
    "do",
    "void",
    "finally",
    "extends",
    "super",
    "static",
    "debugger",
    "with",
];

/// Score of the keyword at frequency rank `rank`. Always below the
/// sandbox score, closer to zero for more frequent keywords.
pub fn keyword_score(rank: usize) -> i64 {
    -(rank as i64 + 2)
}

/// Keywords extending `prefix` (the prefix itself excluded).
pub fn keyword_completions(prefix: &str) -> CompletionSet {
    KEYWORDS
        .iter()
        .enumerate()
        .filter(|(_, kw)| kw.len() > prefix.len() && kw.starts_with(prefix))
        .map(|(rank, kw)| Candidate::new(*kw, prefix, keyword_score(rank)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::SANDBOX_SCORE;

    #[test]
    fn frequent_keywords_score_higher() {
        let set = keyword_completions("t");
        assert_eq!(set.displays(), ["this", "true", "typeof", "throw", "try"]);
        let scores: Vec<_> = set.iter().map(|c| c.score).collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
        assert!(scores.iter().all(|&s| s < SANDBOX_SCORE));
    }

    #[test]
    fn exact_keyword_is_not_offered() {
        let set = keyword_completions("in");
        assert_eq!(set.displays(), ["instanceof"]);
    }
}
