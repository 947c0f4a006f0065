//! Merging the three candidate sources into one ranked list.

use crate::candidate::CompletionSet;
use crate::config::AnalysisLimits;
use crate::context::{Intent, IntentKind};
use crate::infer::lookup_completions;
use crate::keywords::keyword_completions;
use crate::sandbox::{sandbox_completions, Reflect};
use crate::store::TypeStore;

/// Static analysis first, then the sandbox, then keywords (single-segment
/// identifiers only). Earlier sources win display-string collisions; the
/// result is sorted by descending score.
pub fn rank(
    intent: &Intent,
    static_store: Option<&TypeStore>,
    sandbox: Option<&dyn Reflect>,
    keywords: bool,
    limits: &AnalysisLimits,
) -> CompletionSet {
    let mut set = CompletionSet::new();
    if let Some(store) = static_store {
        set.meld(lookup_completions(store, intent, sandbox, limits));
    }
    if let Some(reflect) = sandbox {
        set.meld(sandbox_completions(reflect, intent, limits));
    }
    if keywords && intent.kind == IntentKind::Identifier && intent.chain.len() == 1 {
        set.meld(keyword_completions(intent.prefix()));
    }
    set.sort();
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ObjectGraph, SANDBOX_SCORE};
    use augur_core::parse;

    fn store(src: &str) -> TypeStore {
        let program = parse(src).unwrap();
        crate::analyze_scope(&program.body, program.span.end_pos, &AnalysisLimits::default())
    }

    fn ident(chain: &[&str]) -> Intent {
        Intent::new(
            IntentKind::Identifier,
            chain.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn static_candidates_shadow_sandbox_and_keywords() {
        // `this` is reserved, so a declared `thisValue` is the only static hit
        let root = store("var thisValue = 1; var Mathy = 2; var Math = {};");
        let graph = ObjectGraph::ecmascript();
        let sandbox: Option<&dyn Reflect> = Some(&graph);

        let set = rank(&ident(&["th"]), Some(&root), sandbox, true, &AnalysisLimits::default());
        assert_eq!(set.displays(), ["thisValue", "this", "throw"]);

        let set = rank(&ident(&["Mat"]), Some(&root), sandbox, true, &AnalysisLimits::default());
        assert_eq!(set.get("Math").unwrap().score, 0);
        assert_eq!(set.get("Mathy").unwrap().score, 0);
    }

    #[test]
    fn keywords_only_for_single_segments() {
        let set = rank(&ident(&["a", "t"]), None, None, true, &AnalysisLimits::default());
        assert!(set.is_empty());
        let set = rank(&ident(&["t"]), None, None, false, &AnalysisLimits::default());
        assert!(set.is_empty());
    }

    #[test]
    fn result_is_sorted_by_score() {
        let root = store("var parseLater = 1;");
        let graph = ObjectGraph::ecmascript();
        let set = rank(
            &ident(&["pa"]),
            Some(&root),
            Some(&graph as &dyn Reflect),
            true,
            &AnalysisLimits::default(),
        );
        let scores: Vec<_> = set.iter().map(|c| c.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(set.displays()[0], "parseLater");
        assert_eq!(set.get("parseInt").unwrap().score, SANDBOX_SCORE);
    }
}
