//! A completion session: the last good analysis of one editor buffer.
//!
//! The session owns the published [`TypeStore`] and replaces it wholesale
//! whenever a rebuild parses successfully. A failed parse leaves the
//! previous store in place, so once anything has been analyzed there is
//! always a store to answer from.
//!
//! Parsing may also run on the tokio blocking pool: [`Session::spawn_parse`]
//! starts it and [`Session::apply`] publishes the result, unless a newer
//! rebuild was requested in the meantime.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use augur_core::ast::Program;
use augur_core::{LineIndex, Position, SyntaxError};
use tokio::task::JoinHandle;

use crate::candidate::CompletionSet;
use crate::config::{EngineConfig, RebuildPolicy};
use crate::context::{contextualize, Intent, IntentKind};
use crate::error::EngineError;
use crate::infer::CARET_PLACEHOLDER;
use crate::rank::rank;
use crate::sandbox::Reflect;
use crate::scope::analyze_scope;
use crate::store::TypeStore;

/// A sandbox shared with background tasks.
pub type SharedSandbox = Arc<dyn Reflect + Send + Sync>;

/// What an analysis was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnalysisKey {
    source_hash: u64,
    caret: Position,
}

impl AnalysisKey {
    fn new(source: &str, caret: Position) -> Self {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        AnalysisKey {
            source_hash: hasher.finish(),
            caret,
        }
    }
}

pub struct Session {
    config: EngineConfig,
    sandbox: Option<SharedSandbox>,
    store: Option<Arc<TypeStore>>,
    /// Key of the last rebuild attempt, successful or not.
    analyzed: Option<AnalysisKey>,
    /// Newest rebuild requested; older background results are dropped.
    requested: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Session {
            config,
            sandbox: None,
            store: None,
            analyzed: None,
            requested: 0,
        }
    }

    /// Attach a live object graph for dynamic completion.
    pub fn with_sandbox(mut self, sandbox: SharedSandbox) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The published store, if any analysis has succeeded yet.
    pub fn store(&self) -> Option<Arc<TypeStore>> {
        self.store.clone()
    }

    /// Number of rebuilds requested so far.
    pub fn version(&self) -> u64 {
        self.requested
    }

    /// Ranked completions at `caret`. Never fails: a caret with no
    /// completion context yields an empty set, and an unparseable buffer
    /// is answered from the last good analysis.
    pub fn complete(&mut self, source: &str, caret: Position) -> CompletionSet {
        let Some(intent) = contextualize(source, caret) else {
            tracing::trace!(%caret, "no completion context at caret");
            return CompletionSet::new();
        };
        let key = AnalysisKey::new(source, caret);
        if self.needs_rebuild(key) {
            self.rebuild(source, caret, Some(&intent));
        }
        self.rank(&intent)
    }

    /// Like [`Session::complete`], but a caret that does not lie in the
    /// buffer is an error rather than an empty result.
    pub fn try_complete(
        &mut self,
        source: &str,
        caret: Position,
    ) -> Result<CompletionSet, EngineError> {
        check_caret(source, caret)?;
        Ok(self.complete(source, caret))
    }

    /// Rebuild the store for `source` now, whatever the rebuild policy.
    pub fn invalidate_cache(&mut self, source: &str, caret: Position) {
        let intent = contextualize(source, caret);
        self.rebuild(source, caret, intent.as_ref());
    }

    fn needs_rebuild(&self, key: AnalysisKey) -> bool {
        match self.config.rebuild {
            RebuildPolicy::OnChange => self.analyzed != Some(key),
            RebuildPolicy::OnInvalidate => self.store.is_none() && self.analyzed != Some(key),
        }
    }

    fn rebuild(&mut self, source: &str, caret: Position, intent: Option<&Intent>) {
        self.requested += 1;
        self.analyzed = Some(AnalysisKey::new(source, caret));
        match parse_repaired(source, caret, intent) {
            Ok(program) => self.publish(&program, caret),
            Err(err) => {
                tracing::debug!(%err, version = self.requested, "parse failed; keeping previous analysis");
            }
        }
    }

    fn publish(&mut self, program: &Program, caret: Position) {
        let root = analyze_scope(&program.body, caret, &self.config.limits);
        tracing::debug!(
            version = self.requested,
            symbols = root.properties.len(),
            "type store rebuilt"
        );
        self.store = Some(Arc::new(root));
    }

    fn rank(&self, intent: &Intent) -> CompletionSet {
        let sandbox = self
            .sandbox
            .as_deref()
            .filter(|_| self.config.sandbox)
            .map(|s| s as &dyn Reflect);
        rank(
            intent,
            self.store.as_deref(),
            sandbox,
            self.config.keywords,
            &self.config.limits,
        )
    }

    // ──────────────────────────────────────────────
    // Background rebuilds
    // ──────────────────────────────────────────────

    /// Parse `source` on the blocking pool. Must be called from within a
    /// tokio runtime. The returned handle becomes stale as soon as another
    /// rebuild is requested.
    pub fn spawn_parse(&mut self, source: &str, caret: Position) -> PendingParse {
        self.requested += 1;
        let version = self.requested;
        let key = AnalysisKey::new(source, caret);
        let intent = contextualize(source, caret);
        let text = source.to_owned();
        let handle =
            tokio::task::spawn_blocking(move || parse_repaired(&text, caret, intent.as_ref()));
        tracing::debug!(version, "background parse started");
        PendingParse {
            version,
            key,
            caret,
            handle,
        }
    }

    /// Wait for a background parse and publish its analysis. Returns
    /// whether the store was replaced: stale results and unparseable
    /// buffers leave it as it was. A parse failure is only an error while
    /// there is no earlier analysis to fall back on.
    pub async fn apply(&mut self, pending: PendingParse) -> Result<bool, EngineError> {
        let PendingParse {
            version,
            key,
            caret,
            handle,
        } = pending;
        let parsed = handle
            .await
            .map_err(|err| EngineError::Worker(err.to_string()))?;

        if version != self.requested {
            tracing::debug!(
                version,
                latest = self.requested,
                "discarding stale background parse"
            );
            return Ok(false);
        }

        self.analyzed = Some(key);
        match parsed {
            Ok(program) => {
                self.publish(&program, caret);
                Ok(true)
            }
            Err(err) if self.store.is_none() => Err(err.into()),
            Err(err) => {
                tracing::debug!(%err, version, "background parse failed; keeping previous analysis");
                Ok(false)
            }
        }
    }
}

/// A parse running on the blocking pool.
pub struct PendingParse {
    version: u64,
    key: AnalysisKey,
    caret: Position,
    handle: JoinHandle<Result<Program, SyntaxError>>,
}

impl PendingParse {
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Fail with [`EngineError::InvalidCaret`] unless `caret` lies in
/// `source` (end of a line included).
pub fn check_caret(source: &str, caret: Position) -> Result<(), EngineError> {
    match LineIndex::new(source).offset_of(source, caret) {
        Some(_) => Ok(()),
        None => Err(EngineError::InvalidCaret {
            line: caret.line,
            column: caret.column,
        }),
    }
}

/// Parse `source`; if that fails right after a trailing dot, retry once
/// with a placeholder name at the caret (`foo.` → `foo.__augur_caret__`).
/// The original error is reported when both attempts fail.
fn parse_repaired(
    source: &str,
    caret: Position,
    intent: Option<&Intent>,
) -> Result<Program, SyntaxError> {
    let err = match augur_core::parse(source) {
        Ok(program) => return Ok(program),
        Err(err) => err,
    };
    if intent.map(|i| i.kind) != Some(IntentKind::Property) {
        return Err(err);
    }
    let Some(offset) = LineIndex::new(source).offset_of(source, caret) else {
        return Err(err);
    };
    let mut repaired = String::with_capacity(source.len() + CARET_PLACEHOLDER.len());
    repaired.push_str(&source[..offset]);
    repaired.push_str(CARET_PLACEHOLDER);
    repaired.push_str(&source[offset..]);
    tracing::debug!(%err, "retrying parse with a placeholder at the caret");
    augur_core::parse(&repaired).map_err(|_| err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_of(source: &str) -> Position {
        let index = LineIndex::new(source);
        let last = index.line_count() as u32 - 1;
        let start = index.line_start(last).unwrap();
        Position::new(last, source[start..].chars().count() as u32)
    }

    #[test]
    fn trailing_dot_is_repaired() {
        let src = "var o = { a: 1 };\no.";
        let intent = contextualize(src, end_of(src));
        assert!(augur_core::parse(src).is_err());
        assert!(parse_repaired(src, end_of(src), intent.as_ref()).is_ok());
    }

    #[test]
    fn repair_is_only_attempted_after_a_dot() {
        let src = "var o = {";
        let intent = contextualize(src, end_of(src));
        let err = parse_repaired(src, end_of(src), intent.as_ref()).unwrap_err();
        assert_eq!(err.position.line, 0);
    }

    #[test]
    fn same_key_does_not_rebuild() {
        let mut session = Session::default();
        let src = "var alpha = 1;\nal";
        session.complete(src, end_of(src));
        session.complete(src, end_of(src));
        assert_eq!(session.version(), 1);
        session.complete(src, Position::new(1, 1));
        assert_eq!(session.version(), 2);
    }

    #[test]
    fn on_invalidate_policy_waits_for_invalidation() {
        let config = EngineConfig {
            rebuild: RebuildPolicy::OnInvalidate,
            ..EngineConfig::default()
        };
        let mut session = Session::new(config);
        let first = "var alpha = 1;\nal";
        assert!(session.complete(first, end_of(first)).contains("alpha"));

        let second = "var alpha = 1; var almond = 2;\nal";
        assert!(!session.complete(second, end_of(second)).contains("almond"));
        session.invalidate_cache(second, end_of(second));
        assert!(session.complete(second, end_of(second)).contains("almond"));
    }

    #[test]
    fn invalid_caret_is_reported_in_strict_mode() {
        let mut session = Session::default();
        let err = session.try_complete("foo", Position::new(3, 0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCaret { line: 3, column: 0 }));
        assert_eq!(err.to_string(), "caret 4:1 is outside the buffer");
        assert!(session.complete("foo", Position::new(3, 0)).is_empty());
    }
}
