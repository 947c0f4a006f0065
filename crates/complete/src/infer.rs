//! Heuristic type inference.
//!
//! The walker hands every assignment, call and `new` it meets to the
//! routines here, which record what is known about the value's shape in
//! the root store. A value's shape is itself a [`TypeStore`]: literal
//! kinds become atomic types, object literals become nested properties,
//! and functions carry their `this`, return and parameter shapes in
//! `sources`.
//!
//! [`lookup_completions`] answers a chain query against the finished
//! store, following atomic types back to the stores of the functions that
//! produced them.

use std::collections::{HashSet, VecDeque};

use augur_core::ast::{
    Class, ClassMemberKind, Expr, ExprKind, Function, FunctionBody, PropKind, Stmt, StmtKind,
};
use augur_core::Position;

use crate::candidate::{Candidate, CompletionSet};
use crate::config::AnalysisLimits;
use crate::context::{Intent, IntentKind};
use crate::sandbox::{builtin_prototype, candidates_on, get as get_property, ObjectRef, Reflect};
use crate::scope::{member_path, Analyzer};
use crate::store::{AtomicType, TypeStore, FIRST_PARAMETER, RETURN_PROPERTIES, THIS_PROPERTIES};

/// Identifier spliced in after a trailing dot when the buffer only
/// parses with something there. Never offered as a completion.
pub const CARET_PLACEHOLDER: &str = "__augur_caret__";

// ──────────────────────────────────────────────
// Recording
// ──────────────────────────────────────────────

impl Analyzer<'_> {
    /// Declare `name` in the root store with a computed shape.
    pub(crate) fn define(&mut self, name: &str, shape: &TypeStore, weight: u32) {
        self.root.add_property(name, None, weight).merge(shape);
    }

    /// `path = value`: declare the path and fold in the value's shape.
    pub(crate) fn assign(&mut self, path: &[String], value: &Expr, weight: u32) {
        let shape = self.value_shape(value, weight);
        self.root.materialize(path, weight).merge(&shape);
    }

    /// `callee(args)`: the callee is a function, and a bare identifier
    /// passed as argument N is typed `{callee, 2 + N}`.
    pub(crate) fn type_call(&mut self, callee: &Expr, args: &[Expr], weight: u32) {
        let Some(path) = member_path(callee) else {
            return;
        };
        let origin = path.join(".");
        self.root
            .materialize(&path, weight)
            .add_type(AtomicType::function());
        for (i, arg) in args.iter().enumerate() {
            if let ExprKind::Ident(name) = &arg.kind {
                let ty = AtomicType::new(origin.clone(), FIRST_PARAMETER + i);
                self.root.add_property(name, Some(ty), weight);
            }
        }
    }

    /// `new Ctor(...)`: `Ctor` becomes a function symbol of the root
    /// store, wherever it was actually declared.
    pub(crate) fn type_constructor(&mut self, callee: &Expr, weight: u32) {
        if let Some(path) = member_path(callee) {
            self.root
                .materialize(&path, weight)
                .add_type(AtomicType::function());
        }
    }

    /// The shape of the value `expr` evaluates to. Nested object literal
    /// properties are declared with `weight`.
    pub(crate) fn value_shape(&mut self, expr: &Expr, weight: u32) -> TypeStore {
        self.shape_value(expr, weight, 0)
    }

    fn shape_value(&mut self, expr: &Expr, weight: u32, depth: usize) -> TypeStore {
        let mut shape = TypeStore::with_weight(weight);
        if depth >= self.limits.max_literal_depth {
            tracing::debug!(
                max_literal_depth = self.limits.max_literal_depth,
                "value nesting limit reached"
            );
            return shape;
        }
        match &expr.kind {
            ExprKind::Literal(lit) => {
                if let Some(name) = lit.constructor_name() {
                    shape.add_type(AtomicType::instance_of(name));
                }
            }
            ExprKind::Array(_) => shape.add_type(AtomicType::instance_of("Array")),
            ExprKind::Object(props) => {
                shape.add_type(AtomicType::instance_of("Object"));
                for prop in props {
                    let Some(name) = prop.key.name() else {
                        continue;
                    };
                    match prop.kind {
                        PropKind::Init => {
                            let child = self.shape_value(&prop.value, weight, depth + 1);
                            shape.add_property(&name, None, weight).merge(&child);
                        }
                        PropKind::Get | PropKind::Set => {
                            shape.add_property(&name, None, weight);
                        }
                    }
                }
            }
            ExprKind::New { callee, .. } => {
                if let Some(path) = member_path(callee) {
                    shape.add_type(AtomicType::instance_of(path.join(".")));
                }
                shape.add_property("constructor", Some(AtomicType::function()), weight);
            }
            ExprKind::Call { callee, .. } => match &callee.kind {
                // (function () { ... })(): the shape is known right here
                ExprKind::Function(f) => {
                    let fshape = self.function_shape(f);
                    if let Some(ret) = fshape.source(RETURN_PROPERTIES) {
                        shape.merge(ret);
                    }
                }
                _ => {
                    if let Some(path) = member_path(callee) {
                        shape.add_type(AtomicType::new(path.join("."), RETURN_PROPERTIES));
                    }
                }
            },
            ExprKind::Function(f) => shape.merge(&self.function_shape(f)),
            ExprKind::Class(class) => shape.merge(&self.class_shape(class)),
            ExprKind::Assign { value, .. } => {
                shape.merge(&self.shape_value(value, weight, depth + 1));
            }
            ExprKind::Binary { op, left, right } if matches!(*op, "||" | "??" | "&&") => {
                shape.merge(&self.shape_value(left, weight, depth + 1));
                shape.merge(&self.shape_value(right, weight, depth + 1));
            }
            ExprKind::Conditional {
                consequent,
                alternate,
                ..
            } => {
                shape.merge(&self.shape_value(consequent, weight, depth + 1));
                shape.merge(&self.shape_value(alternate, weight, depth + 1));
            }
            _ => {}
        }
        shape
    }

    // ──────────────────────────────────────────────
    // Function and class shapes
    // ──────────────────────────────────────────────

    /// What calling `f` does: `sources[0]` holds what the body assigns
    /// through `this`, `sources[1]` the shape of the returned value, and
    /// `sources[2 + N]` what the body does with parameter N.
    pub(crate) fn function_shape(&mut self, f: &Function) -> TypeStore {
        let mut shape = TypeStore::function(0);
        if self.shape_depth >= self.limits.max_shape_depth {
            tracing::debug!(
                max_shape_depth = self.limits.max_shape_depth,
                "function shape nesting limit reached"
            );
            return shape;
        }
        self.shape_depth += 1;

        match &f.body {
            FunctionBody::Block(block) => {
                let scope = self.scope_at(f, &block.body, block.span.end_pos, true);
                if let Some(this) = scope.properties.get("this") {
                    shape.source_mut(THIS_PROPERTIES).merge(this);
                }
                for (i, param) in f.params.iter().enumerate() {
                    if let Some(store) = scope.properties.get(&param.name.name) {
                        shape.source_mut(FIRST_PARAMETER + i).merge(store);
                    }
                }
                let ret = match find_return(&block.body) {
                    Some((stmt, arg)) => match &arg.kind {
                        ExprKind::Ident(name) => {
                            // the binding as it stands at the return
                            let local = self.scope_at(f, &block.body, stmt.span.end_pos, false);
                            local.properties.get(name).cloned()
                        }
                        ExprKind::This => scope.properties.get("this").cloned(),
                        _ => Some(self.value_shape(arg, 0)),
                    },
                    None => None,
                };
                if let Some(ret) = ret {
                    shape.source_mut(RETURN_PROPERTIES).merge(&ret);
                }
            }
            FunctionBody::Expr(expr) => {
                let ret = self.value_shape(expr, 0);
                shape.source_mut(RETURN_PROPERTIES).merge(&ret);
            }
        }

        self.shape_depth -= 1;
        shape
    }

    /// Walk a function body with its parameters in scope, as seen from
    /// `caret`, or through all of its blocks when `every_block` is set.
    fn scope_at(
        &mut self,
        f: &Function,
        body: &[Stmt],
        caret: Position,
        every_block: bool,
    ) -> TypeStore {
        let mut nested = self.nested(caret);
        nested.every_block = every_block;
        for param in &f.params {
            let ty = param.rest.then(|| AtomicType::instance_of("Array"));
            nested.root.add_property(&param.name.name, ty, 0);
        }
        nested.walk(body, 0);
        self.absorb(nested)
    }

    /// A class is a constructor function: instance members land in
    /// `sources[0]` or `prototype`, static members on the class itself.
    pub(crate) fn class_shape(&mut self, class: &Class) -> TypeStore {
        let mut shape = TypeStore::function(0);
        if let Some(parent) = class.super_class.as_deref().and_then(member_path) {
            shape
                .source_mut(THIS_PROPERTIES)
                .add_type(AtomicType::instance_of(parent.join(".")));
        }

        for member in &class.members {
            let Some(name) = member.key.name() else {
                continue;
            };
            match &member.kind {
                ClassMemberKind::Constructor(f) => {
                    let ctor = self.function_shape(f);
                    shape.merge(&ctor);
                }
                ClassMemberKind::Method(f) => {
                    let method = self.function_shape(f);
                    member_holder(&mut shape, member.is_static)
                        .add_property(&name, None, 0)
                        .merge(&method);
                }
                ClassMemberKind::Get(_) | ClassMemberKind::Set(_) => {
                    member_holder(&mut shape, member.is_static).add_property(&name, None, 0);
                }
                ClassMemberKind::Field(init) => {
                    let value = match init {
                        Some(init) => self.value_shape(init, 0),
                        None => TypeStore::new(),
                    };
                    let holder = if member.is_static {
                        &mut shape
                    } else {
                        shape.source_mut(THIS_PROPERTIES)
                    };
                    holder.add_property(&name, None, 0).merge(&value);
                }
            }
        }
        shape
    }
}

/// Where a method or accessor lives: the class itself when static,
/// otherwise its prototype.
fn member_holder(shape: &mut TypeStore, is_static: bool) -> &mut TypeStore {
    if is_static {
        shape
    } else {
        shape.add_property("prototype", None, 0)
    }
}

/// First `return <expr>` in `body`, looking through nested statements
/// but not into nested functions.
fn find_return(body: &[Stmt]) -> Option<(&Stmt, &Expr)> {
    let mut stack: Vec<&Stmt> = body.iter().rev().collect();
    while let Some(stmt) = stack.pop() {
        match &stmt.kind {
            StmtKind::Return(Some(arg)) => return Some((stmt, arg)),
            StmtKind::Block(block) => stack.extend(block.body.iter().rev()),
            StmtKind::If {
                consequent,
                alternate,
                ..
            } => {
                if let Some(alt) = alternate {
                    stack.push(alt);
                }
                stack.push(consequent);
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                if let Some(fin) = finalizer {
                    stack.extend(fin.body.iter().rev());
                }
                if let Some(catch) = handler {
                    stack.extend(catch.body.body.iter().rev());
                }
                stack.extend(block.body.iter().rev());
            }
            StmtKind::For { body, .. }
            | StmtKind::ForIn { body, .. }
            | StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::Labeled { body, .. } => stack.push(body),
            StmtKind::Switch { cases, .. } => {
                for case in cases.iter().rev() {
                    stack.extend(case.body.iter().rev());
                }
            }
            _ => {}
        }
    }
    None
}

// ──────────────────────────────────────────────
// Lookup
// ──────────────────────────────────────────────

/// Somewhere property names can come from.
#[derive(Clone, Copy)]
enum Holder<'a> {
    Static(&'a TypeStore),
    Builtin(ObjectRef),
}

/// Complete `intent` against an analyzed store.
///
/// The chain is resolved over a set of stores: at every segment each
/// store contributes its own child of that name, and each of its atomic
/// types contributes the producing function's matching `sources` slot
/// (plus `prototype` for instances). Built-in origins resolve to their
/// prototype in `sandbox`, when one is given.
pub fn lookup_completions(
    root: &TypeStore,
    intent: &Intent,
    sandbox: Option<&dyn Reflect>,
    limits: &AnalysisLimits,
) -> CompletionSet {
    let chain = intent.lookup_chain();
    let parents = &chain[..chain.len().saturating_sub(1)];
    let prefix = intent.prefix();

    let mut frontier = match intent.kind {
        IntentKind::Identifier | IntentKind::Property => vec![Holder::Static(root)],
        IntentKind::String => {
            type_holders(root, &AtomicType::instance_of("String"), sandbox, limits)
        }
        IntentKind::Regex => {
            type_holders(root, &AtomicType::instance_of("RegExp"), sandbox, limits)
        }
    };

    for segment in parents {
        let mut next = Vec::new();
        for holder in expand(root, frontier, sandbox, limits) {
            match holder {
                Holder::Static(store) => {
                    if let Some(child) = store.properties.get(segment) {
                        next.push(Holder::Static(child));
                    }
                }
                Holder::Builtin(obj) => {
                    let found = sandbox.and_then(|r| get_property(r, obj, segment, limits));
                    if let Some(found) = found {
                        next.push(Holder::Builtin(found));
                    }
                }
            }
        }
        if next.is_empty() {
            return CompletionSet::new();
        }
        frontier = next;
    }

    let holders = expand(root, frontier, sandbox, limits);
    let mut set = CompletionSet::new();
    for holder in &holders {
        if let Holder::Static(store) = holder {
            for (name, child) in &store.properties {
                if offerable(name, prefix) {
                    set.insert(Candidate::new(name.as_str(), prefix, i64::from(child.weight)));
                }
            }
        }
    }
    if let Some(reflect) = sandbox {
        for holder in &holders {
            if let Holder::Builtin(obj) = holder {
                set.meld(candidates_on(reflect, *obj, prefix, limits));
            }
        }
    }
    set
}

fn offerable(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len()
        && name.starts_with(prefix)
        && name != CARET_PLACEHOLDER
        && augur_core::is_identifier_name(name)
}

/// The holders in `start` plus everything reachable through atomic
/// types, breadth first, each type followed once.
fn expand<'a>(
    root: &'a TypeStore,
    start: Vec<Holder<'a>>,
    sandbox: Option<&dyn Reflect>,
    limits: &AnalysisLimits,
) -> Vec<Holder<'a>> {
    let mut out = Vec::new();
    let mut seen: HashSet<AtomicType> = HashSet::new();
    let mut queue: VecDeque<(Holder<'a>, usize)> = start.into_iter().map(|h| (h, 0)).collect();

    while let Some((holder, depth)) = queue.pop_front() {
        out.push(holder);
        let Holder::Static(store) = holder else {
            continue;
        };
        if depth >= limits.max_shape_depth {
            continue;
        }
        for ty in store.ty.iter() {
            if !seen.insert(ty.clone()) {
                continue;
            }
            for next in type_holders(root, &ty, sandbox, limits) {
                queue.push_back((next, depth + 1));
            }
        }
    }
    out
}

/// Where the properties of a value of type `ty` are found.
fn type_holders<'a>(
    root: &'a TypeStore,
    ty: &AtomicType,
    sandbox: Option<&dyn Reflect>,
    limits: &AnalysisLimits,
) -> Vec<Holder<'a>> {
    let mut holders = Vec::new();
    if let Some(origin) = root.get(&ty.origin_path()) {
        if let Some(source) = origin.source(ty.index) {
            holders.push(Holder::Static(source));
        }
        if ty.index == THIS_PROPERTIES {
            if let Some(proto) = origin.properties.get("prototype") {
                holders.push(Holder::Static(proto));
            }
        }
    }
    if ty.index == THIS_PROPERTIES {
        let builtin = sandbox.and_then(|r| builtin_prototype(r, &ty.origin, limits));
        if let Some(obj) = builtin {
            holders.push(Holder::Builtin(obj));
        }
    }
    holders
}
