//! The scope walker.
//!
//! Builds a [`TypeStore`] for a statement list by walking it with an
//! explicit stack. Declarations are always recorded, but a nested block
//! (function body, branch, loop body, call arguments, ...) is only entered
//! when the caret lies inside it. Every symbol is declared in one flat
//! root store with a weight equal to the nesting depth it was found at.

use augur_core::ast::{
    Block, Class, ClassMemberKind, Expr, ExprKind, ForInit, Function, FunctionBody, MemberProp,
    Stmt, StmtKind, VarDeclarator,
};
use augur_core::{Position, Span};

use crate::config::AnalysisLimits;
use crate::store::{AtomicType, TypeStore};

/// Analyze `body` as seen from `caret` and return the root store.
///
/// The same routine answers "what does this function build" for the
/// inference engine, by analyzing a function body with the caret at its
/// end.
pub fn analyze_scope(body: &[Stmt], caret: Position, limits: &AnalysisLimits) -> TypeStore {
    let mut analyzer = Analyzer::new(caret, limits);
    analyzer.walk(body, 0);
    analyzer.root
}

#[derive(Clone, Copy)]
enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

pub(crate) struct Analyzer<'l> {
    pub(crate) root: TypeStore,
    pub(crate) caret: Position,
    pub(crate) limits: &'l AnalysisLimits,
    /// Nodes visited so far, shared with nested analyses.
    pub(crate) steps: usize,
    /// Nesting of function-shape sub-analyses.
    pub(crate) shape_depth: usize,
    /// Enter every block, not just those around the caret. Nested
    /// functions still need the caret.
    pub(crate) every_block: bool,
    exhausted: bool,
}

impl<'l> Analyzer<'l> {
    pub(crate) fn new(caret: Position, limits: &'l AnalysisLimits) -> Self {
        Analyzer {
            root: TypeStore::new(),
            caret,
            limits,
            steps: 0,
            shape_depth: 0,
            every_block: false,
            exhausted: false,
        }
    }

    /// A fresh analyzer for a sub-problem, sharing this one's step budget
    /// and shape depth. Hand it back with [`Analyzer::absorb`].
    pub(crate) fn nested(&self, caret: Position) -> Analyzer<'l> {
        Analyzer {
            root: TypeStore::new(),
            caret,
            limits: self.limits,
            steps: self.steps,
            shape_depth: self.shape_depth,
            every_block: false,
            exhausted: self.exhausted,
        }
    }

    /// Take back the budget a nested analyzer spent; returns its store.
    pub(crate) fn absorb(&mut self, nested: Analyzer<'l>) -> TypeStore {
        self.steps = nested.steps;
        self.exhausted |= nested.exhausted;
        nested.root
    }

    fn inside(&self, span: Span) -> bool {
        span.contains(self.caret)
    }

    /// Whether a block, branch or loop body at `span` is walked.
    fn enters(&self, span: Span) -> bool {
        self.every_block || self.inside(span)
    }

    // ──────────────────────────────────────────────
    // Walk
    // ──────────────────────────────────────────────

    pub(crate) fn walk(&mut self, body: &[Stmt], depth: u32) {
        let mut stack: Vec<(Node<'_>, u32)> = Vec::new();
        push_stmts(&mut stack, body, depth);

        while let Some((node, depth)) = stack.pop() {
            if self.exhausted {
                return;
            }
            self.steps += 1;
            if self.steps > self.limits.max_walk_steps {
                tracing::warn!(
                    max_walk_steps = self.limits.max_walk_steps,
                    "scope walk step limit reached; keeping partial results"
                );
                self.exhausted = true;
                return;
            }
            match node {
                Node::Stmt(stmt) => self.visit_stmt(stmt, depth, &mut stack),
                Node::Expr(expr) => self.visit_expr(expr, depth, &mut stack),
            }
        }
    }

    fn visit_stmt<'a>(&mut self, stmt: &'a Stmt, depth: u32, stack: &mut Vec<(Node<'a>, u32)>) {
        match &stmt.kind {
            StmtKind::Var { decls, .. } => self.declare_all(decls, depth, stack),
            StmtKind::Function(f) => {
                if let Some(id) = &f.id {
                    let shape = self.function_shape(f);
                    self.define(&id.name, &shape, depth);
                }
                self.enter_function(f, depth, stack);
            }
            StmtKind::Class(class) => {
                if let Some(id) = &class.id {
                    let shape = self.class_shape(class);
                    self.define(&id.name, &shape, depth);
                }
                self.enter_class(class, depth, stack);
            }
            StmtKind::Return(Some(arg)) | StmtKind::Throw(arg) | StmtKind::Expr(arg) => {
                stack.push((Node::Expr(arg), depth));
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                // Branches are siblings; only the one holding the caret is entered.
                if let Some(alt) = alternate {
                    self.enter_stmt(alt, depth, stack);
                }
                self.enter_stmt(consequent, depth, stack);
                stack.push((Node::Expr(test), depth));
            }
            StmtKind::Block(block) => self.enter_block(block, depth, stack),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                if let Some(fin) = finalizer {
                    self.enter_block(fin, depth, stack);
                }
                if let Some(catch) = handler {
                    if self.enters(catch.body.span) {
                        if let Some(param) = &catch.param {
                            self.root.add_property(&param.name, None, depth + 1);
                        }
                        push_stmts(stack, &catch.body.body, depth + 1);
                    }
                }
                self.enter_block(block, depth, stack);
            }
            StmtKind::For { init, body, .. } => {
                self.enter_stmt(body, depth, stack);
                match init {
                    Some(ForInit::Var { decls, .. }) => self.declare_all(decls, depth, stack),
                    Some(ForInit::Expr(expr)) => stack.push((Node::Expr(expr), depth)),
                    None => {}
                }
            }
            StmtKind::ForIn {
                left, body, of, ..
            } => {
                self.enter_stmt(body, depth, stack);
                if let ForInit::Var { decls, .. } = left {
                    for decl in decls {
                        // for-in keys are strings; for-of values are unknown
                        let ty = (!*of).then(|| AtomicType::instance_of("String"));
                        self.root.add_property(&decl.id.name, ty, depth);
                    }
                }
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
                self.enter_stmt(body, depth, stack);
            }
            StmtKind::Switch { cases, .. } => {
                for case in cases.iter().rev() {
                    if self.enters(case.span) {
                        push_stmts(stack, &case.body, depth + 1);
                    }
                }
            }
            StmtKind::Labeled { body, .. } => stack.push((Node::Stmt(body), depth)),
            StmtKind::Return(None)
            | StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Empty
            | StmtKind::Debugger => {}
        }
    }

    fn visit_expr<'a>(&mut self, expr: &'a Expr, depth: u32, stack: &mut Vec<(Node<'a>, u32)>) {
        match &expr.kind {
            ExprKind::Assign { target, value, .. } => {
                if let Some(path) = member_path(target) {
                    self.assign(&path, value, depth);
                }
                stack.push((Node::Expr(value), depth));
            }
            ExprKind::Call { callee, args, .. } => {
                self.type_call(callee, args, depth);
                if self.inside(expr.span) {
                    push_exprs(stack, args, depth);
                }
                stack.push((Node::Expr(callee), depth));
            }
            ExprKind::New { callee, args } => {
                self.type_constructor(callee, depth);
                if self.inside(expr.span) {
                    push_exprs(stack, args, depth);
                }
            }
            ExprKind::Function(f) => {
                // a function expression's own name is only bound inside it
                if let Some(id) = f.id.as_ref().filter(|_| self.inside(f.body.span())) {
                    let shape = self.function_shape(f);
                    self.define(&id.name, &shape, depth + 1);
                }
                self.enter_function(f, depth, stack);
            }
            ExprKind::Class(class) => {
                if let Some(id) = class.id.as_ref().filter(|_| self.inside(class.body_span)) {
                    let shape = self.class_shape(class);
                    self.define(&id.name, &shape, depth + 1);
                }
                self.enter_class(class, depth, stack);
            }
            ExprKind::Object(props) => {
                if self.inside(expr.span) {
                    for prop in props.iter().rev() {
                        stack.push((Node::Expr(&prop.value), depth));
                    }
                }
            }
            ExprKind::Array(elements) => {
                if self.inside(expr.span) {
                    for element in elements.iter().rev().flatten() {
                        stack.push((Node::Expr(element), depth));
                    }
                }
            }
            ExprKind::Member { object, .. } => stack.push((Node::Expr(object), depth)),
            ExprKind::Sequence(exprs) => push_exprs(stack, exprs, depth),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                stack.push((Node::Expr(alternate), depth));
                stack.push((Node::Expr(consequent), depth));
                stack.push((Node::Expr(test), depth));
            }
            ExprKind::Binary { left, right, .. } => {
                stack.push((Node::Expr(right), depth));
                stack.push((Node::Expr(left), depth));
            }
            ExprKind::Unary { arg, .. } | ExprKind::Spread(arg) => {
                stack.push((Node::Expr(arg), depth));
            }
            ExprKind::Ident(_)
            | ExprKind::This
            | ExprKind::Super
            | ExprKind::Literal(_)
            | ExprKind::Update { .. } => {}
        }
    }

    // ──────────────────────────────────────────────
    // Descent
    // ──────────────────────────────────────────────

    /// Declaration lists are walked at the current depth whether or not
    /// the caret is inside them.
    fn declare_all<'a>(
        &mut self,
        decls: &'a [VarDeclarator],
        depth: u32,
        stack: &mut Vec<(Node<'a>, u32)>,
    ) {
        for decl in decls {
            let path = [decl.id.name.clone()];
            match &decl.init {
                Some(init) => self.assign(&path, init, depth),
                None => {
                    self.root.add_property(&decl.id.name, None, depth);
                }
            }
        }
        for decl in decls.iter().rev() {
            if let Some(init) = &decl.init {
                stack.push((Node::Expr(init), depth));
            }
        }
    }

    /// Enter a branch or loop body holding the caret, one level deeper.
    fn enter_stmt<'a>(&mut self, stmt: &'a Stmt, depth: u32, stack: &mut Vec<(Node<'a>, u32)>) {
        if !self.enters(stmt.span) {
            return;
        }
        match &stmt.kind {
            StmtKind::Block(block) => push_stmts(stack, &block.body, depth + 1),
            _ => stack.push((Node::Stmt(stmt), depth + 1)),
        }
    }

    fn enter_block<'a>(&mut self, block: &'a Block, depth: u32, stack: &mut Vec<(Node<'a>, u32)>) {
        if self.enters(block.span) {
            push_stmts(stack, &block.body, depth + 1);
        }
    }

    /// Parameters and body of a function holding the caret.
    fn enter_function<'a>(
        &mut self,
        f: &'a Function,
        depth: u32,
        stack: &mut Vec<(Node<'a>, u32)>,
    ) {
        if !self.inside(f.body.span()) {
            return;
        }
        tracing::trace!(depth = depth + 1, "entering function body");
        for param in &f.params {
            let ty = param.rest.then(|| AtomicType::instance_of("Array"));
            self.root.add_property(&param.name.name, ty, depth + 1);
        }
        match &f.body {
            FunctionBody::Block(block) => push_stmts(stack, &block.body, depth + 1),
            FunctionBody::Expr(expr) => stack.push((Node::Expr(expr), depth + 1)),
        }
    }

    fn enter_class<'a>(&mut self, class: &'a Class, depth: u32, stack: &mut Vec<(Node<'a>, u32)>) {
        if !self.inside(class.body_span) {
            return;
        }
        for member in class.members.iter().rev() {
            match &member.kind {
                ClassMemberKind::Constructor(f)
                | ClassMemberKind::Method(f)
                | ClassMemberKind::Get(f)
                | ClassMemberKind::Set(f) => self.enter_function(f, depth, stack),
                ClassMemberKind::Field(Some(init)) => {
                    if self.inside(init.span) {
                        stack.push((Node::Expr(init), depth + 1));
                    }
                }
                ClassMemberKind::Field(None) => {}
            }
        }
    }
}

fn push_stmts<'a>(stack: &mut Vec<(Node<'a>, u32)>, stmts: &'a [Stmt], depth: u32) {
    for stmt in stmts.iter().rev() {
        stack.push((Node::Stmt(stmt), depth));
    }
}

fn push_exprs<'a>(stack: &mut Vec<(Node<'a>, u32)>, exprs: &'a [Expr], depth: u32) {
    for expr in exprs.iter().rev() {
        stack.push((Node::Expr(expr), depth));
    }
}

/// `a.b.c` → `["a", "b", "c"]`, `this.x` → `["this", "x"]`. `None` for
/// anything with a computed or non-name segment.
pub(crate) fn member_path(expr: &Expr) -> Option<Vec<String>> {
    let mut path = Vec::new();
    let mut current = expr;
    loop {
        match &current.kind {
            ExprKind::Ident(name) => {
                path.push(name.clone());
                break;
            }
            ExprKind::This => {
                path.push("this".to_owned());
                break;
            }
            ExprKind::Member {
                object,
                property: MemberProp::Name(id),
                ..
            } => {
                path.push(id.name.clone());
                current = object;
            }
            _ => return None,
        }
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_core::parse;

    fn scope(src: &str, caret: Position) -> TypeStore {
        let program = parse(src).unwrap();
        analyze_scope(&program.body, caret, &AnalysisLimits::default())
    }

    fn names(store: &TypeStore) -> Vec<&str> {
        store.properties.keys().map(String::as_str).collect()
    }

    #[test]
    fn declarations_are_recorded_at_depth_zero() {
        let root = scope("var a = 1, b; let c = 'x';", Position::new(0, 0));
        assert_eq!(names(&root), ["a", "b", "c"]);
        assert!(root.properties["a"].ty.contains_origin("Number"));
        assert!(root.properties["c"].ty.contains_origin("String"));
        assert!(root.properties.values().all(|s| s.weight == 0));
    }

    #[test]
    fn function_bodies_are_entered_only_around_the_caret() {
        let src = "function f(p) {\n  var inner = 1;\n}\nvar after = 2;";
        let outside = scope(src, Position::new(3, 0));
        assert!(outside.properties.contains_key("f"));
        assert!(!outside.properties.contains_key("p"));
        assert!(!outside.properties.contains_key("inner"));

        let inside = scope(src, Position::new(1, 5));
        assert_eq!(inside.properties["p"].weight, 1);
        assert_eq!(inside.properties["inner"].weight, 1);
        assert!(inside.properties.contains_key("after"));
    }

    #[test]
    fn only_the_branch_holding_the_caret_is_entered() {
        let src = "if (x) {\n  var yes = 1;\n} else {\n  var no = 2;\n}";
        let root = scope(src, Position::new(1, 3));
        assert!(root.properties.contains_key("yes"));
        assert!(!root.properties.contains_key("no"));
    }

    #[test]
    fn catch_parameter_and_loop_variables() {
        let src = "for (var i = 0; i < 3; i++) {}\nfor (var k in o) {}\ntry { a(); } catch (err) {\n  err\n}";
        let root = scope(src, Position::new(3, 4));
        assert!(root.properties.contains_key("i"));
        assert!(root.properties["k"].ty.contains_origin("String"));
        assert_eq!(root.properties["err"].weight, 1);
    }

    #[test]
    fn this_assignments_are_paths() {
        let root = scope("this.el = {}; this.el.id = 'a';", Position::new(0, 0));
        let el = root.get(&["this".into(), "el".into()]).unwrap();
        assert!(el.ty.contains_origin("Object"));
        assert!(el.properties["id"].ty.contains_origin("String"));
    }

    #[test]
    fn call_arguments_are_entered_around_the_caret() {
        let src = "run(function (cb) {\n  var local = 1;\n});";
        let root = scope(src, Position::new(1, 2));
        assert!(root.properties.contains_key("cb"));
        assert!(root.properties.contains_key("local"));
        assert!(root.properties["run"].is_function());
    }

    #[test]
    fn expression_names_are_bound_only_inside() {
        let src = "var f = function g() {\n  return 1;\n};\nvar C = class K {};";
        let outside = scope(src, Position::new(3, 0));
        assert_eq!(names(&outside), ["f", "C"]);

        let inside = scope(src, Position::new(1, 2));
        assert!(inside.properties["g"].is_function());
        assert_eq!(inside.properties["g"].weight, 1);
        assert!(!inside.properties.contains_key("K"));
    }

    #[test]
    fn step_limit_keeps_partial_results() {
        let src = "var a = 1; var b = 2; var c = 3; var d = 4;";
        let program = parse(src).unwrap();
        let limits = AnalysisLimits {
            max_walk_steps: 2,
            ..AnalysisLimits::default()
        };
        let root = analyze_scope(&program.body, Position::new(0, 0), &limits);
        assert!(root.properties.contains_key("a"));
        assert!(!root.properties.contains_key("d"));
    }

    #[test]
    fn member_paths() {
        let program = parse("a.b.c; this.x; a[0].b; f().g;").unwrap();
        let paths: Vec<_> = program
            .body
            .iter()
            .map(|s| match &s.kind {
                StmtKind::Expr(e) => member_path(e),
                _ => None,
            })
            .collect();
        assert_eq!(paths[0], Some(vec!["a".to_string(), "b".into(), "c".into()]));
        assert_eq!(paths[1], Some(vec!["this".to_string(), "x".into()]));
        assert_eq!(paths[2], None);
        assert_eq!(paths[3], None);
    }
}
