//! JavaScript syntax tree produced by the parser.
//!
//! The tree keeps only what completion analysis looks at: names, literal
//! kinds, structure, and a [`Span`] on every statement and expression.
//! Operators are kept as their source text.

use crate::span::Span;

// ──────────────────────────────────────────────
// Program and statements
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Var {
        kind: VarKind,
        decls: Vec<VarDeclarator>,
    },
    Function(Function),
    Class(Class),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Block),
    Expr(Expr),
    Try {
        block: Block,
        handler: Option<CatchClause>,
        finalizer: Option<Block>,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `for (left in right)` and, with `of` set, `for (left of right)`
    ForIn {
        left: ForInit,
        right: Expr,
        body: Box<Stmt>,
        of: bool,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Throw(Expr),
    Break(Option<String>),
    Continue(Option<String>),
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Empty,
    Debugger,
}

/// A braced statement list.
#[derive(Debug, Clone)]
pub struct Block {
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VarDeclarator {
    pub id: Ident,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Var {
        kind: VarKind,
        decls: Vec<VarDeclarator>,
        span: Span,
    },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Ident>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

// ──────────────────────────────────────────────
// Functions and classes
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Function {
    pub id: Option<Ident>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Expr>,
    pub rest: bool,
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Block),
    /// Concise arrow body: `x => x + 1`
    Expr(Box<Expr>),
}

impl FunctionBody {
    pub fn span(&self) -> Span {
        match self {
            FunctionBody::Block(b) => b.span,
            FunctionBody::Expr(e) => e.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Class {
    pub id: Option<Ident>,
    pub super_class: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
    /// Span of the `{ ... }` class body
    pub body_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub key: PropKey,
    pub is_static: bool,
    pub kind: ClassMemberKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ClassMemberKind {
    Constructor(Function),
    Method(Function),
    Get(Function),
    Set(Function),
    /// `name = init;` field declaration
    Field(Option<Expr>),
}

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    /// Template literal, kept as raw text
    Template(String),
    Regex { pattern: String, flags: String },
}

impl Literal {
    /// Name of the built-in constructor whose instances this literal
    /// evaluates to, when it has one.
    pub fn constructor_name(&self) -> Option<&'static str> {
        match self {
            Literal::Null => None,
            Literal::Bool(_) => Some("Boolean"),
            Literal::Num(_) => Some("Number"),
            Literal::Str(_) | Literal::Template(_) => Some("String"),
            Literal::Regex { .. } => Some("RegExp"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(String),
    This,
    Super,
    Literal(Literal),
    /// Elements; `None` marks a hole (`[a, , b]`)
    Array(Vec<Option<Expr>>),
    Object(Vec<Property>),
    Function(Box<Function>),
    Class(Box<Class>),
    Unary {
        op: &'static str,
        arg: Box<Expr>,
    },
    Update {
        op: &'static str,
        prefix: bool,
        arg: Box<Expr>,
    },
    Binary {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: &'static str,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    Sequence(Vec<Expr>),
    Spread(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum MemberProp {
    Name(Ident),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Num(f64),
    Computed(Box<Expr>),
}

impl PropKey {
    /// The property name as a string, when it is statically known.
    pub fn name(&self) -> Option<String> {
        match self {
            PropKey::Ident(s) | PropKey::Str(s) => Some(s.clone()),
            PropKey::Num(n) => Some(format_number(*n)),
            PropKey::Computed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Init,
    Get,
    Set,
}

#[derive(Debug, Clone)]
pub struct Property {
    pub key: PropKey,
    pub value: Expr,
    pub kind: PropKind,
    pub span: Span,
}

/// Render a number the way JavaScript's `String(n)` does for the values
/// that appear as object keys.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_render_like_javascript() {
        assert_eq!(PropKey::Num(1.0).name().as_deref(), Some("1"));
        assert_eq!(PropKey::Num(1.5).name().as_deref(), Some("1.5"));
    }

    #[test]
    fn literal_constructor_names() {
        assert_eq!(Literal::Str("a".into()).constructor_name(), Some("String"));
        assert_eq!(
            Literal::Regex {
                pattern: "a".into(),
                flags: String::new()
            }
            .constructor_name(),
            Some("RegExp")
        );
        assert_eq!(Literal::Null.constructor_name(), None);
    }
}
