//! Intermediate representation produced by the parser.
//!
//! Nodes are plain owned trees: every expression is owned by exactly one
//! parent and nothing is shared or mutated after parsing.

use serde::Serialize;

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    /// Integer as written in the template
    Integer(String),
    /// Decimal as written in the template
    Double(String),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Identical,
    NotIdentical,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    /// `a is b` where `b` is not a test name
    Is,
    /// `a is not b` where `b` is not a test name
    IsNot,
    In,
    NotIn,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Right-hand side of a `.` access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Member {
    /// `a.b`
    Named(String),
    /// `a.(b.c)`
    Computed(Box<Expr>),
}

/// The filter part of `expr|filter`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FilterName {
    /// `expr|name` or `expr|name(args)`
    Named(String),
    /// `expr|(a - 1)`: rejected at generation time
    Computed(Box<Expr>),
}

/// A call or filter argument; named when written as `name: value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

impl Arg {
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }
}

/// Expressions (literals, operators, access chains, calls, filters, tests).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(Literal),
    Variable(String),
    Index(Box<Expr>, Box<Expr>),
    Slice {
        base: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    Property(Box<Expr>, Member),
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Range(Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    /// Key/value pairs in source order
    Map(Vec<(Expr, Expr)>),
    Filter {
        expr: Box<Expr>,
        filter: FilterName,
        args: Vec<Arg>,
        line: usize,
    },
    Test {
        expr: Box<Expr>,
        test: String,
        args: Option<Vec<Arg>>,
        negated: bool,
    },
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Parenthesised sub-expression, kept so output preserves the grouping
    Group(Box<Expr>),
}

impl Expr {
    /// Name of a plain function call such as `content()`.
    pub fn call_name(&self) -> Option<&str> {
        match self {
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::Variable(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Compound assignment operator of a `set` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// Bare name, index path or property path
    pub target: Expr,
    pub op: AssignOp,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroParam {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForLoop {
    pub key: Option<String>,
    pub value: String,
    pub iterable: Expr,
    /// Trailing `if <cond>` evaluated per iteration
    pub filter: Option<Expr>,
    pub body: Vec<Stmt>,
    /// Runs when the iterable yields nothing
    pub else_body: Option<Vec<Stmt>>,
    pub has_break: bool,
    pub has_continue: bool,
}

/// Statements (text, output, control flow, inheritance).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    RawText(String),
    Print(Expr),
    If {
        /// `if` and `elseif` branches in order
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
    },
    For(ForLoop),
    Set(Vec<Assignment>),
    Do(Expr),
    Block {
        name: String,
        body: Vec<Stmt>,
    },
    Extends {
        path: Expr,
        line: usize,
    },
    Include {
        path: Expr,
        params: Option<Expr>,
        line: usize,
    },
    Cache {
        key: Expr,
        lifetime: Option<Expr>,
        body: Vec<Stmt>,
    },
    Autoescape {
        enabled: bool,
        body: Vec<Stmt>,
    },
    Macro {
        name: String,
        params: Vec<MacroParam>,
        body: Vec<Stmt>,
    },
    Return(Expr),
    Break,
    Continue,
}

/// A parsed template: its top-level statements in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Template {
    pub body: Vec<Stmt>,
}

impl Template {
    /// The `extends` target, when the template is a child template.
    pub fn extends(&self) -> Option<(&Expr, usize)> {
        match self.body.first() {
            Some(Stmt::Extends { path, line }) => Some((path, *line)),
            _ => None,
        }
    }
}
