//! Abstract‑syntax‑tree node definitions.
//!
//! Expressions and statements are closed sum types; every consumer (printer,
//! resolver, interpreter) matches on them exhaustively.  Nodes are immutable
//! once the parser builds them.
//!
//! Nodes that name a binding (`Variable`, `Assign`, `This`, `Super`) carry an
//! [`ExprId`].  The resolver keys its hop‑count table by that id, so two
//! textually identical expressions at different positions stay distinct.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Identity of a resolvable expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

impl ExprId {
    /// Allocate an id never handed out before in this process.  Ids stay
    /// unique across interactive lines, whose closures may outlive the line.
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// A read of a named binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: ExprId,
    pub name: Token,
}

impl Variable {
    pub fn new(name: Token) -> Self {
        Self {
            id: ExprId::fresh(),
            name,
        }
    }
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression: `!isReady` or `-42`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix binary operator expression: `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    Variable(Variable),

    /// Assignment to a named binding: `name = value`.
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `cond ? then : else`, or the elvis shorthand `cond ?: else` when
    /// `then_branch` is absent.
    Ternary {
        condition: Box<Expr>,
        then_branch: Option<Box<Expr>>,
        else_branch: Box<Expr>,
    },

    /// Function‑ or method‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get {
        object: Box<Expr>,
        name: Token,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        keyword: Token,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

impl Expr {
    /// Best line to attribute an error in this expression to.
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(_) => 0,
            Expr::Unary { operator, .. } => operator.line,
            Expr::Binary { operator, .. } => operator.line,
            Expr::Grouping(expr) => expr.line(),
            Expr::Variable(var) => var.name.line,
            Expr::Assign { name, .. } => name.line,
            Expr::Logical { operator, .. } => operator.line,
            Expr::Ternary { condition, .. } => condition.line(),
            Expr::Call { paren, .. } => paren.line,
            Expr::Get { name, .. } => name.line,
            Expr::Set { name, .. } => name.line,
            Expr::This { keyword, .. } => keyword.line,
            Expr::Super { keyword, .. } => keyword.line,
        }
    }
}

/// A function or method declaration.  Shared (`Rc`) between the statement
/// tree and every closure created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (at most 8).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// **Abstract‑Syntax‑Tree node** for *statements*.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// The only looping construct.  A `for` loop is desugared into this form:
    /// `initializer` runs once in its own scope and `increment` runs after
    /// every iteration, including one cut short by `continue`.
    While {
        condition: Expr,
        body: Box<Stmt>,
        initializer: Option<Box<Stmt>>,
        increment: Option<Box<Stmt>>,
    },

    Function(Rc<FunctionDecl>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Break(Token),

    Continue(Token),

    Class {
        name: Token,
        superclass: Option<Variable>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
