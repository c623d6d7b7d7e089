//! The IL Abstract Syntax Tree (AST).
//!
//! Two tagged-variant node families, [`Expr`] and [`Stmt`], each carrying the
//! source locations of the construct. The `Display` implementations print
//! valid IL source, so a parsed tree can be dumped, diffed by the optimizer
//! reporter, and parsed back.

use std::fmt::{self, Display, Write};

use crate::types::Type;
use crate::utils::{escape_str, Join, Location};

/// The root AST node: the ordered sequence of top-level statements.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub start: Location,
    pub end: Location,
}

/// Kind of statement.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    VarDecl {
        name: String,
        ty: Type,
        init: Option<Box<Expr>>,
    },
    /// `var a: array [n] t`. The type is always [`Type::Array`].
    ArrayDecl { name: String, ty: Type },
    TypeDecl { name: String, ty: Type },
    RoutineDecl {
        name: String,
        params: Vec<Parameter>,
        return_type: Option<Type>,
        body: Vec<Stmt>,
    },
    /// `x := e`, `a[i] := e` or `r.f := e`; a dotted target keeps its
    /// `record.field` spelling.
    Assignment {
        target: String,
        index: Option<Box<Expr>>,
        value: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        condition: Box<Expr>,
        body: Vec<Stmt>,
    },
    For {
        variable: String,
        reverse: bool,
        from: Box<Expr>,
        to: Box<Expr>,
        body: Vec<Stmt>,
    },
    Print { value: Box<Expr> },
    Read { variable: String },
    Return { value: Option<Box<Expr>> },
    RoutineCall { name: String, args: Vec<Expr> },
}

/// A routine parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

/// An expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub start: Location,
    pub end: Location,
}

/// Kind of expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Integer(i32),
    Real(f64),
    Boolean(bool),
    Str(String),
    Var(String),
    ArrayAccess { name: String, index: Box<Expr> },
    RecordAccess { record: String, field: String },
    Unary { op: UnOp, operand: Box<Expr> },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Call { name: String, args: Vec<Expr> },
    Cast { expr: Box<Expr>, target: Type },
}

/// Unary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    /// "-"
    Neg,
    /// "not"
    Not,
}

/// Binary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Xor)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }
}

impl Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "not"),
        }
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "=",
            BinOp::Ne => "/=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        };
        write!(f, "{s}")
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Integer(value) => write!(f, "{value}"),
            ExprKind::Real(value) => write!(f, "{value:?}"),
            ExprKind::Boolean(value) => write!(f, "{value}"),
            ExprKind::Str(value) => write!(f, "\"{}\"", escape_str(value)),
            ExprKind::Var(name) => write!(f, "{name}"),
            ExprKind::ArrayAccess { name, index } => write!(f, "{name}[{index}]"),
            ExprKind::RecordAccess { record, field } => write!(f, "{record}.{field}"),
            ExprKind::Unary { op: UnOp::Not, operand } => write!(f, "not {operand}"),
            ExprKind::Unary { op: UnOp::Neg, operand } => write!(f, "-{operand}"),
            ExprKind::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            ExprKind::Call { name, args } => {
                write!(f, "{name}({})", args.iter().join(", "))
            }
            ExprKind::Cast { expr, target } => write!(f, "({expr} as {target})"),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            stmt.write_indented(f, 0)?;
        }
        Ok(())
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn write_body(f: &mut fmt::Formatter<'_>, body: &[Stmt], indent: usize) -> fmt::Result {
    for stmt in body {
        stmt.write_indented(f, indent)?;
    }
    Ok(())
}

impl Stmt {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "    ".repeat(indent);
        match &self.kind {
            StmtKind::VarDecl { name, ty, init } => match init {
                Some(init) => writeln!(f, "{pad}var {name}: {ty} is {init};"),
                None => writeln!(f, "{pad}var {name}: {ty};"),
            },
            StmtKind::ArrayDecl { name, ty } => writeln!(f, "{pad}var {name}: {ty};"),
            StmtKind::TypeDecl { name, ty } => writeln!(f, "{pad}type {name} is {ty};"),
            StmtKind::RoutineDecl {
                name,
                params,
                return_type,
                body,
            } => {
                let mut signature = String::new();
                write!(
                    signature,
                    "{}",
                    params
                        .iter()
                        .map(|p| format!("{}: {}", p.name, p.ty))
                        .join(", ")
                )?;
                match return_type {
                    Some(ty) => writeln!(f, "{pad}routine {name}({signature}): {ty} is")?,
                    None => writeln!(f, "{pad}routine {name}({signature}) is")?,
                }
                write_body(f, body, indent + 1)?;
                writeln!(f, "{pad}end;")
            }
            StmtKind::Assignment {
                target,
                index,
                value,
            } => match index {
                Some(index) => writeln!(f, "{pad}{target}[{index}] := {value};"),
                None => writeln!(f, "{pad}{target} := {value};"),
            },
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => {
                writeln!(f, "{pad}if {condition} then")?;
                write_body(f, then_body, indent + 1)?;
                if let Some(else_body) = else_body {
                    writeln!(f, "{pad}else")?;
                    write_body(f, else_body, indent + 1)?;
                }
                writeln!(f, "{pad}end;")
            }
            StmtKind::While { condition, body } => {
                writeln!(f, "{pad}while {condition} loop")?;
                write_body(f, body, indent + 1)?;
                writeln!(f, "{pad}end;")
            }
            StmtKind::For {
                variable,
                reverse,
                from,
                to,
                body,
            } => {
                let reverse = if *reverse { "reverse " } else { "" };
                writeln!(f, "{pad}for {variable} in {reverse}{from} .. {to} loop")?;
                write_body(f, body, indent + 1)?;
                writeln!(f, "{pad}end;")
            }
            StmtKind::Print { value } => writeln!(f, "{pad}print({value});"),
            StmtKind::Read { variable } => writeln!(f, "{pad}read {variable};"),
            StmtKind::Return { value } => match value {
                Some(value) => writeln!(f, "{pad}return {value};"),
                None => writeln!(f, "{pad}return;"),
            },
            StmtKind::RoutineCall { name, args } => {
                writeln!(f, "{pad}{name}({});", args.iter().join(", "))
            }
        }
    }
}
