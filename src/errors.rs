//! The compiler error types.
//!
//! Each compilation phase has its own error enum; [`Error`] is the sum the
//! pipeline reports. Lexical and syntax errors are fatal on first occurrence,
//! semantic analysis collects every error before failing, and code generation
//! fails on the first unsupported lowering.

use std::num::{ParseFloatError, ParseIntError};

use itertools::Itertools;
use thiserror::Error;

use crate::token::TokenKind;
use crate::utils::Location;

/// An error produced while scanning a single token.
///
/// These are embedded in the offending token itself, so the lexer never stops;
/// the parser surfaces them when it consumes the token.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LexicalError {
    #[error("invalid integer literal ({0})")]
    ParseIntError(#[from] ParseIntError),
    #[error("invalid real literal ({0})")]
    ParseFloatError(#[from] ParseFloatError),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("illegal character '{0}'")]
    IllegalCharacter(char),
}

/// An error produced while reducing the token stream to a program.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SyntaxError {
    #[error("unexpected token (expected {}, found {found})", .expected.iter().join(", "))]
    UnexpectedToken {
        expected: Vec<TokenKind>,
        found: TokenKind,
    },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("expected a statement, found {found}")]
    ExpectedStatement { found: TokenKind },
    #[error("expected an expression, found {found}")]
    ExpectedExpression { found: TokenKind },
    #[error("expected an identifier, found {found}")]
    ExpectedIdentifier { found: TokenKind },
    #[error("expected a type, found {found}")]
    ExpectedType { found: TokenKind },
    #[error("expected an integer array size, found {found}")]
    ExpectedArraySize { found: TokenKind },
    #[error("routine declarations are only allowed at the top level")]
    NestedRoutine,
}

/// A semantic rule violation. The analyzer collects all of these across the
/// whole program instead of aborting on the first.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SemanticError {
    #[error("Routine {name} is already defined")]
    RoutineAlreadyDefined { name: String },
    #[error("Type {name} is already defined")]
    TypeAlreadyDefined { name: String },
    #[error("Invalid field type {field_type} in record {record}")]
    InvalidFieldType { field_type: String, record: String },
    #[error("Variable {name} is already declared in this scope")]
    VariableAlreadyDeclared { name: String },
    #[error("Array {name} is already declared in this scope")]
    ArrayAlreadyDeclared { name: String },
    #[error("Parameter {name} is already defined")]
    ParameterAlreadyDefined { name: String },
    #[error("Unknown type {name}")]
    UnknownType { name: String },
    #[error("Invalid array element type: {element_type}")]
    InvalidArrayElementType { element_type: String },
    #[error("Array size must be positive")]
    NonPositiveArraySize,
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined array variable {name}")]
    UndefinedArrayVariable { name: String },
    #[error("Undefined record variable {name}")]
    UndefinedRecordVariable { name: String },
    #[error("Undefined routine {name}")]
    UndefinedRoutine { name: String },
    #[error("Variable {name} is not an array")]
    NotAnArray { name: String },
    #[error("Variable {name} is not a record")]
    NotARecord { name: String },
    #[error("Array index must be an integer")]
    NonIntegerArrayIndex,
    #[error("Array index {index} is negative for array {name}")]
    NegativeArrayIndex { index: i32, name: String },
    #[error("Array index {index} is out of bounds for array {name} (size: {size})")]
    ArrayIndexOutOfBounds { index: i32, name: String, size: i32 },
    #[error("Field {field} does not exist in record {record}")]
    NoSuchField { field: String, record: String },
    #[error(
        "Type mismatch in initialization: cannot assign value of type {value_type} \
         to variable of type {target_type}"
    )]
    InitializerTypeMismatch {
        value_type: String,
        target_type: String,
    },
    #[error(
        "Type mismatch in assignment: cannot assign value of type {value_type} \
         to variable of type {target_type}"
    )]
    AssignmentTypeMismatch {
        value_type: String,
        target_type: String,
    },
    #[error(
        "Type mismatch in array assignment: cannot assign value of type {value_type} \
         to array element of type {element_type}"
    )]
    ArrayAssignmentTypeMismatch {
        value_type: String,
        element_type: String,
    },
    #[error(
        "Type mismatch in assignment: cannot assign value of type {value_type} \
         to field of type {field_type}"
    )]
    FieldAssignmentTypeMismatch {
        value_type: String,
        field_type: String,
    },
    #[error("If statement condition must be a boolean expression")]
    NonBooleanIfCondition,
    #[error("While statement condition must be a boolean expression")]
    NonBooleanWhileCondition,
    #[error("For loop bound must be an integer expression")]
    NonIntegerForBound,
    #[error("Invalid expression in print statement")]
    InvalidPrintExpression,
    #[error("Return statement not allowed in this context")]
    ReturnOutsideRoutine,
    #[error("Unexpected return value in routine without return type")]
    UnexpectedReturnValue,
    #[error("Missing return value for routine with return type {return_type}")]
    MissingReturnValue { return_type: String },
    #[error("Return type mismatch: expected {expected}, but got {actual}")]
    ReturnTypeMismatch { expected: String, actual: String },
    #[error("Routine '{name}' with return type {return_type} must have a return statement")]
    MissingReturnPath { name: String, return_type: String },
    #[error("Wrong number of arguments in call to {name}: expected {expected}, got {actual}")]
    WrongArgumentCount {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error(
        "Wrong number of arguments for routine {name}. Expected {expected}, got {actual}"
    )]
    WrongArgumentCountStatement {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error(
        "Type mismatch in argument {index} of call to {name}: \
         expected {expected}, got {actual}"
    )]
    ArgumentTypeMismatch {
        index: usize,
        name: String,
        expected: String,
        actual: String,
    },
    #[error("Argument {index} type mismatch in call to {name}. Expected {expected}, got {actual}")]
    ArgumentTypeMismatchStatement {
        index: usize,
        name: String,
        expected: String,
        actual: String,
    },
    #[error("Logical operators require boolean operands")]
    NonBooleanLogicalOperand,
    #[error("Arithmetic operator '{op}' requires numeric operands")]
    NonNumericArithmeticOperand { op: String },
    #[error("Not operator requires boolean operand")]
    NonBooleanNotOperand,
    #[error("Unary minus requires a numeric operand")]
    NonNumericNegation,
    #[error("Invalid type cast from {from} to {to}")]
    InvalidCast { from: String, to: String },
}

/// An error produced while lowering the checked AST to Jasmin assembly.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CodegenError {
    #[error("unsupported type on lowering path: {0}")]
    UnsupportedType(String),
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("variable {0} is not a record type")]
    NotARecordType(String),
    #[error("unsupported construct: {0}")]
    Unsupported(String),
}

/// The error reported by the compilation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("lexical error: {error} at {location}")]
    Lexical {
        error: LexicalError,
        location: Location,
    },
    #[error("syntax error: {error} at {location}")]
    Syntax {
        error: SyntaxError,
        location: Location,
    },
    #[error("{} semantic error(s) found", .0.len())]
    Semantic(Vec<SemanticError>),
    #[error("code generation error: {0}")]
    Codegen(#[from] CodegenError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The kind tag attached to every entry in the diagnostic sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Semantic,
    Codegen,
    Io,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Lexical => write!(f, "lexical error"),
            DiagnosticKind::Syntax => write!(f, "syntax error"),
            DiagnosticKind::Semantic => write!(f, "semantic error"),
            DiagnosticKind::Codegen => write!(f, "code generation error"),
            DiagnosticKind::Io => write!(f, "io error"),
        }
    }
}

/// A single reported problem with its source location, if one is known.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<Location>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some(location) => write!(f, "{}: {} at {}", self.kind, self.message, location),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Collector of structured error records.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, message: String, location: Option<Location>) {
        self.entries.push(Diagnostic {
            kind,
            message,
            location,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

impl From<&Error> for Diagnostics {
    fn from(error: &Error) -> Self {
        let mut diagnostics = Diagnostics::new();
        match error {
            Error::Lexical { error, location } => {
                diagnostics.report(DiagnosticKind::Lexical, error.to_string(), Some(*location));
            }
            Error::Syntax { error, location } => {
                diagnostics.report(DiagnosticKind::Syntax, error.to_string(), Some(*location));
            }
            Error::Semantic(errors) => {
                for error in errors {
                    diagnostics.report(DiagnosticKind::Semantic, error.to_string(), None);
                }
            }
            Error::Codegen(error) => {
                diagnostics.report(DiagnosticKind::Codegen, error.to_string(), None);
            }
            Error::Io(error) => {
                diagnostics.report(DiagnosticKind::Io, error.to_string(), None);
            }
        }
        diagnostics
    }
}
