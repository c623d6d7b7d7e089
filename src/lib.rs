//! The IL compiler.
//!
//! ```txt
//!        +-------+             +--------+          +----------+
//! str -> | lexer | - Tokens -> | parser | - AST -> | analyzer |
//!        +-------+             +--------+          +----------+
//!                                                       |
//!             +------------ checked AST ----------------+
//!             |
//!             v
//!        +-----------+           +---------+
//!        | optimizer | - AST --> | codegen | --> Jasmin units
//!        +-----------+           +---------+
//! ```
//!
//! IL is a small statically-typed imperative language. This crate is a batch
//! compiler for it: one source file in, Jasmin assembly units out, ready for
//! an external assembler and archive packager. The parser stops at the first
//! lexical or syntax error; the semantic analyzer collects every error it
//! finds; optimization is opt-in and rewrites the AST in three passes.
//!
//! # Examples
//!
//! ```
//! use il_lang::{compile, CompileOptions};
//!
//! let input = r#"
//! routine main() is
//!     var x: integer is 2 + 3;
//!     print(x);
//! end;
//! "#;
//! let compilation = compile(input, &CompileOptions::default()).unwrap();
//! assert!(compilation.code.main.contains(".class public Main"));
//! ```

pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod errors;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod symbol;
pub mod token;
pub mod types;
pub mod utils;

use ast::Program;
use codegen::GeneratedCode;
use errors::{Error, SemanticError};
use optimizer::{OptimizationDetail, Optimizer};

/// Knobs for one compilation.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Run the three optimizer passes between analysis and code generation.
    pub optimize: bool,
}

/// The result of a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    /// The AST that was lowered (optimized when requested).
    pub program: Program,
    /// Number of optimizer transformations applied.
    pub optimizations: usize,
    /// Per-transformation records for the reporter.
    pub details: Vec<OptimizationDetail>,
    /// The generated Jasmin units.
    pub code: GeneratedCode,
}

/// Compiles IL source text down to Jasmin assembly units.
pub fn compile(input: &str, options: &CompileOptions) -> Result<Compilation, Error> {
    let program = parser::parse(input)?;

    let (errors, table) = analyzer::analyze(&program);
    if !errors.is_empty() {
        return Err(Error::Semantic(errors));
    }

    let (program, optimizations, details) = if options.optimize {
        let mut optimizer = Optimizer::new();
        let program = optimizer.optimize(program);
        let optimizations = optimizer.count();
        (program, optimizations, optimizer.into_details())
    } else {
        (program, 0, Vec::new())
    };

    let code = codegen::generate(&program, table)?;
    Ok(Compilation {
        program,
        optimizations,
        details,
        code,
    })
}

/// Parses and analyzes without generating code. Parse failures are returned
/// as `Err`; the semantic error list is returned as data so callers such as
/// the batch test runner can classify outcomes.
pub fn check(input: &str) -> Result<(Program, Vec<SemanticError>), Error> {
    let program = parser::parse(input)?;
    let (errors, _) = analyzer::analyze(&program);
    Ok((program, errors))
}
