use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "ilc")]
#[command(bin_name = "ilc")]
#[command(about = "IL compiler: frontend, optimizer and Jasmin backend", long_about = None)]
pub struct IlCliArgs {
    /// The IL source file to compile.
    pub input: Option<PathBuf>,

    /// Compile every tests/*.txt file and report per-file outcomes.
    #[arg(long = "test-all")]
    pub test_all: bool,

    /// Show detailed compilation output on stderr.
    #[arg(long)]
    pub debug: bool,

    /// Enable the AST optimizer passes.
    #[arg(short = 'O', long)]
    pub optimize: bool,

    /// Show error details (with --test-all).
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Emit HTML and Graphviz DOT reports next to the build outputs.
    #[arg(short = 'V', long)]
    pub visualize: bool,
}
