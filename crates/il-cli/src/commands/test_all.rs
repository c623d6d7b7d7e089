//! The batch test runner: compile every `tests/*.txt` and classify each file
//! as OK, a parse error, or a list of semantic errors.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _};

use il_lang::optimizer::Optimizer;

use crate::{args::IlCliArgs, Context};

const TESTS_DIR: &str = "tests";

impl Context {
    pub fn execute_test_all(&mut self, args: &IlCliArgs) -> Result<i32, anyhow::Error> {
        let title = if args.optimize {
            "Running tests (with optimization)"
        } else {
            "Running semantic analyzer tests"
        };
        println!("{title}");
        println!("---------------------------------");

        let tests_dir = Path::new(TESTS_DIR);
        if !tests_dir.is_dir() {
            bail!("tests/ directory not found");
        }

        let mut test_files: Vec<_> = fs::read_dir(tests_dir)
            .context("could not list tests/")?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        if test_files.is_empty() {
            bail!("no test files found in tests/");
        }
        test_files.sort();

        let mut passed = 0;
        let mut failed = 0;
        let mut failed_tests = Vec::new();

        for path in &test_files {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("?")
                .to_string();
            let source = fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?;

            match il_lang::check(&source) {
                Ok((program, errors)) if errors.is_empty() => {
                    if args.optimize {
                        let mut optimizer = Optimizer::new();
                        let _ = optimizer.optimize(program);
                    }
                    println!("{name}");
                    passed += 1;
                }
                Ok((_, errors)) => {
                    println!("{name}");
                    if args.verbose {
                        for error in &errors {
                            println!("    {error}");
                        }
                    }
                    failed += 1;
                    failed_tests.push(name);
                }
                Err(error) => {
                    println!("{name} (parse error)");
                    if args.verbose {
                        println!("    {error}");
                    }
                    failed += 1;
                    failed_tests.push(name);
                }
            }
        }

        println!("---------------------------------");
        println!(
            "Total: {} | Passed: {passed} | Failed: {failed}",
            passed + failed
        );

        if failed > 0 && !args.verbose {
            println!();
            println!("Failed tests:");
            for test in &failed_tests {
                println!("  - {test}");
            }
            println!();
            println!("Run with --verbose to see error details");
        }
        if failed == 0 {
            println!();
            println!("All tests passed!");
        }

        Ok(if failed > 0 { 1 } else { 0 })
    }
}
