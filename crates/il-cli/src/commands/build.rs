//! Single-file compilation: run the pipeline, write the Jasmin units, drive
//! the external assembler, and package the executable archive.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context as _};
use log::debug;

use il_lang::errors::Diagnostics;
use il_lang::{compile, CompileOptions};

use crate::{args::IlCliArgs, report, Context};

const OUTPUT_DIR: &str = "output";

impl Context {
    pub fn execute_build(&mut self, input: PathBuf, args: &IlCliArgs) -> Result<i32, anyhow::Error> {
        if !input.exists() {
            bail!("file not found: {}", input.display());
        }
        let source = fs::read_to_string(&input)
            .with_context(|| format!("could not read {}", input.display()))?;

        let options = CompileOptions {
            optimize: args.optimize,
        };
        let compilation = match compile(&source, &options) {
            Ok(compilation) => compilation,
            Err(error) => {
                for diagnostic in Diagnostics::from(&error).iter() {
                    eprintln!("{diagnostic}");
                }
                return Ok(1);
            }
        };

        if self.debug {
            debug!("optimized AST:\n{}", compilation.program);
            debug!("generated Jasmin code:\n{}", compilation.code.main);
        }

        let output_dir = Path::new(OUTPUT_DIR);
        fs::create_dir_all(output_dir)
            .with_context(|| format!("could not create {}", output_dir.display()))?;

        // Record units are written and assembled before the main unit.
        let mut unit_paths = Vec::new();
        for record in &compilation.code.records {
            let path = output_dir.join(format!("{}.j", record.name));
            fs::write(&path, &record.text)
                .with_context(|| format!("could not write {}", path.display()))?;
            unit_paths.push(path);
        }
        let main_path = output_dir.join("Main.j");
        fs::write(&main_path, &compilation.code.main)
            .with_context(|| format!("could not write {}", main_path.display()))?;
        unit_paths.push(main_path);

        for path in &unit_paths {
            assemble(path, output_dir)?;
        }

        let base_name = input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("program");
        let archive = package_archive(output_dir, base_name)?;

        if args.visualize {
            report::write_reports(output_dir, base_name, &source, &compilation)?;
        }

        let file_name = input
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("input");
        let opt_msg = if args.optimize {
            format!(" [{} optimizations]", compilation.optimizations)
        } else {
            String::new()
        };
        println!("{file_name} - OK{opt_msg}");
        println!(
            "Executable: {}",
            archive.file_name().and_then(|n| n.to_str()).unwrap_or("")
        );
        Ok(0)
    }
}

/// Invokes the external Jasmin assembler on one `.j` unit. The tool is
/// expected at a fixed relative location.
fn assemble(unit: &Path, output_dir: &Path) -> Result<(), anyhow::Error> {
    let jasmin = ["lib/jasmin.jar", "compiler/lib/jasmin.jar"]
        .into_iter()
        .map(Path::new)
        .find(|path| path.exists())
        .ok_or_else(|| anyhow!("jasmin assembler not found (expected lib/jasmin.jar)"))?;

    debug!("assembling {}", unit.display());
    let output = Command::new("java")
        .arg("-jar")
        .arg(jasmin)
        .arg("-d")
        .arg(output_dir)
        .arg(unit)
        .output()
        .with_context(|| "could not start the assembler (is java installed?)")?;

    if !output.status.success() {
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        bail!(
            "assembling {} failed with exit code {}",
            unit.display(),
            output.status.code().unwrap_or(-1)
        );
    }
    Ok(())
}

/// Writes the manifest and collects the generated class files into an
/// executable archive named after the input file.
fn package_archive(output_dir: &Path, base_name: &str) -> Result<PathBuf, anyhow::Error> {
    let manifest_path = output_dir.join("MANIFEST.MF");
    fs::write(
        &manifest_path,
        "Manifest-Version: 1.0\nMain-Class: Main\nCreated-By: IL compiler\n",
    )
    .with_context(|| format!("could not write {}", manifest_path.display()))?;

    let archive = output_dir.join(format!("{base_name}.jar"));
    debug!("packaging {}", archive.display());
    let output = Command::new("jar")
        .arg("cfm")
        .arg(&archive)
        .arg(&manifest_path)
        .arg("-C")
        .arg(output_dir)
        .arg(".")
        .output()
        .with_context(|| "could not start the jar tool")?;

    if !output.status.success() {
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        bail!(
            "packaging {} failed with exit code {}",
            archive.display(),
            output.status.code().unwrap_or(-1)
        );
    }

    let _ = fs::remove_file(&manifest_path);
    Ok(archive)
}
