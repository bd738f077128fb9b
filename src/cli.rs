use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::compile::{load_document, CompiledStrategy, Compiler};
use crate::config::CompilerConfig;
use crate::error::CompileError;

/// Command line entry point.
#[derive(Parser)]
#[command(name = "spec-compiler")]
#[command(about = "Validate and compile strategy specifications into algorithm source")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate specification documents and list every problem found
    Validate {
        /// Specification JSON files
        #[arg(required = true)]
        specs: Vec<PathBuf>,
        /// Compiler configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Compile specification documents into algorithm source files
    Compile {
        /// Specification JSON files
        #[arg(required = true)]
        specs: Vec<PathBuf>,
        /// Output directory (defaults to the current directory)
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Compiler configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also write the generated logic as `<stem>.logic.json`
        #[arg(long)]
        emit_logic: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    match path {
        Some(p) => CompilerConfig::from_file(p)
            .with_context(|| format!("Failed to load config: {}", p.display())),
        None => Ok(CompilerConfig::default()),
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Invalid spec file name: {}", path.display()))
}

/// Write `<stem>.py`, and `<stem>.logic.json` when asked. Returns the source path.
fn write_outputs(spec: &Path, compiled: &CompiledStrategy, out_dir: &Path, emit_logic: bool) -> Result<PathBuf> {
    let stem = file_stem(spec)?;
    let source_path = out_dir.join(format!("{stem}.py"));
    fs::write(&source_path, &compiled.source)
        .with_context(|| format!("Failed to write {}", source_path.display()))?;
    if emit_logic {
        let logic_path = out_dir.join(format!("{stem}.logic.json"));
        let json = serde_json::to_string_pretty(&compiled.logic)?;
        fs::write(&logic_path, json).with_context(|| format!("Failed to write {}", logic_path.display()))?;
    }
    Ok(source_path)
}

impl Cli {
    /// Run the selected subcommand. Specs are processed in parallel; output is
    /// printed in argument order.
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Validate { specs, config } => {
                let compiler = Compiler::new(load_config(config.as_deref())?);
                let results: Vec<(PathBuf, Result<crate::validate::ValidationReport>)> = specs
                    .par_iter()
                    .map(|spec| {
                        let report = load_document(spec)
                            .map(|doc| compiler.validate_document(&doc))
                            .with_context(|| format!("Failed to read spec: {}", spec.display()));
                        (spec.clone(), report)
                    })
                    .collect();

                let mut invalid = 0;
                for (spec, result) in results {
                    let report = result?;
                    let status = if report.is_valid() { "VALID" } else { "INVALID" };
                    println!("{status}: {}", spec.display());
                    if !report.errors.is_empty() || !report.warnings.is_empty() {
                        for line in report.to_string().lines() {
                            println!("  {line}");
                        }
                    }
                    if !report.is_valid() {
                        invalid += 1;
                    }
                }
                if invalid > 0 {
                    anyhow::bail!("{invalid} of {} specification(s) failed validation", specs.len());
                }
                Ok(())
            }
            Commands::Compile {
                specs,
                out_dir,
                config,
                emit_logic,
            } => {
                let compiler = Compiler::new(load_config(config.as_deref())?);
                fs::create_dir_all(&out_dir)
                    .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

                let results: Vec<(PathBuf, Result<PathBuf>)> = specs
                    .par_iter()
                    .map(|spec| {
                        let written = compiler
                            .compile_file(spec)
                            .map_err(anyhow::Error::from)
                            .and_then(|compiled| {
                                for warning in &compiled.report.warnings {
                                    info!(spec = %spec.display(), "{warning}");
                                }
                                write_outputs(spec, &compiled, &out_dir, emit_logic)
                            });
                        (spec.clone(), written)
                    })
                    .collect();

                let mut failed = 0;
                for (spec, result) in results {
                    match result {
                        Ok(path) => println!("Compiled {} -> {}", spec.display(), path.display()),
                        Err(err) => {
                            failed += 1;
                            println!("FAILED: {}: {err}", spec.display());
                            if let Some(CompileError::InvalidDocument { report, .. }) = err.downcast_ref::<CompileError>() {
                                for line in report.to_string().lines() {
                                    println!("  {line}");
                                }
                            }
                        }
                    }
                }
                info!(compiled = specs.len() - failed, failed, "compile finished");
                if failed > 0 {
                    anyhow::bail!("{failed} of {} specification(s) failed to compile", specs.len());
                }
                Ok(())
            }
        }
    }
}
