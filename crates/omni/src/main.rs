//! Omni compiler command-line driver
//!
//! `omni [--target=browser|wasi] <file>` reads the source file, compiles
//! it, and writes `output/<basename>.wat`. Parser errors are listed under
//! a `Parser errors:` header; compiler errors print as
//! `Compiler error: <msg>`; both exit with status 1.

use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use omnic::Target;
use omnic::diagnostics;

#[derive(Parser)]
#[command(name = "omni", about = "Omni to WebAssembly compiler", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Target platform (browser or wasi)
    #[arg(long, default_value = "browser")]
    target: String,

    /// Path to the source file to compile
    file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> ExitCode {
    let target: Target = match cli.target.parse() {
        Ok(target) => target,
        Err(err) => {
            diagnostics::report_error(None, None, &err.to_string());
            return ExitCode::FAILURE;
        }
    };

    println!("Compiling {}...", cli.file.display());

    let file_name = cli.file.display().to_string();
    let source = match std::fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(err) => {
            diagnostics::report_error(Some(&file_name), None, &format!("cannot read file: {err}"));
            return ExitCode::FAILURE;
        }
    };

    let (program, parse_errors) = omni_parser::parse_program(&source);
    if !parse_errors.is_empty() {
        diagnostics::report_parse_errors(&parse_errors);
        return ExitCode::FAILURE;
    }

    let wat = match omnic::compile(&program, target) {
        Ok(wat) => wat,
        Err(err) => {
            println!("Compiler error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let out_dir = Path::new("output");
    if let Err(err) = std::fs::create_dir_all(out_dir) {
        diagnostics::report_error(
            None,
            None,
            &format!("cannot create {}: {}", out_dir.display(), err),
        );
        return ExitCode::FAILURE;
    }

    let base = cli
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let out_path = out_dir.join(format!("{base}.wat"));

    if let Err(err) = std::fs::write(&out_path, &wat) {
        diagnostics::report_error(
            None,
            None,
            &format!("cannot write {}: {}", out_path.display(), err),
        );
        return ExitCode::FAILURE;
    }

    println!("{} Generated {}", "Success!".green(), out_path.display());
    ExitCode::SUCCESS
}
