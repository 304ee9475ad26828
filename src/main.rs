// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Hyperbox - run CommonJS bundles in a caching sandbox
//!
//! This is the main entry point for the hyperbox CLI/REPL.
//!
//! ## Features
//!
//! - `run`: execute a file through the execution service
//! - `eval`: evaluate a module body from the command line
//! - `repl`: interactive REPL with `require` and history

mod repl;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use hyperbox_script::runtime::{Value, from_json, to_json};
use hyperbox_vm::{NODE_API_VERSION, RunOptions, VERSION, Vm, VmConfig, VmError};
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tracing_subscriber::EnvFilter;

/// Interpreter thread stack size
const STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "hyperbox",
    about = "Sandboxed, cached execution of CommonJS bundles",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a file through the execution service and print its exports
    Run {
        /// JavaScript file to execute
        file: PathBuf,

        /// Module name (defaults to the file path)
        #[arg(long)]
        name: Option<String>,

        /// Use the shared environment and the initializer cache
        #[arg(long)]
        shared: bool,

        /// Extra shared-environment binding; VALUE is parsed as JSON when possible
        #[arg(long = "global", value_name = "KEY=VALUE", value_parser = parse_global)]
        globals: Vec<(String, serde_json::Value)>,

        /// Run the file this many times
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },

    /// Evaluate code as a module body and print its exports
    Eval {
        /// Module source
        code: String,
    },

    /// Start the interactive REPL
    Repl,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let worker = thread::Builder::new()
        .name("hyperbox".to_string())
        .stack_size(STACK_SIZE)
        .spawn(move || dispatch(cli));

    let result = match worker {
        Ok(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(anyhow!("interpreter thread panicked"))),
        Err(e) => Err(e).context("failed to start interpreter thread"),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// `hyperbox=warn` by default, `hyperbox=debug` with `--verbose`;
/// `RUST_LOG` overrides both. Console output from scripts is always shown.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "hyperbox=debug,hyperbox::console=trace"
    } else {
        "hyperbox=warn,hyperbox::console=trace"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Run {
            file,
            name,
            shared,
            globals,
            repeat,
        }) => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            let name = name.unwrap_or_else(|| file.display().to_string());

            let mut options = RunOptions::from(&config.run);
            if shared {
                options = RunOptions {
                    globals: options.globals,
                    ..RunOptions::shared()
                };
            }
            for (key, value) in &globals {
                options = options.with_global(key.as_str(), from_json(value));
            }

            run_source(&config, &name, &source, &options, repeat)
        }
        Some(Command::Eval { code }) => {
            run_source(&config, "[eval]", &code, &RunOptions::from(&config.run), 1)
        }
        Some(Command::Repl) => run_repl(&config),
        None if std::io::stdin().is_terminal() => run_repl(&config),
        None => {
            let mut code = String::new();
            std::io::stdin().read_to_string(&mut code)?;
            run_source(&config, "[stdin]", &code, &RunOptions::from(&config.run), 1)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<VmConfig> {
    match path {
        Some(path) => VmConfig::from_file(path)
            .map_err(vm_error)
            .with_context(|| format!("invalid configuration '{}'", path.display())),
        None => Ok(VmConfig::default()),
    }
}

fn run_source(
    config: &VmConfig,
    name: &str,
    source: &str,
    options: &RunOptions,
    repeat: usize,
) -> Result<ExitCode> {
    let vm = Vm::from_config(config).map_err(vm_error)?;

    let mut exports = Value::Undefined;
    for _ in 0..repeat.max(1) {
        let result = vm
            .run(name, source, options)
            .and_then(|exports| vm.runtime().run_timers().map(|_| exports));
        exports = match result {
            Ok(exports) => exports,
            Err(VmError::Exit(code)) => return Ok(exit_code(code)),
            Err(e) => return Err(vm_error(e)),
        };
    }

    print_exports(&exports)?;
    if repeat > 1 {
        eprintln!(
            "{} {} runs, {} cached export(s)",
            "hyperbox".cyan().bold(),
            repeat.yellow(),
            vm.exports_cache_len().yellow()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn print_exports(exports: &Value) -> Result<()> {
    let json = to_json(exports).map_err(|e| anyhow!("{}", e))?;
    match json {
        Some(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        None => println!("{}", "undefined".dimmed()),
    }
    Ok(())
}

/// Parse `KEY=VALUE`, reading VALUE as JSON and falling back to a string
fn parse_global(arg: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))?;
    if key.is_empty() {
        return Err("global name must not be empty".to_string());
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Sandbox errors hold script values, which stay on the interpreter thread
fn vm_error(err: VmError) -> anyhow::Error {
    anyhow!("{}", err)
}

fn run_repl(config: &VmConfig) -> Result<ExitCode> {
    println!(
        "{} {} (Node.js API v{})",
        "hyperbox".cyan().bold(),
        VERSION.yellow(),
        NODE_API_VERSION.dimmed()
    );
    println!("Type {} for help, {} to exit", ".help".green(), ".exit".green());
    println!();

    let mut repl = repl::Repl::new(config).context("failed to initialize REPL")?;
    let code = repl.run().context("REPL error")?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global() {
        assert_eq!(
            parse_global("port=8080").unwrap(),
            ("port".to_string(), serde_json::json!(8080))
        );
        assert_eq!(
            parse_global("locale=en-US").unwrap(),
            ("locale".to_string(), serde_json::json!("en-US"))
        );
        assert_eq!(
            parse_global("flags={\"a\":true}").unwrap().1,
            serde_json::json!({"a": true})
        );
        assert!(parse_global("novalue").is_err());
        assert!(parse_global("=1").is_err());
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(0), ExitCode::from(0));
        assert_eq!(exit_code(3), ExitCode::from(3));
        assert_eq!(exit_code(-1), ExitCode::from(1));
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "hyperbox", "run", "app.js", "--shared", "--global", "foo=1", "--repeat", "3",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Run {
                file,
                shared,
                globals,
                repeat,
                ..
            }) => {
                assert_eq!(file, PathBuf::from("app.js"));
                assert!(shared);
                assert_eq!(globals.len(), 1);
                assert_eq!(repeat, 3);
            }
            _ => panic!("expected run"),
        }
    }
}
