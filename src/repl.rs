// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL over one persistent sandbox environment.

use hyperbox_script::Value;
use hyperbox_vm::globals::console::format_value;
use hyperbox_vm::module_system::resolver::is_path_specifier;
use hyperbox_vm::{Environment, Module, ModuleOptions, Runtime, VmConfig, VmError};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

const HISTORY_FILE: &str = ".hyperbox_history";
const MAX_HISTORY_SIZE: usize = 1000;

/// Identifiers every session can complete besides its own bindings
const INTRINSICS: &[&str] = &[
    "Array", "Boolean", "Error", "Function", "Infinity", "JSON", "Math", "NaN", "Number",
    "Object", "RangeError", "ReferenceError", "String", "SyntaxError", "TypeError", "isFinite",
    "isNaN", "module", "parseFloat", "parseInt", "require", "undefined",
];

const KEYWORDS: &[&str] = &[
    "break", "catch", "const", "continue", "delete", "do", "else", "finally", "for",
    "function", "if", "in", "instanceof", "let", "new", "return", "this", "throw", "try",
    "typeof", "var", "void", "while",
];

const LITERALS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Load,
    Timers,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;
        let (cmd, arg) = match rest.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };

        let cmd = match cmd.to_lowercase().as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "exit" | "quit" | "q" => ReplCommand::Exit,
            "clear" => ReplCommand::Clear,
            "load" | "l" => ReplCommand::Load,
            "timers" | "t" => ReplCommand::Timers,
            _ => return None,
        };
        Some((cmd, arg))
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Start over with a fresh environment"),
            (".load <file>", "Require a file and print its exports"),
            (".timers", "Fire queued timer callbacks"),
        ]
    }
}

/// Completion from the live environment, keyword highlighting and
/// multi-line input
struct HyperboxHelper {
    environment: Environment,
}

impl Completer for HyperboxHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '$')
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, Vec::new()));
        }

        let mut names: Vec<String> = self.environment.keys();
        names.extend(INTRINSICS.iter().chain(KEYWORDS).map(|s| s.to_string()));
        names.sort();
        names.dedup();

        let matches = names
            .into_iter()
            .filter(|name| name.starts_with(word) && name.len() > word.len())
            .map(|name| Pair {
                replacement: name[word.len()..].to_string(),
                display: name,
            })
            .collect();
        Ok((pos, matches))
    }
}

impl Hinter for HyperboxHelper {
    type Hint = String;
}

impl Highlighter for HyperboxHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.trim_start().starts_with('.') {
            return Cow::Owned(line.magenta().to_string());
        }

        let mut out = String::with_capacity(line.len() * 2);
        let mut word = String::new();
        for c in line.chars() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                word.push(c);
                continue;
            }
            out.push_str(&highlight_word(&word));
            word.clear();
            out.push(c);
        }
        out.push_str(&highlight_word(&word));
        Cow::Owned(out)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    if KEYWORDS.contains(&word) {
        word.magenta().bold().to_string()
    } else if LITERALS.contains(&word) {
        word.blue().to_string()
    } else if word == "require" || word == "module" || word == "exports" {
        word.cyan().to_string()
    } else if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        word.yellow().to_string()
    } else {
        word.to_string()
    }
}

impl Validator for HyperboxHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        if is_balanced(ctx.input()) {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

impl Helper for HyperboxHelper {}

/// Returns false while a bracket or string is still open
fn is_balanced(input: &str) -> bool {
    let mut open = Vec::new();
    let mut quote = None;
    let mut escaped = false;

    for c in input.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' | '`' => quote = Some(c),
                '(' => open.push(')'),
                '[' => open.push(']'),
                '{' => open.push('}'),
                ')' | ']' | '}' if open.pop() != Some(c) => return true,
                _ => {}
            },
        }
    }

    open.is_empty() && quote.is_none()
}

/// A REPL session: one module and the environment it runs in
struct Session {
    module: Module,
}

impl Session {
    fn new(runtime: &Runtime) -> Result<Self, VmError> {
        let environment = runtime.create_environment(&Default::default());
        let module = Module::new(
            runtime,
            ModuleOptions::new("[repl]").with_environment(environment.clone()),
        )?;

        let filename = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("[repl]");
        module.load(&filename)?;

        let handle = module.handle();
        environment.set("module", Value::Object(handle.clone()));
        environment.set("exports", module.exports());
        environment.set("require", handle.get_own("require").unwrap_or_default());
        Ok(Self { module })
    }

    fn environment(&self) -> &Environment {
        self.module.environment()
    }
}

/// The interactive REPL
pub struct Repl {
    runtime: Runtime,
    session: Session,
    editor: Editor<HyperboxHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(config: &VmConfig) -> anyhow::Result<Self> {
        let runtime = Runtime::new(config.runtime.clone());
        let session = Session::new(&runtime).map_err(|e| anyhow::anyhow!("{}", e))?;

        let editor_config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();
        let mut editor = Editor::with_config(editor_config)?;
        editor.set_helper(Some(HyperboxHelper {
            environment: session.environment().clone(),
        }));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hyperbox")
            .join(HISTORY_FILE);
        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = editor.load_history(&history_path);

        Ok(Self {
            runtime,
            session,
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop. Returns the exit code requested by
    /// `process.exit`, or success.
    pub fn run(&mut self) -> rustyline::Result<ExitCode> {
        let mut exit = ExitCode::SUCCESS;

        loop {
            let prompt = format!("{} ", "hyperbox>".bright_green().bold());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let outcome = match ReplCommand::parse(line) {
                        Some((ReplCommand::Exit, _)) => break,
                        Some((cmd, arg)) => self.execute_command(cmd, arg),
                        None => self.eval(line),
                    };
                    if let Err(VmError::Exit(code)) = outcome {
                        exit = ExitCode::from(u8::try_from(code).unwrap_or(1));
                        break;
                    }
                    if let Err(err) = outcome {
                        print_error(&err);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        let _ = self.editor.save_history(&self.history_path);
        Ok(exit)
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> Result<(), VmError> {
        match cmd {
            ReplCommand::Help => print_help(),
            ReplCommand::Exit => {}
            ReplCommand::Clear => {
                self.session = Session::new(&self.runtime)?;
                if let Some(helper) = self.editor.helper_mut() {
                    helper.environment = self.session.environment().clone();
                }
                debug!("started a fresh REPL environment");
                println!("{}", "Environment cleared".dimmed());
            }
            ReplCommand::Load => match arg {
                Some(path) => {
                    let specifier = if is_path_specifier(path) {
                        path.to_string()
                    } else {
                        format!("./{}", path)
                    };
                    let exports = self.session.module.require(&specifier)?;
                    println!("{}", format_value(&exports));
                }
                None => eprintln!(
                    "{}: {} {}",
                    "Error".red().bold(),
                    ".load".cyan(),
                    "requires a file path".dimmed()
                ),
            },
            ReplCommand::Timers => {
                let fired = self.runtime.run_timers()?;
                println!("{}", format!("{} callback(s) fired", fired).dimmed());
            }
        }
        Ok(())
    }

    fn eval(&mut self, input: &str) -> Result<(), VmError> {
        let value = self
            .runtime
            .engine()
            .eval(input, self.session.environment().context())?;
        println!("{}", colorize(&value));
        Ok(())
    }
}

fn colorize(value: &Value) -> String {
    let text = format_value(value);
    match value {
        Value::Undefined => text.dimmed().to_string(),
        Value::Null => text.blue().to_string(),
        Value::Boolean(_) | Value::Number(_) => text.yellow().to_string(),
        Value::String(_) => format!("'{}'", text).green().to_string(),
        Value::Object(_) if value.is_function() => text.magenta().to_string(),
        Value::Object(_) => text.cyan().to_string(),
    }
}

fn print_help() {
    println!();
    println!("{}", "REPL Commands:".white().bold());
    for (cmd, desc) in ReplCommand::all_commands() {
        println!("  {:16} {}", cmd.cyan(), desc.dimmed());
    }
    println!();
    println!("{}", "Keyboard Shortcuts:".white().bold());
    println!("  {:16} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
    println!("  {:16} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
    println!("  {:16} {}", "Tab".yellow(), "Autocomplete".dimmed());
    println!();
}

fn print_error(error: &VmError) {
    let text = error.to_string();
    match text.split_once(':') {
        Some((kind, message)) => eprintln!("{}:{}", kind.red().bold(), message),
        None => eprintln!("{}", text.red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert_eq!(ReplCommand::parse(".help"), Some((ReplCommand::Help, None)));
        assert_eq!(ReplCommand::parse(".exit"), Some((ReplCommand::Exit, None)));
        assert_eq!(
            ReplCommand::parse(".load  lib/a.js "),
            Some((ReplCommand::Load, Some("lib/a.js")))
        );
        assert_eq!(ReplCommand::parse(".clear"), Some((ReplCommand::Clear, None)));
        assert!(ReplCommand::parse(".unknown").is_none());
        assert!(ReplCommand::parse("not a command").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("function () { return [1]; }"));
        assert!(!is_balanced("{ a: 1"));
        assert!(!is_balanced("'open"));
        assert!(is_balanced("'string with (unbalanced'"));
        assert!(is_balanced("'it\\'s'"));
    }

    #[test]
    fn test_session_exposes_require() {
        let runtime = Runtime::default();
        let session = Session::new(&runtime).unwrap();
        let value = runtime
            .engine()
            .eval(
                "var p = require('path'); x = p.basename('/a/b.js'); x",
                session.environment().context(),
            )
            .unwrap();

        assert_eq!(value, Value::from("b.js"));
        assert_eq!(session.environment().get("x"), Some(Value::from("b.js")));
    }
}
