//! The interactive question loop.

use std::path::PathBuf;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::messages::*;
use crate::session::{Session, read_uploads, render_answer};

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ask(String),
    Build(Vec<PathBuf>),
    Save(Option<PathBuf>),
    Load(Option<PathBuf>),
    Status,
    Config,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Ask(line.to_string());
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<PathBuf> = words.map(PathBuf::from).collect();
        match name {
            "build" => Self::Build(args),
            "save" => Self::Save(args.into_iter().next()),
            "load" => Self::Load(args.into_iter().next()),
            "status" => Self::Status,
            "config" => Self::Config,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Read lines until `/quit` or end of input, acting on each.
pub async fn run(session: &mut Session, show_chunks: bool) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("{SHELL_BANNER}\n{SHELL_HELP}\n");

    loop {
        let line = match editor.readline("docqa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = editor.add_history_entry(line.as_str());

        match ShellCommand::parse(&line) {
            ShellCommand::Empty => {}
            ShellCommand::Ask(question) => match session.ask(&question).await {
                Ok(answer) => println!("{}", render_answer(&answer, show_chunks)),
                Err(notice) => println!("{notice}"),
            },
            ShellCommand::Build(paths) => {
                let notice = match read_uploads(&paths) {
                    Ok(files) => session.build(&files).await,
                    Err(notice) => notice,
                };
                println!("{notice}");
            }
            ShellCommand::Save(dir) => println!("{}", session.save(dir.as_deref())),
            ShellCommand::Load(dir) => println!("{}", session.load(dir.as_deref())),
            ShellCommand::Status => println!("{}", session.status()),
            ShellCommand::Config => {
                println!("{}", serde_json::to_string_pretty(&session.settings().summary())?)
            }
            ShellCommand::Help => println!("{SHELL_HELP}"),
            ShellCommand::Quit => break,
            ShellCommand::Unknown(_) => println!("{SHELL_UNKNOWN_COMMAND}"),
        }
    }

    println!("{SHELL_GOODBYE}");
    Ok(())
}
