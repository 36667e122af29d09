//! `docqa`: build a document index and ask questions about it.
//!
//! Usage:
//!   docqa build report.pdf notes.txt        # index files, save to ./vector_db
//!   docqa ask "這份文件主要討論了什麼？"      # answer from the saved index
//!   docqa shell                             # interactive session
//!   docqa config                            # print the active configuration

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use docqa_cli::messages::INFO_LOAD_EXISTING;
use docqa_cli::{Notice, Session, Settings, init_tracing, read_uploads, render_answer, shell};

#[derive(Parser)]
#[command(name = "docqa", version, about = "📚 RAG 文件問答系統")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an index from PDF, DOCX and TXT files and save it
    Build {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Index directory (defaults to DOCQA_INDEX_PATH or ./vector_db)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Answer one question from a saved index
    Ask {
        question: String,

        /// Index directory (defaults to DOCQA_INDEX_PATH or ./vector_db)
        #[arg(long)]
        index: Option<PathBuf>,

        /// Also print the retrieved passages
        #[arg(long)]
        show_chunks: bool,
    },
    /// Interactive session
    Shell {
        #[arg(long)]
        index: Option<PathBuf>,

        /// Print retrieved passages after each answer
        #[arg(long)]
        show_chunks: bool,
    },
    /// Print the active configuration as JSON
    Config,
}

fn report(notice: &Notice) -> bool {
    if notice.is_success() {
        println!("{notice}");
    } else {
        eprintln!("{notice}");
    }
    notice.is_success()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::from_env()?;
    let missing = settings.missing_keys();
    if !missing.is_empty() {
        tracing::warn!(?missing, "credentials not set");
    }

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings.summary())?);
        }
        Command::Build { files, out } => {
            let mut session = Session::from_settings(settings)?;
            let files = match read_uploads(&files) {
                Ok(files) => files,
                Err(notice) => {
                    report(&notice);
                    return Ok(ExitCode::FAILURE);
                }
            };
            if !report(&session.build(&files).await) || !report(&session.save(out.as_deref())) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Ask { question, index, show_chunks } => {
            let mut session = Session::from_settings(settings)?;
            let loaded = session.load(index.as_deref());
            if !loaded.is_success() {
                report(&loaded);
                return Ok(ExitCode::FAILURE);
            }
            match session.ask(&question).await {
                Ok(answer) => print!("{}", render_answer(&answer, show_chunks)),
                Err(notice) => {
                    report(&notice);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Shell { index, show_chunks } => {
            let mut session = Session::from_settings(settings)?;
            let loaded = session.load(index.as_deref());
            if loaded.is_success() {
                println!("{loaded}");
            } else {
                println!("{loaded}\n{INFO_LOAD_EXISTING}");
            }
            shell::run(&mut session, show_chunks).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
