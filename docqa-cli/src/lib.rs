//! Command-line front end for document question answering.

pub mod messages;
pub mod session;
pub mod settings;
pub mod shell;

pub use session::{Level, Notice, Session, read_uploads, render_answer};
pub use settings::{ConfigSummary, Settings};
pub use shell::ShellCommand;

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "docqa=info,docqa_cli=info,docqa_rag=info";
const VERBOSE_LOG_FILTER: &str = "docqa=debug,docqa_cli=debug,docqa_rag=debug";

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
