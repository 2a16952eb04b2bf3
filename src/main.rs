mod cli;
mod domain;
mod infra;

use crate::cli::CliInvocation;
use std::io::{self, Write};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LOOKUPDESK_LOG";

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),
}

fn main() {
    init_logging();
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Command(command) => {
            crate::cli::run(command)?;
            Ok(())
        }
    }
}

fn print_help() {
    let text = format!(
        "{name} - read and classify lookup-bot replies from the terminal\n\nUSAGE:\n  {name} parse [FILE] [--mime TYPE] [--export]  Classify one reply (FILE or stdin) and print it\n  {name} results [--limit N] [--copy ID]        Fetch results and print the timeline\n  {name} watch [--limit N]                      Print results, then follow new replies live\n  {name} companies QUERY                        Search company documents\n  {name} send [--feature CMD] MESSAGE...        Send a message (or `/CMD QUERY`) to the bot\n  {name} button DATA                            Press an inline bot button\n  {name} login USER PASSWORD                    Log in and store the session token\n  {name} logout                                 Forget the stored session\n  {name} features                               List lookup categories\n  {name} --help | --version\n\nRESULTS FLAGS:\n  --limit N      Max messages to print, newest last (default: 20)\n  --copy ID      Copy one message's structured data to the clipboard\n\nOUTPUT:\n  results: #id<TAB>created_at<TAB>decision[<TAB>username][<TAB>[copy]], then the rendered reply\n  companies: id<TAB>nama<TAB>prefix<TAB>url\n  features: label<TAB>/command\n\nENV:\n  LOOKUPDESK_API_URL       Backend base URL (required for network commands)\n  LOOKUPDESK_SOCKET_URL    Push channel base URL (default: LOOKUPDESK_API_URL)\n  LOOKUPDESK_STATE_DIR     Session storage dir (default: ~/.lookupdesk)\n  LOOKUPDESK_BOT           Bot handle messages are sent to (default: @OSngrok_bot)\n  LOOKUPDESK_TIMEOUT_SECS  HTTP timeout in seconds (default: 15)\n  LOOKUPDESK_LOG           Log filter, e.g. `debug` (falls back to RUST_LOG; default: warn)\n",
        name = env!("CARGO_PKG_NAME")
    );
    let mut out = io::stdout().lock();
    let _ = write!(out, "{text}");
}
