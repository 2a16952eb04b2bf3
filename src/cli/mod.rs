use crate::domain::{
    BOT_TOPIC, ChannelError, LOOKUP_FEATURES, LookupFeature, PushChannel, RawMessage, Timeline,
    TimelineEntry, find_lookup_feature, render_view,
};
use crate::infra::{
    ApiClient, ApiError, ClearSessionError, Config, ConfigError, LoadSessionError,
    SaveSessionError, Session, SocketChannel, clear_session, copy_text_to_clipboard, load_session,
    save_session,
};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const DEFAULT_LIMIT: usize = 20;
const WATCH_POLL: Duration = Duration::from_millis(200);

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Command(CliCommand),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Parse {
        file: Option<PathBuf>,
        mime: Option<String>,
        export: bool,
    },
    Results {
        limit: usize,
        copy: Option<i64>,
    },
    Watch {
        limit: usize,
    },
    Companies {
        query: String,
    },
    Send {
        feature: Option<LookupFeature>,
        message: String,
    },
    Button {
        data: String,
    },
    Login {
        user: String,
        password: String,
    },
    Logout,
    Features,
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidFlagValue { flag: String, value: String },

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut iter = args.iter().skip(1);
    let Some(subcommand) = iter.next() else {
        return Ok(CliInvocation::PrintHelp);
    };
    let mut args = iter.peekable();

    let command = match subcommand.as_str() {
        "parse" => {
            let mut file: Option<PathBuf> = None;
            let mut mime: Option<String> = None;
            let mut export = false;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--mime" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue(arg.to_string()))?;
                        mime = Some(value.to_string());
                    }
                    "--export" => export = true,
                    "-" if file.is_none() => {}
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ if file.is_none() => file = Some(PathBuf::from(arg)),
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            CliCommand::Parse { file, mime, export }
        }
        "results" => {
            let mut limit = DEFAULT_LIMIT;
            let mut copy: Option<i64> = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--limit" | "-n" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue(arg.to_string()))?;
                        limit = parse_usize_flag("--limit", value)?;
                    }
                    "--copy" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue(arg.to_string()))?;
                        copy = Some(parse_id_flag("--copy", value)?);
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            CliCommand::Results { limit, copy }
        }
        "watch" => {
            let mut limit = DEFAULT_LIMIT;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--limit" | "-n" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue(arg.to_string()))?;
                        limit = parse_usize_flag("--limit", value)?;
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            CliCommand::Watch { limit }
        }
        "companies" => {
            let words = collect_words(args)?;
            CliCommand::Companies {
                query: require_text(words, "QUERY")?,
            }
        }
        "send" => {
            let mut feature: Option<LookupFeature> = None;
            let mut words: Vec<&str> = Vec::new();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--feature" | "-f" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue(arg.to_string()))?;
                        let found = find_lookup_feature(value).ok_or_else(|| {
                            CliParseError::InvalidFlagValue {
                                flag: "--feature".to_string(),
                                value: value.to_string(),
                            }
                        })?;
                        feature = Some(found);
                    }
                    "--" => words.extend(args.by_ref().map(String::as_str)),
                    _ if arg.starts_with("--") => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => words.push(arg),
                }
            }
            CliCommand::Send {
                feature,
                message: require_text(words, "MESSAGE")?,
            }
        }
        "button" => {
            let words = collect_words(args)?;
            CliCommand::Button {
                data: require_text(words, "DATA")?,
            }
        }
        "login" => {
            let user = args.next().ok_or(CliParseError::MissingArgument("USER"))?;
            let password = args
                .next()
                .ok_or(CliParseError::MissingArgument("PASSWORD"))?;
            if let Some(extra) = args.next() {
                return Err(CliParseError::UnexpectedArgument(extra.to_string()));
            }
            CliCommand::Login {
                user: user.to_string(),
                password: password.to_string(),
            }
        }
        "logout" | "features" => {
            if let Some(extra) = args.next() {
                return Err(CliParseError::UnexpectedArgument(extra.to_string()));
            }
            if subcommand == "logout" {
                CliCommand::Logout
            } else {
                CliCommand::Features
            }
        }
        other => return Err(CliParseError::UnknownSubcommand(other.to_string())),
    };

    Ok(CliInvocation::Command(command))
}

fn collect_words<'a>(args: impl Iterator<Item = &'a String>) -> Result<Vec<&'a str>, CliParseError> {
    let mut words = Vec::new();
    let mut literal = false;
    for arg in args {
        if !literal && arg == "--" {
            literal = true;
            continue;
        }
        if !literal && arg.starts_with("--") {
            return Err(CliParseError::UnknownFlag(arg.to_string()));
        }
        words.push(arg.as_str());
    }
    Ok(words)
}

fn require_text(words: Vec<&str>, name: &'static str) -> Result<String, CliParseError> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        return Err(CliParseError::MissingArgument(name));
    }
    Ok(text.trim().to_string())
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    LoadSession(#[from] LoadSessionError),

    #[error(transparent)]
    SaveSession(#[from] SaveSessionError),

    #[error(transparent)]
    ClearSession(#[from] ClearSessionError),

    #[error("not logged in\nHint: run `lookupdesk login USER PASSWORD` first.")]
    NotLoggedIn,

    #[error("message not found: {0}\nHint: run `lookupdesk results` and copy the id column.")]
    MessageNotFound(i64),

    #[error("message {0} has no copyable data (only family card, name search and population results)")]
    NotCopyable(i64),

    #[error("failed to read {path}: {source}")]
    ReadInput { path: String, source: io::Error },

    #[error(transparent)]
    WriteOutput(#[from] io::Error),
}

pub fn run(command: CliCommand) -> Result<(), CliRunError> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    match command {
        CliCommand::Parse { file, mime, export } => {
            let text = read_input(file.as_ref())?;
            print_parsed(&mut out, text, mime, export)?;
        }
        CliCommand::Features => {
            for feature in LOOKUP_FEATURES {
                let line = format!("{}\t/{}", feature.label, feature.command);
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
        }
        CliCommand::Login { user, password } => {
            let config = Config::from_env()?;
            let client = ApiClient::from_config(&config, None)?;
            let outcome = client.login(&user, &password)?;
            let session = Session::new(&outcome.token, outcome.username.as_deref());
            save_session(&config.state_dir, &session)?;
            info!(state_dir = %config.state_dir.display(), "session saved");
            let name = outcome.username.as_deref().unwrap_or(user.as_str());
            write_line(&mut out, &format!("logged in as {name}"))?;
        }
        CliCommand::Logout => {
            let config = Config::from_env()?;
            clear_session(&config.state_dir)?;
            write_line(&mut out, "logged out")?;
        }
        CliCommand::Results { limit, copy } => {
            let (config, client) = authorized_client()?;
            let mut timeline = Timeline::new(config.download_base());
            timeline.load_initial(client.fetch_results()?);

            if let Some(id) = copy {
                return copy_message(&mut out, &mut timeline, id);
            }

            let entries = timeline.entries();
            let skip = entries.len().saturating_sub(limit);
            for entry in &entries[skip..] {
                if !print_entry(&mut out, entry)? {
                    return Ok(());
                }
            }
        }
        CliCommand::Watch { limit } => {
            let (config, client) = authorized_client()?;
            let mut timeline = Timeline::new(config.download_base());
            timeline.load_initial(client.fetch_results()?);
            watch(&mut out, &config, &mut timeline, limit)?;
        }
        CliCommand::Companies { query } => {
            let (_, client) = authorized_client()?;
            for company in client.fetch_companies(&query)? {
                let line = format!(
                    "{}\t{}\t{}\t{}",
                    company.id, company.nama, company.prefix, company.url
                );
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
        }
        CliCommand::Send { feature, message } => {
            let (_, client) = authorized_client()?;
            let message = match feature {
                Some(feature) => feature.message(&message),
                None => message,
            };
            client.send_message(&message)?;
            write_line(&mut out, &format!("sent: {message}"))?;
        }
        CliCommand::Button { data } => {
            let (_, client) = authorized_client()?;
            client.send_button(&data)?;
            write_line(&mut out, &format!("sent button: {data}"))?;
        }
    }

    out.flush()?;
    Ok(())
}

fn authorized_client() -> Result<(Config, ApiClient), CliRunError> {
    let config = Config::from_env()?;
    let session = load_session(&config.state_dir)?;
    let Some(token) = session.token() else {
        return Err(CliRunError::NotLoggedIn);
    };
    debug!(user = session.username().unwrap_or("-"), "using stored session");
    let client = ApiClient::from_config(&config, Some(token.to_string()))?;
    Ok((config, client))
}

fn read_input(file: Option<&PathBuf>) -> Result<String, CliRunError> {
    match file {
        Some(path) => fs::read_to_string(path).map_err(|source| CliRunError::ReadInput {
            path: path.display().to_string(),
            source,
        }),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| CliRunError::ReadInput {
                    path: "stdin".to_string(),
                    source,
                })?;
            Ok(text)
        }
    }
}

fn print_parsed(
    out: &mut impl Write,
    text: String,
    mime: Option<String>,
    export: bool,
) -> Result<(), CliRunError> {
    let message = RawMessage {
        id: 0,
        text: Some(text),
        mime_type: mime,
        ..RawMessage::default()
    };
    let is_jpeg = message.is_jpeg();
    let mut timeline = Timeline::default();
    timeline.push(message);
    let Some(entry) = timeline.entries().into_iter().next() else {
        write_line(out, "decision: hidden")?;
        return Ok(());
    };

    if export {
        let text = timeline.export_text(entry.id).unwrap_or_default();
        write_line(out, &text)?;
        return Ok(());
    }

    write_line(out, &format!("decision: {}", entry.view.decision().label()))?;
    if is_jpeg {
        write_line(out, "attachment: image/jpeg")?;
    }
    write_line(out, "")?;
    write_line(out, &render_view(&entry.view))?;
    Ok(())
}

fn copy_message(
    out: &mut impl Write,
    timeline: &mut Timeline,
    id: i64,
) -> Result<(), CliRunError> {
    let entries = timeline.entries();
    let Some(entry) = entries.iter().find(|entry| entry.id == id) else {
        return Err(CliRunError::MessageNotFound(id));
    };
    if !entry.view.is_copyable() {
        return Err(CliRunError::NotCopyable(id));
    }
    let Some(text) = timeline.export_text(id) else {
        return Err(CliRunError::MessageNotFound(id));
    };
    match copy_text_to_clipboard(&text) {
        Ok(()) => {
            write_line(out, &format!("copied message {id}"))?;
        }
        Err(error) => warn!(%error, id, "copy failed"),
    }
    Ok(())
}

fn watch(
    out: &mut impl Write,
    config: &Config,
    timeline: &mut Timeline,
    limit: usize,
) -> Result<(), CliRunError> {
    let mut printed: HashSet<i64> = HashSet::new();
    let entries = timeline.entries();
    let skip = entries.len().saturating_sub(limit);
    for entry in &entries {
        printed.insert(entry.id);
    }
    for entry in &entries[skip..] {
        if !print_entry(out, entry)? {
            return Ok(());
        }
    }
    out.flush()?;

    let mut channel = SocketChannel::connect(config)?;
    channel.subscribe(BOT_TOPIC)?;
    let stderr = io::stderr();
    let mut err = stderr.lock();

    loop {
        thread::sleep(WATCH_POLL);
        let outcome = timeline.drain(&mut channel);
        if outcome.appended > 0 || outcome.dropped > 0 {
            debug!(
                appended = outcome.appended,
                dropped = outcome.dropped,
                total = timeline.messages().len(),
                cached = timeline.cached_views(),
                "drained push channel"
            );
        }

        if outcome.appended > 0 {
            for entry in timeline.entries() {
                if !printed.insert(entry.id) {
                    continue;
                }
                if !print_entry(out, &entry)? {
                    channel.close();
                    return Ok(());
                }
            }
            out.flush()?;
        }

        if let Some(message) = timeline.last_error().map(str::to_string) {
            write_line(&mut err, &format!("error: {message}"))?;
            timeline.clear_error();
        }

        if outcome.closed {
            channel.unsubscribe();
            channel.close();
            return Ok(());
        }
    }
}

fn print_entry(out: &mut impl Write, entry: &TimelineEntry) -> io::Result<bool> {
    let mut header = format!(
        "#{}\t{}\t{}",
        entry.id,
        entry.created_at.as_deref().unwrap_or("-"),
        entry.view.decision().label()
    );
    if let Some(username) = &entry.username {
        header.push('\t');
        header.push_str(username);
    }
    if entry.view.is_copyable() {
        header.push_str("\t[copy]");
    }
    if !write_line(out, &header)? {
        return Ok(false);
    }
    let body = render_view(&entry.view);
    if !body.is_empty() && !write_line(out, &body)? {
        return Ok(false);
    }
    if let Some(url) = &entry.image_url {
        if !write_line(out, &format!("image: {url}"))? {
            return Ok(false);
        }
    }
    for button in &entry.buttons {
        if !write_line(out, &format!("button: {}\t{}", button.text, button.data))? {
            return Ok(false);
        }
    }
    write_line(out, "")
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(error) => Err(error),
    }
}

fn parse_usize_flag(flag: &str, value: &str) -> Result<usize, CliParseError> {
    value
        .parse::<usize>()
        .map_err(|_| CliParseError::InvalidFlagValue {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}

fn parse_id_flag(flag: &str, value: &str) -> Result<i64, CliParseError> {
    value
        .trim_start_matches('#')
        .parse::<i64>()
        .map_err(|_| CliParseError::InvalidFlagValue {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}
