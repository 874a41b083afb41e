//! Upskill CLI
//!
//! Line-based chat with the upskill assistant. Plain lines are sent as chat
//! messages; lines starting with `/` are commands (see `/help`).

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use upskill::bookshelf::ShelfFilter;
use upskill::config::load_config;
use upskill::{
    AddOutcome, AppEvent, AppState, Author, ChatTransport, FileStore, HttpTransport, MemoryStore,
    SharedStore, SkillDomain, UpskillError,
};

const HELP: &str = "\
Commands:
  /domain <data-science|business|both>  switch skill domain
  /add <n|all>                          add recommendation n from the last reply
  /shelf [all|read|unread]              show the bookshelf
  /toggle <title>                       mark a book read/unread
  /clear                                remove every book (asks first)
  /dark                                 toggle dark mode
  /help                                 show this help
  /quit                                 exit
Anything else is sent to the assistant.";

/// Upskill - chat with a skill-domain assistant and keep a bookshelf
#[derive(Parser, Debug)]
#[command(name = "upskill")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Chat endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory for the persisted bookshelf and preferences
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skill domain to start with
    #[arg(long)]
    domain: Option<SkillDomain>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Keep everything in memory, nothing is written to disk
    #[arg(long)]
    ephemeral: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// What the next input line answers
enum Pending {
    Idle,
    ConfirmClear,
}

enum Command {
    Chat(String),
    Domain(SkillDomain),
    Add(AddTarget),
    Shelf(ShelfFilter),
    Toggle(String),
    Clear,
    Dark,
    Help,
    Quit,
}

enum AddTarget {
    Index(usize),
    All,
}

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Chat(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "domain" => arg.parse().map(Command::Domain),
        "add" if arg == "all" => Ok(Command::Add(AddTarget::All)),
        "add" => arg
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .map(|n| Command::Add(AddTarget::Index(n - 1)))
            .ok_or_else(|| "usage: /add <n|all>".to_string()),
        "shelf" => arg.parse().map(Command::Shelf),
        "toggle" if !arg.is_empty() => Ok(Command::Toggle(arg.to_string())),
        "toggle" => Err("usage: /toggle <title>".to_string()),
        "clear" => Ok(Command::Clear),
        "dark" => Ok(Command::Dark),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '/{}', try /help", other)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }
    if let Some(domain) = cli.domain {
        config = config.with_initial_domain(domain);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let store: SharedStore = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open(config.data_dir.clone())?)
    };
    info!("Endpoint: {}", config.endpoint);
    info!("Data directory: {:?}", config.data_dir);

    let transport: Arc<dyn ChatTransport> =
        Arc::new(HttpTransport::new(config.endpoint.clone(), config.request_timeout));
    let mut app = AppState::load(store, config.initial_domain)?;
    let mut events = app.subscribe();

    println!(
        "Upskill - focusing on {} skills. Type /help for commands.",
        app.session().current().label()
    );

    // Spawn blocking thread to read from stdin
    let (input_tx, mut input_rx) = mpsc::channel::<String>(32);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if input_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    let mut in_flight: Option<JoinHandle<upskill::Result<String>>> = None;
    let mut pending = Pending::Idle;

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else { break };

                if let Pending::ConfirmClear = pending {
                    pending = Pending::Idle;
                    if matches!(line.trim(), "y" | "Y" | "yes") {
                        if let Err(e) = app.clear_bookshelf() {
                            error!("Failed to clear bookshelf: {}", e);
                        }
                    } else {
                        println!("Bookshelf kept.");
                    }
                    render(&mut events);
                    continue;
                }

                if line.trim().is_empty() {
                    continue;
                }

                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Chat(message)) => {
                        if let Some(request) = app.begin_chat(&message) {
                            let transport = transport.clone();
                            in_flight = Some(tokio::spawn(async move {
                                transport.send(&request).await
                            }));
                        }
                    }
                    Ok(Command::Clear) => {
                        if app.bookshelf().is_empty() {
                            println!("Your bookshelf is already empty.");
                        } else {
                            print!("Remove all {} books from your bookshelf? [y/N] ", app.bookshelf().len());
                            let _ = io::stdout().flush();
                            pending = Pending::ConfirmClear;
                        }
                    }
                    Ok(command) => {
                        if let Err(e) = run_command(&mut app, command) {
                            error!("{}", e);
                            println!("Something went wrong: {}", e);
                        }
                    }
                    Err(usage) => println!("{}", usage),
                }
                render(&mut events);
            }
            joined = async {
                match in_flight.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                let result = joined
                    .unwrap_or_else(|e| Err(UpskillError::Transport(format!("request task failed: {e}"))));
                app.finish_chat(result);
                render(&mut events);
            }
        }
    }

    if let Some(handle) = in_flight {
        handle.abort();
    }
    Ok(())
}

fn run_command(app: &mut AppState, command: Command) -> upskill::Result<()> {
    match command {
        Command::Domain(domain) => {
            if app.session().current() == domain {
                println!("Already focusing on {} skills.", domain.label());
            } else {
                app.select_domain(domain);
                println!("Skill domain: {}", domain.label());
            }
        }
        Command::Add(target) => {
            let count = app
                .last_reply()
                .map(|r| r.new_recommendations.len())
                .unwrap_or(0);
            let indices: Vec<usize> = match target {
                AddTarget::All => (0..count).collect(),
                AddTarget::Index(i) => vec![i],
            };
            if indices.is_empty() {
                println!("No recommendations to add.");
            }
            for index in indices {
                match app.add_from_last_reply(index)? {
                    Some(AddOutcome::Added(book)) => {
                        println!("Added \"{}\" by {}", book.title, book.author)
                    }
                    Some(AddOutcome::AlreadyPresent) => println!("Already on your bookshelf."),
                    None => println!("No recommendation #{}.", index + 1),
                }
            }
        }
        Command::Shelf(filter) => print_shelf(&app.list_books(filter)),
        Command::Toggle(title) => {
            if app.toggle_read(&title)?.is_none() {
                println!("\"{}\" is not on your bookshelf.", title);
            }
        }
        Command::Dark => {
            app.toggle_dark_mode()?;
        }
        Command::Help => println!("{}", HELP),
        Command::Chat(_) | Command::Clear | Command::Quit => {}
    }
    Ok(())
}

/// Print every queued event
fn render(events: &mut mpsc::UnboundedReceiver<AppEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            AppEvent::Message { author: Author::User, .. } => {}
            AppEvent::Message { author: Author::Bot, text } => println!("\nbot> {}\n", text),
            AppEvent::Persona(text) => println!("\nbot> {}\n", text),
            AppEvent::Recommendations(recs) => {
                println!("Recommended books (/add <n> to save):");
                for (i, rec) in recs.iter().enumerate() {
                    println!("  {}. \"{}\" by {}", i + 1, rec.title, rec.author);
                }
            }
            AppEvent::Resources(resources) => {
                println!("Resources:");
                for resource in resources {
                    println!("  - {} <{}>", resource.title, resource.url);
                }
            }
            AppEvent::BookshelfChanged(books) => print_shelf(&books),
            AppEvent::DarkModeChanged(enabled) => {
                println!("Dark mode {}.", if enabled { "on" } else { "off" })
            }
            AppEvent::Waiting(true) => println!("..."),
            AppEvent::Waiting(false) => {}
            AppEvent::Busy => println!("Still waiting for the previous answer."),
        }
    }
}

fn print_shelf(books: &[upskill::Book]) {
    if books.is_empty() {
        println!("Your bookshelf is empty.");
        return;
    }
    println!("Bookshelf:");
    for book in books {
        println!(
            "  [{}] \"{}\" by {} ({}, added {})",
            if book.read { "x" } else { " " },
            book.title,
            book.author,
            book.category.label(),
            book.date_added.format("%Y-%m-%d")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_and_commands() {
        assert!(matches!(parse_command("hello there"), Ok(Command::Chat(m)) if m == "hello there"));
        assert!(matches!(
            parse_command("/domain business"),
            Ok(Command::Domain(SkillDomain::Business))
        ));
        assert!(matches!(parse_command("/add 2"), Ok(Command::Add(AddTarget::Index(1)))));
        assert!(matches!(parse_command("/add all"), Ok(Command::Add(AddTarget::All))));
        assert!(matches!(parse_command("/shelf read"), Ok(Command::Shelf(ShelfFilter::ReadOnly))));
        assert!(matches!(parse_command("/shelf"), Ok(Command::Shelf(ShelfFilter::All))));
        assert!(matches!(parse_command("/toggle Deep Work"), Ok(Command::Toggle(t)) if t == "Deep Work"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("/add 0").is_err());
        assert!(parse_command("/toggle").is_err());
        assert!(parse_command("/domain marketing").is_err());
        assert!(parse_command("/nope").is_err());
    }
}
