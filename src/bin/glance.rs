// glance - analyze an image with a prompt and stream the answer

use clap::Parser;
use glance::config::{self, CONFIG_FILE_NAME};
use glance::session::parse_line;
use glance::{Command, LineAction, Outcome, Reply, Session, TerminalPresenter};
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Ask an image analysis server about an image and stream the answer", long_about = None)]
struct Args {
    /// Prompt to send; runs a single analysis and exits
    #[arg(short, long)]
    prompt: Option<String>,

    /// Local image to upload
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Image URL for the server to fetch (ignored when --file is given)
    #[arg(short, long)]
    url: Option<String>,

    /// Server base URL (overrides config and GLANCE_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Config file (default: ./.glance.json, then ~/.glance.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the result after a single analysis
    #[arg(long)]
    save: bool,

    /// Create an example .glance.json in the current directory
    #[arg(long)]
    init: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("glance={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn print_help() {
    println!("Type a prompt and press Enter to analyze the selected image.");
    println!();
    println!("Commands:");
    println!("  /file <path>   Select a local image");
    println!("  /url <url>     Use an image URL (a selected file takes precedence)");
    println!("  /clear         Forget the selected file and URL");
    println!("  /analyze       Analyze again with the current prompt");
    println!("  /save          Save the displayed prompt and answer");
    println!("  /theme         Toggle light/dark output");
    println!("  /help          Show this help");
    println!("  exit           Quit");
    println!();
}

fn report(reply: &Reply) {
    match reply {
        Reply::Selected(label) => println!("{}", label),
        Reply::Cleared => println!("Image selection cleared."),
        Reply::PromptSet => {}
        Reply::Analyzed(Outcome::Busy) => println!("An analysis is already running."),
        Reply::Analyzed(_) => println!(),
        Reply::Saved(path) => println!("Saved to {}", path.display()),
        Reply::NothingToSave => println!("Nothing to save yet."),
        Reply::ThemeChanged(theme) => println!("Theme: {}", theme.as_str()),
    }
}

async fn run_once(
    session: &mut Session<TerminalPresenter>,
    prompt: String,
    save: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    session.dispatch(Command::SetPrompt(prompt)).await?;

    let succeeded = match session.dispatch(Command::Analyze).await? {
        Reply::Analyzed(Outcome::Completed { .. }) => true,
        Reply::Analyzed(outcome) => {
            tracing::debug!("Analysis did not complete: {:?}", outcome);
            false
        }
        _ => false,
    };

    if save && succeeded {
        report(&session.dispatch(Command::Save).await?);
    }

    Ok(succeeded)
}

async fn run_interactive(
    session: &mut Session<TerminalPresenter>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("glance v{} - image analysis", env!("CARGO_PKG_VERSION"));
    println!("Server: {}", session.config().analyze_url());
    println!("{}\n", session.input().describe());
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let commands = match parse_line(&line) {
            LineAction::Run(commands) => commands,
            LineAction::Help => {
                print_help();
                continue;
            }
            LineAction::Exit => break,
            LineAction::Empty => continue,
            LineAction::Unknown(input) => {
                eprintln!("Unknown command: {}", input);
                eprintln!("Use /help for a list of commands");
                continue;
            }
        };

        for command in commands {
            match session.dispatch(command).await {
                Ok(reply) => report(&reply),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    break;
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn run(
    session: &mut Session<TerminalPresenter>,
    prompt: Option<String>,
    save: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    match prompt {
        Some(prompt) => Ok(if run_once(session, prompt, save).await? { 0 } else { 1 }),
        None => {
            run_interactive(session).await?;
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.init {
        config::create_example_config(&PathBuf::from(CONFIG_FILE_NAME))?;
        println!("Created {}", CONFIG_FILE_NAME);
        return Ok(());
    }

    let (mut config, config_path) = config::load_config(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }

    let presenter = TerminalPresenter::new(config.theme, config.render_markdown);
    let mut session = Session::connect(config, config_path, presenter)?;

    if let Some(file) = args.file {
        report(&session.dispatch(Command::SelectFile(file)).await?);
    }
    if let Some(url) = args.url {
        session.dispatch(Command::SetUrl(url)).await?;
    }

    // Dropping the running analysis on Ctrl-C restores the terminal before exit
    let exit_code = tokio::select! {
        result = run(&mut session, args.prompt, args.save) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("Interrupted");
            130
        }
    };
    drop(session);

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
