//! htime - terminal front end for the hTime scheduling assistant

mod commands;
mod config;
mod render;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use htime_ai::{ChatEndpoint, HttpChatEndpoint};
use htime_assistant::{
    CannedEndpoint, ChatSession, Dispatch, FileStateRepository, LiveSession, ParticipantForm,
    Payload, ProfileConfig,
};
use tokio::sync::broadcast;

use commands::CommandResult;
use render::Renderer;

/// htime - chat with an hTime scheduling assistant
#[derive(Parser, Debug)]
#[command(name = "htime")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chat-completion endpoint URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Profile configuration JSON file
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Name the assistant greets with
    #[arg(short, long)]
    agent_name: Option<String>,

    /// Use canned replies instead of the endpoint
    #[arg(long)]
    offline: bool,

    /// Send a single message and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Join the live session under this name
    #[arg(long, requires = "email")]
    join: Option<String>,

    /// Email for --join
    #[arg(long)]
    email: Option<String>,

    /// Company for --join
    #[arg(long)]
    company: Option<String>,

    /// List live session participants
    #[arg(long)]
    participants: bool,

    /// End the live session
    #[arg(long)]
    end_session: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("htime=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    if args.join.is_some() || args.participants || args.end_session {
        return run_live(&args, &cfg);
    }

    // CLI args take precedence over the config file
    let agent_name = args
        .agent_name
        .clone()
        .or(cfg.agent_name.clone())
        .unwrap_or_else(|| "hTime Assistant".to_string());

    let profile_path = args
        .profile
        .clone()
        .or(cfg.profile_file.as_ref().map(PathBuf::from));
    let profile = match profile_path {
        Some(path) => load_profile(&path)?,
        None => ProfileConfig::default(),
    };

    let endpoint = build_endpoint(&args, &cfg);
    let mut chat = ChatSession::new(agent_name, profile, endpoint);
    chat.set_on_schedule(|meeting| {
        tracing::info!("Meeting scheduled for {}: {}", meeting.time, meeting.details);
    });

    let mut renderer = Renderer::new();
    renderer.replay(chat.messages());
    let mut events = chat.subscribe();

    if let Some(command) = args.command {
        println!("you> {}", command);
        run_with_events(&mut chat, &mut events, &mut renderer, Input::Text(command)).await?;
        return Ok(());
    }

    run_interactive(&mut chat, &mut events, &mut renderer).await
}

fn build_endpoint(args: &Args, cfg: &config::Config) -> Arc<dyn ChatEndpoint> {
    let offline = args.offline || cfg.offline.unwrap_or(false);
    let url = args.endpoint.clone().or(cfg.endpoint.clone());

    if offline {
        tracing::debug!("Offline; using canned replies");
        return Arc::new(CannedEndpoint::default());
    }

    // Fall back to HTIME_CHAT_URL when neither args nor config name an endpoint
    let endpoint = match url {
        Some(url) => HttpChatEndpoint::new(url),
        None => match HttpChatEndpoint::from_env() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::debug!("{}; using canned replies", e);
                return Arc::new(CannedEndpoint::default());
            }
        },
    };

    tracing::debug!("Using chat endpoint {}", endpoint.url());
    match cfg.api_key() {
        Some(key) => Arc::new(endpoint.with_api_key(key)),
        None => Arc::new(endpoint),
    }
}

fn load_profile(path: &std::path::Path) -> anyhow::Result<ProfileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {}", path.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse profile {}", path.display()))?;
    Ok(ProfileConfig::new(raw))
}

fn run_live(args: &Args, cfg: &config::Config) -> anyhow::Result<()> {
    let dir = cfg
        .state_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(FileStateRepository::default_dir);
    let live = LiveSession::new(Arc::new(FileStateRepository::new(dir)));

    if let Some(ref name) = args.join {
        let participant = live.join(ParticipantForm {
            name: name.clone(),
            email: args.email.clone().unwrap_or_default(),
            company: args.company.clone().unwrap_or_default(),
            ..Default::default()
        })?;
        println!(
            "Joined {} as {} ({})",
            live.code(),
            participant.form.name,
            participant.id
        );
    }

    if args.participants {
        let participants = live.participants()?;
        let status = if live.is_active()? { "live" } else { "ended" };
        println!(
            "{} [{}]: {} participants joined (join at {})",
            live.code(),
            status,
            participants.len(),
            live.join_path()
        );
        for p in participants {
            let company = if p.form.company.is_empty() {
                String::new()
            } else {
                format!(", {}", p.form.company)
            };
            println!(
                "  {:<3} {}{} <{}>  joined {}",
                p.initials(),
                p.form.name,
                company,
                p.form.email,
                p.joined_at.format("%H:%M")
            );
        }
    }

    if args.end_session {
        live.end()?;
        println!("Ended live session {}", live.code());
    }

    Ok(())
}

enum Input {
    Text(String),
    Slot(String),
    Action { kind: String, payload: Option<Payload> },
    Click(htime_assistant::QuickAction),
}

async fn dispatch(chat: &mut ChatSession, input: Input) -> Dispatch {
    match input {
        Input::Text(text) => chat.send_text(&text).await,
        Input::Slot(slot) => chat.time_slot_selected(&slot).await,
        Input::Action { kind, payload } => chat.handle_action(&kind, payload).await,
        Input::Click(action) => chat.trigger(&action).await,
    }
}

/// Run one input while rendering events as they arrive
async fn run_with_events(
    chat: &mut ChatSession,
    events: &mut broadcast::Receiver<htime_assistant::ChatEvent>,
    renderer: &mut Renderer,
    input: Input,
) -> anyhow::Result<Dispatch> {
    let outcome = {
        let fut = dispatch(chat, input);
        tokio::pin!(fut);
        loop {
            tokio::select! {
                outcome = &mut fut => break outcome,
                Ok(event) = events.recv() => renderer.render(&event),
            }
        }
    };

    while let Ok(event) = events.try_recv() {
        renderer.render(&event);
    }
    renderer.finish_line();

    if outcome == Dispatch::Ignored {
        tracing::debug!("Input ignored");
    }
    Ok(outcome)
}

async fn run_interactive(
    chat: &mut ChatSession,
    events: &mut broadcast::Receiver<htime_assistant::ChatEvent>,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let input = match commands::parse_command(line) {
            None => Input::Text(line.to_string()),
            Some(CommandResult::Slot(slot)) => Input::Slot(slot),
            Some(CommandResult::Action { kind, payload }) => {
                let payload = match payload.as_deref().map(parse_payload).transpose() {
                    Ok(payload) => payload,
                    Err(e) => {
                        println!("Invalid payload: {}", e);
                        continue;
                    }
                };
                Input::Action { kind, payload }
            }
            Some(CommandResult::Click(n)) => {
                let action = chat
                    .messages()
                    .last()
                    .and_then(|m| m.actions.get(n - 1))
                    .cloned();
                match action {
                    Some(action) => Input::Click(action),
                    None => {
                        println!("No action #{} on the last message.", n);
                        continue;
                    }
                }
            }
            Some(CommandResult::Reset) => {
                chat.reset();
                renderer.replay(chat.messages());
                continue;
            }
            Some(CommandResult::Message(msg)) => {
                println!("{}", msg);
                continue;
            }
            Some(CommandResult::Exit) => break,
            Some(CommandResult::Unknown(cmd)) => {
                println!("Unknown command: /{}", cmd);
                println!("Type /help for available commands.");
                continue;
            }
        };

        run_with_events(chat, events, renderer, input).await?;
    }

    chat.handle().close();
    Ok(())
}

fn parse_payload(raw: &str) -> anyhow::Result<Payload> {
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("payload must be a JSON object"),
    }
}
