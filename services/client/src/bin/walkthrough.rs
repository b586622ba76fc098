//! services/client/src/bin/walkthrough.rs

use clap::{Parser, Subcommand};
use client_lib::{
    adapters::{FileAuthStorage, FramedChannel, HttpApiClient},
    app::{auth, AuthStore, ExtensionBridge, SessionLifecycleController},
    config::Config,
    error::ApiError,
};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkthrough_core::domain::{ExtensionEvent, Feedback, Session, SessionId, User};

#[derive(Parser)]
#[command(name = "walkthrough", version, about = "Client for walkthrough recording sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and log in
    Signup {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and remember the token
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Show the logged-in user
    Whoami,
    #[command(subcommand)]
    Sessions(SessionsCommand),
    #[command(subcommand)]
    Feedback(FeedbackCommand),
    /// List the extension events captured for a session
    Events { session_id: SessionId },
    /// Send the auth state to the extension as length-prefixed frames on stdout
    Bridge {
        /// Keep running and forward every change, polling storage every SECS seconds
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },
}

#[derive(Subcommand)]
enum SessionsCommand {
    List,
    Create { name: String },
    Process { session_id: SessionId },
    /// Session with its feedback and extension events
    Show { session_id: SessionId },
}

#[derive(Subcommand)]
enum FeedbackCommand {
    List { session_id: SessionId },
    Add { session_id: SessionId, text: String },
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Using API at {}", config.api_base_url);

    // --- 2. Restore the Auth Session ---
    let storage = Arc::new(FileAuthStorage::new(config.auth_store_path.clone()));
    let auth_store = Arc::new(AuthStore::new(storage));

    // --- 3. Initialize the API Adapter ---
    let api = Arc::new(HttpApiClient::new(
        config.api_base_url.clone(),
        auth_store.clone(),
        config.http_timeout,
    )?);
    let controller = SessionLifecycleController::new(api.clone());

    // --- 4. Run the Command ---
    match cli.command {
        Command::Signup { email, password } => {
            let user = auth::signup(&*api, &auth_store, &email, &password).await?;
            print_json(&user_json(&user))?;
        }
        Command::Login { email, password } => {
            let user = auth::login(&*api, &auth_store, &email, &password).await?;
            print_json(&user_json(&user))?;
        }
        Command::Logout => {
            auth::logout(&auth_store);
            print_json(&json!({ "loggedOut": true }))?;
        }
        Command::Whoami => match auth_store.user() {
            Some(user) => print_json(&user_json(&user))?,
            None => print_json(&Value::Null)?,
        },
        Command::Sessions(SessionsCommand::List) => {
            let sessions = controller.load_sessions().await?;
            print_json(&Value::Array(sessions.iter().map(session_json).collect()))?;
        }
        Command::Sessions(SessionsCommand::Create { name }) => {
            let session = controller.create_session(&name).await?;
            print_json(&session_json(&session))?;
        }
        Command::Sessions(SessionsCommand::Process { session_id }) => {
            controller.load_sessions().await?;
            match controller.process_session(session_id).await? {
                Some(session) => print_json(&session_json(&session))?,
                None => print_json(&json!({ "id": session_id, "requested": true }))?,
            }
        }
        Command::Sessions(SessionsCommand::Show { session_id }) => {
            let detail = controller.open_session(session_id).await?;
            print_json(&json!({
                "session": session_json(&detail.session),
                "feedback": detail.feedback.iter().map(feedback_json).collect::<Vec<_>>(),
                "extensionEvents": detail.events.iter().map(event_json).collect::<Vec<_>>(),
            }))?;
        }
        Command::Feedback(FeedbackCommand::List { session_id }) => {
            let feedback = controller.load_feedback(session_id).await?;
            print_json(&Value::Array(feedback.iter().map(feedback_json).collect()))?;
        }
        Command::Feedback(FeedbackCommand::Add { session_id, text }) => {
            let feedback = controller.submit_feedback(session_id, &text).await?;
            print_json(&feedback_json(&feedback))?;
        }
        Command::Events { session_id } => {
            let events = controller.load_extension_events(session_id).await?;
            print_json(&Value::Array(events.iter().map(event_json).collect()))?;
        }
        Command::Bridge { watch } => {
            let channel = Arc::new(FramedChannel::stdout());
            let origin = config.bridge_origin.clone();
            let bridge = ExtensionBridge::new(auth_store.clone(), channel, origin);
            match watch {
                None => bridge.announce().await,
                Some(secs) => {
                    let poll = Duration::from_secs(secs.max(1));
                    run_bridge(bridge, &auth_store, poll).await?;
                }
            }
        }
    }

    Ok(())
}

/// Forwards auth changes until Ctrl-C, re-reading storage so that logins
/// from other invocations reach the extension too.
async fn run_bridge(
    bridge: ExtensionBridge,
    auth_store: &AuthStore,
    poll: Duration,
) -> Result<(), ApiError> {
    let shutdown = CancellationToken::new();
    let handle = bridge.spawn(shutdown.clone());
    let mut interval = tokio::time::interval(poll);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                auth_store.refresh();
            }
        }
    }

    shutdown.cancel();
    handle
        .await
        .map_err(|e| ApiError::Internal(format!("bridge task failed: {}", e)))
}

fn print_json(value: &Value) -> Result<(), ApiError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "email": user.email,
        "createdAt": user.created_at,
    })
}

fn session_json(session: &Session) -> Value {
    json!({
        "id": session.id,
        "name": session.name,
        "status": session.status.as_str(),
        "scriptText": session.script_text,
        "audioFileName": session.audio_file_name,
        "userId": session.user_id,
        "createdAt": session.created_at,
        "updatedAt": session.updated_at,
    })
}

fn feedback_json(feedback: &Feedback) -> Value {
    json!({
        "id": feedback.id,
        "sessionId": feedback.session_id,
        "text": feedback.text,
        "createdAt": feedback.created_at,
        "updatedAt": feedback.updated_at,
    })
}

fn event_json(event: &ExtensionEvent) -> Value {
    json!({
        "id": event.id,
        "sessionId": event.session_id,
        "url": event.url,
        "steps": event.steps.iter().map(|step| step.label()).collect::<Vec<_>>(),
        "createdAt": event.created_at,
        "updatedAt": event.updated_at,
    })
}
