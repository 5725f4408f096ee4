//! ideabase: command-line client for IdeaBase notes and attachments.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ideabase_client::{
    ApiClient, ClientConfig, FileCandidate, NoteComposer, Notice, SessionGuard, SessionStore,
    StoredSession,
};
use ideabase_core::{Credentials, Transport};

#[derive(Parser)]
#[command(name = "ideabase")]
#[command(author, version, about = "Notes and attachments from the command line")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CredentialArgs {
    #[arg(short, long)]
    email: String,

    #[arg(short, long, env = "IDEABASE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup(CredentialArgs),

    /// Sign in and remember the session
    Signin(CredentialArgs),

    /// End the current session
    Signout,

    /// Show who is signed in
    Whoami,

    /// Work with notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Upload a file as an attachment
    Upload {
        file: PathBuf,

        /// Link the attachment to this note
        #[arg(short, long)]
        note: Option<Uuid>,

        /// How to send the bytes: multipart or json
        #[arg(short, long, default_value = "multipart")]
        transport: Transport,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Save a new note, then upload any attachments to it
    New {
        #[arg(short, long)]
        title: String,

        /// Note body (markup)
        #[arg(short, long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the note body from a file
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Files to attach after saving (repeatable)
        #[arg(short, long)]
        attach: Vec<PathBuf>,

        #[arg(long, default_value = "multipart")]
        transport: Transport,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when a user-facing action failed.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = ClientConfig::from_env()?;
    let store = SessionStore::new(config.session_file.clone());
    let session = store.load()?;
    let client = ApiClient::new(&config.api_url)?.with_session(session.clone());

    match cli.command {
        Commands::Signup(args) => {
            let session = client.sign_up(&args.into()).await?;
            store.save(&StoredSession::from(session.clone()))?;
            println!("Account created successfully!");
            print_json(&serde_json::json!({
                "user_id": session.user_id,
                "email": session.email,
                "expires_at": session.expires_at,
            }))?;
        }
        Commands::Signin(args) => {
            let session = client.sign_in(&args.into()).await?;
            store.save(&StoredSession::from(session.clone()))?;
            println!("Signed in successfully!");
            print_json(&serde_json::json!({
                "user_id": session.user_id,
                "email": session.email,
                "expires_at": session.expires_at,
            }))?;
        }
        Commands::Signout => {
            if session.is_none() {
                println!("Not signed in");
                return Ok(true);
            }
            if let Err(e) = client.sign_out().await {
                // The local session is dropped either way.
                tracing::warn!(error = %e, "Server sign-out failed");
            }
            store.clear()?;
            println!("Signed out");
        }
        Commands::Whoami => {
            let identity = client.current_session().await?;
            print_json(&identity)?;
        }
        Commands::Upload {
            file,
            note,
            transport,
        } => {
            let candidate = FileCandidate::from_path(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let receipt = client.upload(&candidate, transport, note).await?;
            println!("{}", receipt.message);
            print_json(&receipt)?;
        }
        Commands::Note {
            command:
                NoteCommands::New {
                    title,
                    content,
                    content_file,
                    attach,
                    transport,
                },
        } => {
            let content = match (content, content_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Cannot read {}", path.display()))?,
                (None, None) => String::new(),
            };

            let mut composer =
                NoteComposer::new(client, SessionGuard::new(session)).with_transport(transport);
            composer.title = title;
            composer.content = content;

            let notice = composer.save().await;
            report(&notice);
            if notice.is_error() {
                return Ok(false);
            }
            if let Some(id) = composer.note_id() {
                println!("{}", id);
            }

            let mut ok = true;
            for path in attach {
                let notice = match FileCandidate::from_path(&path) {
                    Ok(candidate) => composer.attach(&candidate).await,
                    Err(e) => Notice::error(format!("{}: {}", path.display(), e)),
                };
                report(&notice);
                ok &= !notice.is_error();
            }
            return Ok(ok);
        }
    }
    Ok(true)
}

impl From<CredentialArgs> for Credentials {
    fn from(args: CredentialArgs) -> Self {
        Credentials {
            email: args.email,
            password: args.password,
        }
    }
}

fn report(notice: &Notice) {
    if notice.is_error() {
        eprintln!("{}", notice.message);
    } else {
        println!("{}", notice.message);
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
