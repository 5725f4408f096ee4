//! # ideabase-client
//!
//! The client side of the IdeaBase upload pathway: the session guard, the
//! local file validator, an HTTP client for the API, and the state behind
//! the note-creation screen. The `ideabase` binary is a thin CLI over it.
//!
//! ```rust,ignore
//! use ideabase_client::{ApiClient, FileCandidate, SessionGuard, NoteComposer};
//!
//! let client = ApiClient::new("http://localhost:3000")?.with_session(session.clone());
//! let mut composer = NoteComposer::new(client, SessionGuard::new(session));
//! composer.title = "Trip".into();
//! println!("{}", composer.save().await.message);
//! composer.attach(&FileCandidate::from_path("ticket.pdf")?).await;
//! ```

pub mod candidate;
pub mod client;
pub mod composer;
pub mod config;
pub mod error;
pub mod session;

pub use candidate::FileCandidate;
pub use client::ApiClient;
pub use composer::{NoteComposer, NoteService, Notice, NoticeLevel, SaveState, UploadState};
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{SessionGuard, SessionStore, StoredSession};
