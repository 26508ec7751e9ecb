//! Docchat - chat with a PDF document through a RAG backend.
//!
//! This CLI uploads a document, waits for the backend to index it, then
//! holds a multi-turn conversation grounded in that document with cited
//! source pages.
//!
//! Architecture:
//! - The CLI is a thin client; all retrieval and answering happens in the
//!   remote backend, reached over HTTP
//! - An upload controller drives an explicit state machine per attempt
//!   (idle, uploading, processing, error) and produces a `Session`
//! - A session store owns the single live session and its append-only
//!   transcript; a conversation controller serializes chat turns against it

mod api;
mod chat;
mod cli;
mod config;
mod models;
mod render;
mod session;
mod upload;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let cli = Cli::parse();
    execute(cli).await
}
