//! CLI command execution.
//!
//! This is a thin client - all document knowledge lives behind the backend.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::api::{ApiClient, Backend};
use crate::chat::{ConversationController, SendOutcome};
use crate::config::{self, Config};
use crate::models::{Message, MessageRole, Session, UploadState};
use crate::render::{self, ContentLine};
use crate::session::SessionStore;
use crate::upload::{UploadController, UploadEvent};

use super::args::{AssistTool, Cli, Commands};

/// Documented soft ceiling; nothing is enforced beyond the extension check.
const SOFT_PAGE_LIMIT: u32 = 200;

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let client = build_client()?;

    match cli.command {
        Some(Commands::Chat { file }) => chat_session(client, &file).await,
        Some(Commands::Ask { file, question }) => {
            let question = question.join(" ");
            if question.trim().is_empty() {
                bail!("A question is required for the ask command");
            }
            ask_once(client, &file, &question).await
        }
        Some(Commands::Info { session_id }) => show_session(&client, &session_id).await,
        Some(Commands::Close { session_id }) => close_session(&client, &session_id).await,
        Some(Commands::Login { username, password }) => login(&client, &username, &password).await,
        Some(Commands::Register { username, password }) => {
            register(&client, &username, &password).await
        }
        Some(Commands::Logout) => logout(),
        Some(Commands::Assist { tool }) => assist(&client, tool).await,
        None => match cli.file {
            Some(file) => chat_session(client, &file).await,
            None => {
                print_usage();
                Ok(())
            }
        },
    }
}

fn build_client() -> Result<Arc<ApiClient>> {
    let config = Config::load();
    let auth = config::load_credentials();
    let client = ApiClient::new(&config, auth).context("Failed to build HTTP client")?;
    Ok(Arc::new(client))
}

fn print_usage() {
    println!("Docchat - upload a PDF and hold a cited conversation about it");
    println!();
    println!("Usage: docchat [FILE]");
    println!("       docchat <COMMAND>");
    println!();
    println!("Commands:");
    println!("  chat <FILE>          Upload a PDF and chat about it interactively");
    println!("  ask <FILE> <Q>...    Upload, ask one question, print the cited answer");
    println!("  info <SESSION_ID>    Show metadata for an existing session");
    println!("  close <SESSION_ID>   Delete a session server-side");
    println!("  login <USER> <PASS>  Log in to the assist backend");
    println!("  register             Create an assist account");
    println!("  logout               Forget stored credentials");
    println!("  assist <TOOL>        Assist micro tools (login required)");
    println!();
    println!("Options:");
    println!("  -h, --help           Print help");
}

// === Document Conversation ===

/// Upload `path`, rendering the progress event stream, and hand back the
/// resulting session.
async fn upload_document(client: &Arc<ApiClient>, path: &Path) -> Result<Session> {
    let mut uploader = UploadController::new(Arc::clone(client) as Arc<dyn Backend>);
    let (events_tx, mut events_rx) = mpsc::channel(32);

    let display = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                UploadEvent::Progress(percent) => {
                    print!("\rUploading... {percent:>3}%");
                    let _ = std::io::stdout().flush();
                }
                UploadEvent::Processing => {
                    println!();
                    println!("Indexing document (large PDFs can take a while)...");
                }
                UploadEvent::Completed(_) => {}
                UploadEvent::Failed(_) => println!(),
            }
        }
    });

    let result = uploader.submit(path, &events_tx).await;
    drop(events_tx);
    let _ = display.await;

    let session = match result {
        Ok(session) => session,
        Err(err) => {
            if let UploadState::Error { file_name, message } = uploader.state() {
                bail!("Upload of {file_name} failed: {message}");
            }
            return Err(err.into());
        }
    };
    println!(
        "Indexed {} ({} pages, {} chunks). Session: {}",
        session.filename, session.total_pages, session.total_chunks, session.session_id
    );
    if session.total_pages > SOFT_PAGE_LIMIT {
        println!(
            "Note: this document is over {SOFT_PAGE_LIMIT} pages; answers may take longer."
        );
    }
    Ok(session)
}

async fn chat_session(client: Arc<ApiClient>, path: &Path) -> Result<()> {
    let session = upload_document(&client, path).await?;

    let store = Arc::new(SessionStore::new(Arc::clone(&client) as Arc<dyn Backend>));
    store.open(session).await;
    if let Some(greeting) = store.transcript().await.first() {
        print_message(greeting);
    }
    println!("Type a question, or /quit to close the session.");

    let controller =
        ConversationController::new(Arc::clone(&client) as Arc<dyn Backend>, Arc::clone(&store));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input == "/quit" || input == "/exit" {
            break;
        }
        if controller.is_awaiting_response() {
            println!("Still working on the previous question...");
            continue;
        }

        match controller.send(input).await {
            SendOutcome::Answered | SendOutcome::Recovered => {
                if let Some(reply) = store.transcript().await.last() {
                    print_message(reply);
                }
            }
            SendOutcome::IgnoredEmpty => {}
            SendOutcome::IgnoredBusy => {
                println!("Still working on the previous question...");
            }
            SendOutcome::NoSession | SendOutcome::Discarded => break,
        }
    }

    store.reset().await;
    println!("Session closed.");
    Ok(())
}

async fn ask_once(client: Arc<ApiClient>, path: &Path, question: &str) -> Result<()> {
    let session = upload_document(&client, path).await?;

    let store = Arc::new(SessionStore::new(Arc::clone(&client) as Arc<dyn Backend>));
    store.open(session).await;
    let controller =
        ConversationController::new(Arc::clone(&client) as Arc<dyn Backend>, Arc::clone(&store));

    match controller.send(question).await {
        SendOutcome::Answered | SendOutcome::Recovered => {
            if let Some(reply) = store.transcript().await.last() {
                print_message(reply);
            }
        }
        outcome => {
            tracing::debug!(?outcome, "one-shot question was not answered");
        }
    }

    store.reset().await;
    Ok(())
}

/// Print one transcript message, interpreting content markers.
fn print_message(message: &Message) {
    if message.role == MessageRole::User {
        println!("> {}", message.content);
        return;
    }

    println!();
    for line in render::parse_lines(&message.content) {
        match line {
            ContentLine::Heading(text) => println!("{text}"),
            ContentLine::Bullet(text) => println!("  - {text}"),
            ContentLine::Numbered(index, text) => println!("  {index}. {text}"),
            ContentLine::Plain(text) => println!("{text}"),
        }
    }
    if let Some(sources) = render::format_source_pages(&message.source_pages) {
        println!("  [sources: {sources}]");
    }
    println!();
}

// === Session Management ===

async fn show_session(client: &Arc<ApiClient>, session_id: &str) -> Result<()> {
    let session = client
        .session_info(session_id)
        .await
        .context("Failed to fetch session")?;
    println!("{:<12} {}", "SESSION", session.session_id);
    println!("{:<12} {}", "FILE", session.filename);
    println!("{:<12} {}", "PAGES", session.total_pages);
    println!("{:<12} {}", "CHUNKS", session.total_chunks);
    Ok(())
}

async fn close_session(client: &Arc<ApiClient>, session_id: &str) -> Result<()> {
    client
        .delete_session(session_id)
        .await
        .context("Failed to delete session")?;
    println!("Session {session_id} deleted.");
    Ok(())
}

// === Assist Surface ===

async fn login(client: &Arc<ApiClient>, username: &str, password: &str) -> Result<()> {
    let auth = client
        .login(username, password)
        .await
        .context("Login failed")?;
    config::save_credentials(&auth).context("Failed to store credentials")?;
    println!("Logged in as {}.", auth.username);
    Ok(())
}

async fn register(client: &Arc<ApiClient>, username: &str, password: &str) -> Result<()> {
    client
        .register(username, password)
        .await
        .context("Registration failed")?;
    login(client, username, password).await
}

fn logout() -> Result<()> {
    config::clear_credentials().context("Failed to clear credentials")?;
    println!("Logged out.");
    Ok(())
}

async fn assist(client: &Arc<ApiClient>, tool: AssistTool) -> Result<()> {
    match tool {
        AssistTool::Chat { context, query } => {
            let query = query.join(" ");
            if query.trim().is_empty() {
                bail!("A question is required for the assist chat command");
            }
            let reply = client.assist_chat(&query, context.as_str()).await?;
            print_message(&Message::assistant(reply, Vec::new()));
        }
        AssistTool::Breakdown { task } => {
            let task = task.join(" ");
            if task.trim().is_empty() {
                bail!("A task description is required for the breakdown command");
            }
            let steps = client.breakdown_task(&task).await?;
            for (index, step) in steps.iter().enumerate() {
                println!("  {}. {step}", index + 1);
            }
        }
        AssistTool::Simplify { text } => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                bail!("Text is required for the simplify command");
            }
            let simplified = client.simplify_text(&text).await?;
            print_message(&Message::assistant(simplified, Vec::new()));
        }
        AssistTool::Estimate { task } => {
            let task = task.join(" ");
            if task.trim().is_empty() {
                bail!("A task description is required for the estimate command");
            }
            let estimation = client.estimate_time(&task).await?;
            print_message(&Message::assistant(estimation, Vec::new()));
        }
    }
    Ok(())
}
