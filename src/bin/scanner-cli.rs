use clap::{Parser, Subcommand};
use futures_util::{stream, SinkExt, StreamExt};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use balance_scanner::client::{ClientState, SnapshotStore};
use balance_scanner::observability::logging;
use balance_scanner::progress::{ClientMessage, PushMessage};
use balance_scanner::scanner::InputKind;
use uuid::Uuid;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Bytes sent per upload body chunk.
const UPLOAD_CHUNK: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "scanner-cli")]
#[command(about = "Submit scans to a balance scanner and follow their progress", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Directory holding the local progress snapshot
    #[arg(long, default_value = ".")]
    cache_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit addresses (or private keys) given on the command line
    Scan {
        #[arg(short, long, default_value = "address")]
        kind: InputKind,
        /// Follow progress until the run completes
        #[arg(short, long)]
        watch: bool,
        #[arg(required = true)]
        entries: Vec<String>,
    },
    /// Upload a file with one entry per line
    Upload {
        path: PathBuf,
        #[arg(short, long, default_value = "address")]
        kind: InputKind,
        #[arg(short, long)]
        watch: bool,
    },
    /// Follow progress and keep the local snapshot current
    Watch,
    /// Cancel the active run
    Cancel,
    /// Print the cached wallets, highest balance first
    Show {
        #[arg(short, long)]
        top: Option<usize>,
    },
    /// Remove the cached snapshot
    Clear,
    /// List provider endpoints and their status
    Endpoints,
    /// Check scanner status
    Status,
}

#[tokio::main]
async fn main() -> CliResult {
    logging::init_logging("warn");
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/').to_string();
    let store = SnapshotStore::in_dir(&cli.cache_dir);
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Scan { kind, watch, entries } => {
            let socket = if watch { Some(connect(&base).await?) } else { None };
            let res = client
                .post(format!("{}/api/scan", base))
                .json(&serde_json::json!({ "entries": entries, "kind": kind }))
                .send()
                .await?;
            let accepted = print_response(res).await?;
            if let (Some(socket), Some(run)) = (socket, accepted.as_ref().and_then(run_id)) {
                follow(socket, store, Some(run)).await?;
            }
        }
        Commands::Upload { path, kind, watch } => {
            let socket = if watch { Some(connect(&base).await?) } else { None };
            let form = reqwest::multipart::Form::new()
                .text("kind", kind.as_str())
                .part("file", file_part(&path).await?);
            let res = client
                .post(format!("{}/api/upload", base))
                .multipart(form)
                .send()
                .await?;
            let accepted = print_response(res).await?;
            if let (Some(socket), Some(run)) = (socket, accepted.as_ref().and_then(run_id)) {
                follow(socket, store, Some(run)).await?;
            }
        }
        Commands::Watch => {
            let socket = connect(&base).await?;
            follow(socket, store, None).await?;
        }
        Commands::Cancel => {
            let mut socket = connect(&base).await?;
            let cancel = serde_json::to_string(&ClientMessage::Cancel)?;
            socket.send(Message::Text(cancel.into())).await?;
            socket.close(None).await?;
            println!("Cancel requested");
        }
        Commands::Show { top } => {
            let state = ClientState::restore(store)?;
            let summary = state.summary();
            println!(
                "{} wallets, {} checked, {} errors",
                summary.total, summary.completed, summary.errors
            );
            for record in state.ranked().into_iter().take(top.unwrap_or(usize::MAX)) {
                match (record.balance(), record.error()) {
                    (Some(balance), _) => println!("{:<44} {:>18} ETH", record.address, balance),
                    (_, Some(error)) => println!("{:<44} {}", record.address, error),
                    _ => println!("{:<44} pending", record.address),
                }
            }
        }
        Commands::Clear => {
            store.clear()?;
            println!("Snapshot cleared");
        }
        Commands::Endpoints => {
            let res = client.get(format!("{}/api/endpoints", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client.get(format!("{}/api/status", base)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn connect(base: &str) -> CliResult<Socket> {
    let ws_url = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}/ws", rest)
    } else {
        format!("ws://{}/ws", base.trim_start_matches("http://"))
    };
    let (socket, _) = connect_async(ws_url.as_str()).await?;
    Ok(socket)
}

/// Stream a file as a multipart part without buffering it.
async fn file_part(path: &Path) -> CliResult<reqwest::multipart::Part> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.txt".to_string());
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();

    let chunks = stream::try_unfold(file, |mut file| async move {
        let mut buffer = vec![0u8; UPLOAD_CHUNK];
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        buffer.truncate(read);
        Ok(Some((buffer, file)))
    });
    let body = reqwest::Body::wrap_stream(chunks);
    Ok(reqwest::multipart::Part::stream_with_length(body, length).file_name(name))
}

fn run_id(body: &Value) -> Option<Uuid> {
    body["run_id"].as_str().and_then(|id| Uuid::parse_str(id).ok())
}

/// Apply push messages to the restored view, persisting after each change.
///
/// With `run` set, updates from other runs are ignored and the loop ends on
/// that run's final update.
async fn follow(mut socket: Socket, store: SnapshotStore, run: Option<Uuid>) -> CliResult {
    let mut state = ClientState::restore(store)?;
    if !state.records().is_empty() {
        println!("Progress restored: {} wallets", state.records().len());
    }

    while let Some(frame) = socket.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let message: PushMessage = match serde_json::from_str(text.as_str()) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unrecognised message");
                continue;
            }
        };

        let other_run = matches!((run, message.run_id()), (Some(wanted), Some(got)) if wanted != got);
        if other_run {
            continue;
        }

        if state.apply(&message) {
            state.persist()?;
        }
        report(&message, &state);

        if run.is_some() && matches!(message, PushMessage::WalletUpdate { progress: 100, .. }) {
            break;
        }
    }
    Ok(())
}

fn report(message: &PushMessage, state: &ClientState) {
    match message {
        PushMessage::Upload {
            error: Some(error), ..
        }
        | PushMessage::WalletUpdate {
            error: Some(error), ..
        } => eprintln!("error: {}", error),
        PushMessage::Upload {
            progress,
            total,
            completed,
            ..
        } => println!(
            "upload  {:>3}% ({}/{} lines)",
            progress,
            completed.unwrap_or_default(),
            total.unwrap_or_default()
        ),
        PushMessage::WalletUpdate { progress, .. } => {
            let summary = state.summary();
            println!(
                "wallets {:>3}% ({}/{} checked, {} errors)",
                progress, summary.completed, summary.total, summary.errors
            );
        }
        PushMessage::Pong => {}
    }
}

/// Print a JSON response. Returns the body on success.
async fn print_response(res: reqwest::Response) -> CliResult<Option<Value>> {
    let status = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("unknown error");
        eprintln!("Error: scanner returned {}: {}", status, message);
        return Ok(None);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(Some(body))
}
