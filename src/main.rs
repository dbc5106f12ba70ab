use std::io::Write;

use anyhow::{Context, bail};
use clap::Parser;
use hearth::ai::{Callbacks, CancelToken, ChatClient, ChatError, SendOutcome};
use hearth::config::{self, ChatConfig};
use tracing_subscriber::EnvFilter;

/// Ask the leasing assistant a question and stream the answer to stdout.
#[derive(Debug, Parser)]
#[command(name = "hearth", version)]
struct Args {
    /// The question to send.
    query: String,

    /// Continue an existing conversation thread.
    #[arg(long, short)]
    thread: Option<String>,

    /// Override the SSE endpoint base URL.
    #[arg(long, env = config::API_URL_VAR)]
    api_url: Option<String>,

    /// Override the N8N webhook URL; an empty value disables it.
    #[arg(long, env = config::N8N_URL_VAR)]
    n8n_url: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hearth=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    init_tracing();
    let args = Args::parse();

    let mut config = ChatConfig::from_env().context("invalid configuration")?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(url) = args.n8n_url {
        config.n8n_webhook_url = Some(url).filter(|u| !u.trim().is_empty());
    }

    let client = ChatClient::new(&config).context("failed to build HTTP client")?;

    let (handle, cancel) = CancelToken::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let mut failure: Option<ChatError> = None;
    let mut thread_id: Option<String> = None;
    let mut sink = Callbacks::new(
        |piece: &str| {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(piece.as_bytes());
            let _ = out.flush();
        },
        |thread: Option<&str>| thread_id = thread.map(str::to_string),
        |err: &ChatError| failure = Some(err.clone()),
    );

    let outcome = client
        .send_message(&args.query, args.thread.as_deref(), &mut sink, cancel)
        .await;
    drop(sink);
    println!();

    match outcome {
        SendOutcome::Completed | SendOutcome::Ended => {
            if let Some(id) = thread_id {
                eprintln!("thread: {id}");
            }
            Ok(())
        }
        SendOutcome::Cancelled => bail!("cancelled"),
        SendOutcome::Failed => match failure {
            Some(err) => Err(err).context("chat request failed"),
            None => bail!("chat request failed"),
        },
    }
}
