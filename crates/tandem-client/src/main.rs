//! `tandem` command-line front end for the chat core.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use tandem_client::{ChatResolver, SeenMessages, SendOutcome, TimelineSynchronizer, TimelineView};
use tandem_net::{HttpTransport, TransportConfig};
use tandem_shared::constants::APP_NAME;
use tandem_shared::{ConversationId, Message, UserId};

#[derive(Debug, Parser)]
#[command(name = "tandem", version, about = "Tandem chat client")]
struct Cli {
    /// Access token (defaults to TANDEM_TOKEN)
    #[arg(long, env = "TANDEM_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Follow a conversation's timeline until Ctrl-C
    Tail { conversation: i64 },
    /// Send one message to a conversation
    Send { conversation: i64, body: String },
    /// Start a conversation with another user
    Start {
        user: i64,
        /// Your own user id
        #[arg(long = "me")]
        current_user: i64,
        /// First message; without it the compose route is resolved
        #[arg(long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tandem_client::init_tracing();

    let cli = Cli::parse();
    let config = TransportConfig::from_env();
    info!(api = %config.api_base_url, "Starting {APP_NAME} client v{}", env!("CARGO_PKG_VERSION"));

    let reconnect = config.reconnect;
    let transport = Arc::new(
        HttpTransport::new(config, cli.token).context("Failed to build HTTP transport")?,
    );

    match cli.command {
        Command::Tail { conversation } => {
            let sync = TimelineSynchronizer::new(transport, reconnect);
            tail(&sync, ConversationId(conversation)).await
        }
        Command::Send { conversation, body } => {
            let sync = TimelineSynchronizer::new(transport, reconnect);
            sync.attach(Some(ConversationId(conversation)));
            match sync.send(&body).await? {
                SendOutcome::Sent(message) => {
                    print_message(&message);
                    Ok(())
                }
                SendOutcome::Skipped(reason) => bail!("Message not sent: {reason:?}"),
            }
        }
        Command::Start {
            user,
            current_user,
            message,
        } => {
            let resolver = ChatResolver::new(transport);
            let navigate = |route: &tandem_shared::Route| println!("{route}");
            match message {
                Some(text) => {
                    resolver
                        .resolve_and_route(UserId(user), &text, UserId(current_user), navigate)
                        .await?
                }
                None => {
                    resolver
                        .resolve_and_route_or_compose(UserId(user), UserId(current_user), navigate)
                        .await?
                }
            };
            Ok(())
        }
    }
}

async fn tail(sync: &TimelineSynchronizer, conversation: ConversationId) -> anyhow::Result<()> {
    let mut rx = sync.subscribe();
    sync.attach(Some(conversation));

    let mut seen = SeenMessages::new();
    let mut last_error: Option<String> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view: TimelineView = rx.borrow_and_update().clone();
                for message in seen.unseen(&view) {
                    print_message(message);
                }

                if view.error != last_error {
                    if let Some(ref e) = view.error {
                        eprintln!("! {e}");
                    }
                    last_error = view.error.clone();
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    sync.detach();
    Ok(())
}

fn print_message(message: &Message) {
    let sender = message
        .sender_display_name
        .clone()
        .unwrap_or_else(|| message.sender_id.to_string());
    println!(
        "[{}] {}: {}",
        message.created_at.format("%Y-%m-%d %H:%M:%S"),
        sender,
        message.body
    );
}
