#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: watch INBOX for new mail
//!
//! Logs in, lists folders, selects INBOX and then sits in IDLE, printing
//! every update the server pushes until Ctrl-C.
//!
//! ## Running
//!
//! ```bash
//! IMAP_HOST=imap.example.com IMAP_USER=me@example.com IMAP_PASSWORD=secret \
//!     RUST_LOG=postbox_imap=debug cargo run --package postbox-imap --example watch_inbox
//! ```

use std::env;

use postbox_imap::command::FetchOptions;
use postbox_imap::{ChannelHandler, Client, Config, Credentials, Event, SelectOptions, Update};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postbox_imap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = env::var("IMAP_HOST")?;
    let user = env::var("IMAP_USER")?;
    let password = env::var("IMAP_PASSWORD")?;

    let config = Config::builder(host)
        .auth(Credentials::password(user, password))
        .client_id([("name", "postbox-imap"), ("version", env!("CARGO_PKG_VERSION"))])
        .enable_compression(true)
        .build();

    let (handler, mut events) = ChannelHandler::new();
    let client = Client::open(config, handler).await?;
    println!("Connected, capabilities: {:?}", client.capabilities());

    let tree = client.list_mailboxes().await?;
    for mailbox in tree.descendants() {
        match &mailbox.special_use {
            Some(role) => println!("  {} ({})", mailbox.path, role),
            None => println!("  {}", mailbox.path),
        }
    }

    let info = client.select_mailbox("INBOX", SelectOptions::default()).await?;
    println!("INBOX: {} messages", info.exists);
    client.enter_idle();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(Event::Update(Update::Exists(count))) => {
                    println!("{} messages now", count);
                    let sequence = format!("{count}");
                    let latest = client
                        .list_messages(&sequence, &["UID", "ENVELOPE"], &FetchOptions::default())
                        .await?;
                    for record in latest {
                        println!("  new: uid {:?}", record.uid());
                    }
                }
                Some(Event::Update(Update::Expunge(seq))) => println!("message {} removed", seq),
                Some(Event::Close) | None => break,
                Some(other) => println!("{:?}", other),
            },
        }
    }

    client.close().await;
    Ok(())
}
