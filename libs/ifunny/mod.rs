//! iFunny Client
//!
//! Client framework for the iFunny API and its Sendbird-backed chat.
//!
//! - **client**: authentication, account data, REST resources, chat lifecycle
//! - **events**: hook registry, chat commands, protocol dispatcher
//! - **pagination**: lazy cursor pagination over REST resources
//! - **domain**: users, channels, messages, notifications, invites
//! - **config**: YAML + environment configuration
//! - **infrastructure**: token cache, logging setup
//!
//! ```rust,ignore
//! use ifunny::{ChatEvent, Client, ClientConfig, CommandContext, EventKind};
//!
//! let config = ClientConfig::from_env()?;
//! let (email, password) = config.credentials()?;
//! let client = Client::new(config)?;
//! client.login(&email, &password, false).await?;
//!
//! client.on(EventKind::Message, |event: &ChatEvent| {
//!     if let ChatEvent::Message(message) = event {
//!         tracing::info!(text = message.content(), "Message");
//!     }
//!     Ok(())
//! });
//! client.command("ping", |ctx: &CommandContext<'_>| Ok(ctx.reply("pong")?));
//!
//! client.start_chat().await?;
//! client.wait_for_chat().await?;
//! ```

pub mod client;
pub mod config;
pub mod domain;
pub mod events;
pub mod infrastructure;
pub mod pagination;
pub mod protocol;

// Re-export commonly used items
pub use client::{ApiResponse, ChatLifecycle, Client, ClientError, RestTransport, Result};
pub use config::{ClientConfig, ConfigError};
pub use domain::{Channel, ChannelInvite, Message, Notification, User};
pub use events::{
    ChatEvent, CommandContext, CommandTable, EventHandler, EventKind, EventRegistry, HookError,
    HookResult, LocalIdentity, PrefixSource, ProtocolDispatcher,
};
pub use infrastructure::{init_tracing, init_tracing_with_level, TokenCache};
pub use pagination::{Page, PageCursor, PageSource, Paginator};
