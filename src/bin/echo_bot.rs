//! Echo bot
//!
//! Logs in, joins chat and answers `/echo <text>` with `<text>`. Invites are
//! logged, joins are greeted. Runs until Ctrl+C.
//!
//! ```text
//! IFUNNY_EMAIL=... IFUNNY_PASSWORD=... cargo run --bin echo_bot [config.yaml]
//! ```

use anyhow::{Context, Result};
use chatsockets::FrameSink;
use ifunny::protocol::message_frame;
use ifunny::{ChatEvent, Client, ClientConfig, CommandContext, EventKind};
use ifunny_bot::bin_common::{
    load_client_config, parse_args, shutdown_signal, BinaryRunner, ConfigType, RunConfig,
};
use tracing::{info, warn};

struct EchoBot {
    client: Client,
    run_config: RunConfig,
}

impl EchoBot {
    fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::new(config).context("Failed to create client")?;
        Ok(Self {
            client,
            run_config: RunConfig::new("iFunny echo bot").with_heartbeat(300),
        })
    }

    fn register_hooks(&self) {
        self.client.on(EventKind::Connect, |_: &ChatEvent| {
            info!("Chat handshake complete");
            Ok(())
        });

        self.client.on(EventKind::Message, |event: &ChatEvent| {
            if let ChatEvent::Message(message) = event {
                let author = message.author();
                info!(
                    channel = message.channel_url(),
                    author = author.as_ref().map(|u| u.id()).unwrap_or("?"),
                    command = message.invoked(),
                    "{}",
                    message.content()
                );
            }
            Ok(())
        });

        self.client.on(EventKind::Invite, |event: &ChatEvent| {
            if let ChatEvent::Invite(invite) = event {
                info!(
                    channel = invite.channel().url(),
                    inviter = invite.inviter().map(|u| u.id()).unwrap_or("?"),
                    "Invited to channel"
                );
            }
            Ok(())
        });

        let sink = self.client.sink();
        self.client.on(EventKind::UserJoin, move |event: &ChatEvent| {
            if let ChatEvent::UserJoin { user, channel } = event {
                let text = format!("Welcome, {}!", user.id());
                sink.send_frame(&message_frame(channel.url(), &text, sink.next_request_id()))?;
            }
            Ok(())
        });

        self.client.on(EventKind::Disconnect, |_: &ChatEvent| {
            warn!("Chat disconnected");
            Ok(())
        });

        self.client
            .command_documented("echo", "repeat the rest of the message", |ctx: &CommandContext<'_>| {
                if ctx.args.is_empty() {
                    ctx.reply("Nothing to echo")?;
                } else {
                    ctx.reply(&ctx.args.join(" "))?;
                }
                Ok(())
            });
    }
}

impl BinaryRunner for EchoBot {
    async fn run(&mut self) -> Result<()> {
        let (email, password) = self.client.config().credentials()?;
        self.client
            .login(&email, &password, false)
            .await
            .context("Login failed")?;
        info!("Logged in as {}", self.client.nick().await?);

        self.register_hooks();

        self.client.start_chat().await?;
        self.client
            .wait_for_chat()
            .await
            .context("Chat handshake did not complete")?;

        let mut heartbeat = tokio::time::interval(self.run_config.heartbeat_interval());
        heartbeat.tick().await;

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = heartbeat.tick() => {
                    let metrics = self.client.chat().metrics();
                    info!(
                        state = ?metrics.connection_state,
                        sent = metrics.frames_sent,
                        received = metrics.frames_received,
                        reconnects = metrics.reconnect_count,
                        "Heartbeat"
                    );
                }
            }
        }

        self.client.chat().shutdown().await;
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        let metrics = self.client.chat().metrics();
        Some(format!(
            "Frames sent: {}, received: {}, reconnects: {}",
            metrics.frames_sent, metrics.frames_received, metrics.reconnect_count
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config = load_client_config(ConfigType::from_args(&parse_args()))?;

    ifunny::init_tracing_with_level(&config.log_level);
    config.log();

    let mut bot = EchoBot::new(config)?;
    bot.execute().await
}
