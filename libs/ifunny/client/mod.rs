//! iFunny client
//!
//! [`Client`] ties everything together: REST authentication with a
//! persistent token cache, lazily fetched account data, paginated resources,
//! and the Sendbird chat connection with its hooks and commands.
//!
//! The client is cheap to clone; clones share all state.

pub mod auth;
pub mod chat;
pub mod error;
pub mod resources;
pub mod rest;

pub use chat::{socket_url, ChatLifecycle};
pub use error::{ClientError, Result};
pub use resources::{ChannelFilters, ChannelSource, NotificationSource};
pub use rest::{ApiResponse, Pairs, ReqwestTransport, RestTransport};

use crate::config::ClientConfig;
use crate::domain::{Channel, Message, Notification, User};
use crate::events::{
    ChatEvent, CommandContext, CommandTable, EventHandler, EventKind, EventRegistry, HookError,
    HookResult, LocalIdentity,
};
use crate::infrastructure::cache::{token_key, TokenCache, LOGIN_TOKEN_KEY};
use crate::pagination::Paginator;
use chatsockets::FrameSink;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    rest: Arc<dyn RestTransport>,
    cache: TokenCache,
    token: RwLock<Option<String>>,
    authenticated: AtomicBool,
    /// Serializes `login` so two callers cannot both run the password grant
    login_lock: Mutex<()>,
    /// `GET /account` payload (`data`), refetched when `stale`
    account: Mutex<Option<Value>>,
    stale: AtomicBool,
    user_id: OnceCell<String>,
    messenger_token: OnceCell<String>,
    registry: Arc<RwLock<EventRegistry>>,
    commands: Arc<RwLock<CommandTable>>,
    chat: ChatLifecycle,
}

impl Client {
    /// Client with the default HTTP transport and token cache location
    pub fn new(config: ClientConfig) -> Result<Self> {
        let rest = ReqwestTransport::new(config.request_timeout())?;
        let cache_path = match &config.token_cache_path {
            Some(path) => path.clone(),
            None => TokenCache::default_path()?,
        };
        let cache = TokenCache::open(cache_path)?;

        Ok(Self::with_transport(config, Arc::new(rest), cache))
    }

    pub fn with_transport(config: ClientConfig, rest: Arc<dyn RestTransport>, cache: TokenCache) -> Self {
        let commands = CommandTable::new(config.prefixes.iter().cloned());
        let chat = ChatLifecycle::new(&config);

        Self {
            inner: Arc::new(Inner {
                config,
                rest,
                cache,
                token: RwLock::new(None),
                authenticated: AtomicBool::new(false),
                login_lock: Mutex::new(()),
                account: Mutex::new(None),
                stale: AtomicBool::new(false),
                user_id: OnceCell::new(),
                messenger_token: OnceCell::new(),
                registry: Arc::new(RwLock::new(EventRegistry::new())),
                commands: Arc::new(RwLock::new(commands)),
                chat,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &TokenCache {
        &self.inner.cache
    }

    // ---- authentication ----

    /// Headers for iFunny API calls, with the bearer token once logged in
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = rest::pairs([("User-Agent", self.inner.config.user_agent.as_str())]);
        if let Some(token) = self.inner.token.read().as_deref() {
            headers.push(("Authorization".to_string(), auth::bearer_header(token)));
        }
        headers
    }

    /// Headers for Sendbird API calls, with the session key once known
    pub fn sendbird_headers(&self) -> Vec<(String, String)> {
        let mut headers = rest::pairs([("User-Agent", self.inner.config.sendbird_user_agent.as_str())]);
        if let Some(key) = self.session_key() {
            headers.push(("Session-Key".to_string(), key));
        }
        headers
    }

    /// Basic token for the password grant, generated once and cached
    pub fn login_token(&self) -> Result<String> {
        if let Some(token) = self.inner.cache.get(LOGIN_TOKEN_KEY) {
            return Ok(token);
        }

        let token = auth::generate_basic_token(&self.inner.config.client_id, &self.inner.config.client_secret);
        self.inner.cache.set(LOGIN_TOKEN_KEY, token.clone())?;
        debug!("Generated new login token");
        Ok(token)
    }

    /// Authenticate as `email`
    ///
    /// Unless `force` is set, a bearer token cached for `email` is tried
    /// first and kept if `GET /account` accepts it. Otherwise a password
    /// grant is issued; a 403 is retried once after the configured delay.
    ///
    /// # Errors
    /// - `AlreadyAuthenticated` if this client is logged in
    /// - `BadApiResponse` if the grant fails
    pub async fn login(&self, email: &str, password: &str, force: bool) -> Result<()> {
        let _guard = self.inner.login_lock.lock().await;

        if self.is_authenticated() {
            return Err(ClientError::AlreadyAuthenticated);
        }

        if !force && self.try_cached_token(email).await? {
            info!(email, "Logged in with cached token");
            return Ok(());
        }

        let headers = rest::pairs([
            ("User-Agent".to_string(), self.inner.config.user_agent.clone()),
            ("Authorization".to_string(), auth::basic_header(&self.login_token()?)),
        ]);
        let form = rest::pairs([
            ("grant_type", "password"),
            ("username", email),
            ("password", password),
        ]);
        let url = format!("{}/oauth2/token", self.inner.config.api_base);

        let mut response = self.inner.rest.post(&url, &headers, &form).await?;
        if response.status == 403 {
            let delay = self.inner.config.auth_retry_delay();
            warn!(?delay, "Password grant forbidden, retrying once");
            tokio::time::sleep(delay).await;
            response = self.inner.rest.post(&url, &headers, &form).await?;
        }

        let response = response.require_success()?;
        let token = response
            .field("/access_token")?
            .as_str()
            .ok_or_else(|| ClientError::MissingField("/access_token".to_string()))?
            .to_string();

        *self.inner.token.write() = Some(token.clone());
        self.inner.authenticated.store(true, Ordering::Release);
        self.inner.cache.set(&token_key(email), token)?;

        info!(email, "Logged in with password");
        Ok(())
    }

    /// Adopt the cached bearer token for `email` if the API still accepts it
    async fn try_cached_token(&self, email: &str) -> Result<bool> {
        let Some(token) = self.inner.cache.get(&token_key(email)) else {
            return Ok(false);
        };

        *self.inner.token.write() = Some(token);
        let url = format!("{}/account", self.inner.config.api_base);
        let response = match self.inner.rest.get(&url, &self.headers(), &[]).await {
            Ok(response) => response,
            Err(e) => {
                *self.inner.token.write() = None;
                return Err(e);
            }
        };

        if response.status == 200 {
            if let Some(data) = response.body.get("data") {
                *self.inner.account.lock().await = Some(data.clone());
            }
            self.inner.authenticated.store(true, Ordering::Release);
            return Ok(true);
        }

        debug!(status = response.status, "Cached token rejected");
        *self.inner.token.write() = None;
        Ok(false)
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.authenticated.load(Ordering::Acquire)
    }

    // ---- account ----

    /// Account payload, fetched on first use and after [`fresh`](Self::fresh)
    pub async fn account_data(&self) -> Result<Value> {
        if self.inner.token.read().is_none() {
            return Err(ClientError::NotAuthenticated);
        }

        let mut account = self.inner.account.lock().await;
        let stale = self.inner.stale.swap(false, Ordering::AcqRel);

        if let (Some(data), false) = (account.as_ref(), stale) {
            return Ok(data.clone());
        }

        let url = format!("{}/account", self.inner.config.api_base);
        let response = self
            .inner
            .rest
            .get(&url, &self.headers(), &[])
            .await?
            .require_success()?;
        let data = response.field("/data")?.clone();

        *account = Some(data.clone());
        Ok(data)
    }

    /// Mark the account payload stale so the next read refetches it
    pub fn fresh(&self) -> &Self {
        self.inner.stale.store(true, Ordering::Release);
        self
    }

    /// One string field of the account payload
    ///
    /// A missing field marks the payload stale before failing, so the next
    /// read tries a fresh copy.
    async fn account_field(&self, key: &str) -> Result<String> {
        let data = self.account_data().await?;
        match data.get(key).and_then(Value::as_str) {
            Some(value) => Ok(value.to_string()),
            None => {
                self.inner.stale.store(true, Ordering::Release);
                Err(ClientError::MissingField(format!("/data/{}", key)))
            }
        }
    }

    pub async fn nick(&self) -> Result<String> {
        self.account_field("nick").await
    }

    pub async fn email(&self) -> Result<String> {
        self.account_field("email").await
    }

    /// Own user id; fetched once
    pub async fn id(&self) -> Result<String> {
        self.inner
            .user_id
            .get_or_try_init(|| self.account_field("id"))
            .await
            .cloned()
    }

    pub async fn user(&self) -> Result<User> {
        let id = self.id().await?;
        Ok(User::from_data(id, self.account_data().await?))
    }

    /// Credential for the chat socket; fetched once, even under concurrent
    /// first use
    pub async fn messenger_token(&self) -> Result<String> {
        self.inner
            .messenger_token
            .get_or_try_init(|| self.account_field("messenger_token"))
            .await
            .cloned()
    }

    // ---- notifications ----

    pub async fn unread_notifications_count(&self) -> Result<u64> {
        let url = format!("{}/counters", self.inner.config.api_base);
        let response = self
            .inner
            .rest
            .get(&url, &self.headers(), &[])
            .await?
            .require_success()?;

        response
            .field("/data/news")?
            .as_u64()
            .ok_or_else(|| ClientError::MissingField("/data/news".to_string()))
    }

    /// The newest notifications, as many as are unread
    pub async fn unread_notifications(&self) -> Result<Vec<Notification>> {
        let count = self.unread_notifications_count().await?;
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        self.notifications().take_items(count).await
    }

    /// Notifications, newest first
    pub fn notifications(&self) -> Paginator<Notification> {
        let source = NotificationSource::new(
            Arc::clone(&self.inner.rest),
            &self.inner.config.api_base,
            self.headers(),
        );
        Paginator::new(source, self.inner.config.paginated_size)
    }

    // ---- chat ----

    /// Chat channels, most recent message first
    ///
    /// # Errors
    /// `ChatNotActive` until the chat has been started once (the Sendbird
    /// API needs the session key).
    pub async fn channels(&self) -> Result<Paginator<Channel>> {
        if self.session_key().is_none() {
            return Err(ClientError::ChatNotActive);
        }

        let source = ChannelSource::new(
            Arc::clone(&self.inner.rest),
            &self.inner.config.sendbird_api_base,
            &self.id().await?,
            self.sendbird_headers(),
        );
        Ok(Paginator::new(source, crate::config::MAX_PAGE_SIZE))
    }

    /// Bind a hook by name, e.g. `on_message`
    pub fn event<F>(&self, name: &str, handler: F)
    where
        F: Fn(&ChatEvent) -> HookResult + Send + Sync + 'static,
    {
        self.inner.registry.write().register(name, handler);
    }

    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&ChatEvent) -> HookResult + Send + Sync + 'static,
    {
        self.inner.registry.write().on(kind, handler);
    }

    pub fn event_handler<H: EventHandler>(&self, name: &str, handler: H) {
        self.inner.registry.write().register_handler(name, handler);
    }

    pub fn command<F>(&self, name: &str, handler: F)
    where
        F: Fn(&CommandContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.inner.commands.write().register(name, handler);
    }

    /// Register a command with a line for the `help` listing
    pub fn command_documented<F>(&self, name: &str, help: &str, handler: F)
    where
        F: Fn(&CommandContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.inner.commands.write().register_documented(name, help, handler);
    }

    /// Current command prefixes, longest first
    pub fn prefixes(&self) -> Vec<String> {
        self.inner.commands.read().prefixes()
    }

    /// Replace the configured prefixes
    pub fn set_prefixes<I, S>(&self, prefixes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.commands.write().set_prefixes(prefixes);
    }

    /// Compute prefixes per message instead of using a fixed set
    pub fn prefix_source<F>(&self, source: F)
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.inner.commands.write().set_prefix_source(source);
    }

    /// Run the command `message` calls for, if any
    ///
    /// Returns whether a command ran. Incoming messages are resolved
    /// automatically; this is for messages obtained some other way.
    pub fn resolve_command(&self, message: &Message) -> std::result::Result<bool, HookError> {
        let invocation = self.inner.commands.read().resolve(message.content());
        match invocation {
            Some(invocation) => {
                let sink = self.inner.chat.sink();
                invocation.run(message, sink.as_ref())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Open the chat socket
    ///
    /// Returns once the transport is starting; call
    /// [`wait_for_chat`](Self::wait_for_chat) to wait for the handshake.
    ///
    /// # Errors
    /// `ChatAlreadyActive` if the chat is connecting or connected.
    pub async fn start_chat(&self) -> Result<()> {
        if self.inner.chat.state().is_running() {
            return Err(ClientError::ChatAlreadyActive);
        }

        let messenger_token = self.messenger_token().await?;
        let id = self.id().await?;
        let nick = match self.nick().await {
            Ok(nick) => nick,
            Err(e) => {
                warn!(error = %e, "No nick in account data, matching own messages by id only");
                String::new()
            }
        };

        self.inner.chat.start(
            LocalIdentity { id, nick },
            &messenger_token,
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.commands),
        )
    }

    /// Close the chat socket; idempotent
    pub fn stop_chat(&self) {
        self.inner.chat.stop();
    }

    /// Wait for the chat handshake, up to the configured timeout
    pub async fn wait_for_chat(&self) -> Result<()> {
        self.inner
            .chat
            .wait_active(self.inner.config.handshake_timeout())
            .await
    }

    /// Send `text` to `channel_url`, returning the `req_id` it was tagged with
    pub fn send_message(&self, channel_url: &str, text: &str) -> Result<u64> {
        self.inner.chat.send_message(channel_url, text)
    }

    /// Last Sendbird session key; kept after the chat stops
    pub fn session_key(&self) -> Option<String> {
        self.inner.chat.session_key()
    }

    /// Outbound chat frames, usable from hooks
    ///
    /// Unlike a captured `Client`, the sink does not keep the hook registry
    /// alive.
    pub fn sink(&self) -> Arc<dyn FrameSink> {
        self.inner.chat.sink()
    }

    /// Next request id for an outbound chat frame
    pub fn next_req_id(&self) -> u64 {
        self.inner.chat.next_request_id()
    }

    pub fn chat(&self) -> &ChatLifecycle {
        &self.inner.chat
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("authenticated", &self.is_authenticated())
            .field("chat", &self.inner.chat.state())
            .finish()
    }
}
