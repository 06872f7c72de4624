//! Protocol dispatcher
//!
//! Turns raw Sendbird frames into session updates, `PONG` replies, command
//! runs and hook calls:
//!
//! | Opcode | Action |
//! |--------|--------|
//! | `LOGI` | store session key, `on_connect(payload)`; keyless (error) handshakes go to `on_default` |
//! | `PING` | `on_ping(payload)`, answer with `PONG` |
//! | `MESG` | skip own messages; run commands; `on_message(message)` |
//! | `SYEV` | route by category, then `on_channel_update(channel)` |
//! | other  | ignored |
//!
//! Malformed frames and frames missing required fields are logged and
//! dropped. Errors from hooks and commands are returned from
//! [`resolve`](ProtocolDispatcher::resolve).

use super::commands::CommandTable;
use super::registry::{EventRegistry, HookResult};
use super::{ChatEvent, EventKind};
use crate::domain::{ChannelInvite, Message, User};
use crate::protocol::{self, ChannelUpdate, ChannelUpdateKind};
use chatsockets::{Frame, FrameHandler, FrameSink, Opcode, SessionState, SocketError};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Who "we" are on the chat backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    /// iFunny user id (Sendbird `guest_id`)
    pub id: String,
    pub nick: String,
}

pub struct ProtocolDispatcher {
    session: Arc<SessionState>,
    registry: Arc<RwLock<EventRegistry>>,
    commands: Arc<RwLock<CommandTable>>,
    identity: LocalIdentity,
    sink: Arc<dyn FrameSink>,
}

impl ProtocolDispatcher {
    pub fn new(
        session: Arc<SessionState>,
        registry: Arc<RwLock<EventRegistry>>,
        commands: Arc<RwLock<CommandTable>>,
        identity: LocalIdentity,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            session,
            registry,
            commands,
            identity,
            sink,
        }
    }

    /// Handle one raw frame
    pub fn resolve(&self, raw: &str) -> HookResult {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "Dropping malformed frame");
                return Ok(());
            }
        };

        match frame.opcode {
            Opcode::Logi => self.on_connect(frame.payload),
            Opcode::Ping => self.on_ping(frame.payload),
            Opcode::Mesg => self.on_message(frame.payload),
            Opcode::Syev => self.on_channel_update(frame.payload),
            other => {
                trace!(opcode = %other, "Ignoring frame");
                Ok(())
            }
        }
    }

    /// Transport closed
    pub fn disconnected(&self) -> HookResult {
        info!("Chat disconnected");
        self.invoke(EventKind::Disconnect, &ChatEvent::Disconnect)
    }

    fn invoke(&self, kind: EventKind, event: &ChatEvent) -> HookResult {
        // clone the handler out so hooks can register hooks
        let handler = self.registry.read().get(kind.name());
        handler(event)
    }

    fn invoke_default(&self, event: &ChatEvent) -> HookResult {
        let handler = self.registry.read().default_handler();
        handler(event)
    }

    fn on_connect(&self, payload: Value) -> HookResult {
        let Some(key) = payload.get("key").and_then(Value::as_str) else {
            warn!(payload = %payload, "Handshake rejected");
            return self.invoke_default(&ChatEvent::Unhandled(payload));
        };

        if self.session.establish(key) {
            info!("Chat session established");
        }

        self.invoke(EventKind::Connect, &ChatEvent::Connect(payload))
    }

    fn on_ping(&self, payload: Value) -> HookResult {
        let id = payload.get("id").cloned().unwrap_or(Value::Null);
        let hook = self.invoke(EventKind::Ping, &ChatEvent::Ping(payload));

        // the keepalive must go out even if the hook failed
        let pong = protocol::pong_frame(id, protocol::now_ms());
        if let Err(e) = self.sink.send_frame(&pong) {
            warn!(error = %e, "Failed to answer PING");
        }

        hook
    }

    fn on_message(&self, payload: Value) -> HookResult {
        if self.is_own_message(&payload) {
            trace!("Skipping own message");
            return Ok(());
        }

        let Some(mut message) = Message::from_payload(payload) else {
            warn!("MESG without msg_id or channel_url");
            return Ok(());
        };

        let invocation = self.commands.read().resolve(message.content());
        if let Some(invocation) = invocation {
            debug!(command = %invocation.name, channel = message.channel_url(), "Running command");
            invocation.run(&message, self.sink.as_ref())?;
            message.invoked = true;
        }

        self.invoke(EventKind::Message, &ChatEvent::Message(message))
    }

    /// Sender is us: `user.guest_id` against our id, else `user.name`
    /// against our nick
    fn is_own_message(&self, payload: &Value) -> bool {
        let Some(user) = payload.get("user") else {
            return false;
        };

        if let Some(guest_id) = user.get("guest_id").and_then(Value::as_str) {
            return guest_id == self.identity.id;
        }

        user.get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| name == self.identity.nick)
    }

    fn on_channel_update(&self, payload: Value) -> HookResult {
        let Some(update) = ChannelUpdate::from_payload(payload) else {
            warn!("SYEV without cat or channel_url");
            return Ok(());
        };

        match update.kind {
            ChannelUpdateKind::Invite => self.on_invite(&update)?,
            ChannelUpdateKind::UserJoin => self.on_membership(&update, EventKind::UserJoin)?,
            ChannelUpdateKind::UserExit => self.on_membership(&update, EventKind::UserExit)?,
            ChannelUpdateKind::Other(code) => {
                trace!(category = code, "Unrouted channel event");
                self.invoke_default(&ChatEvent::Unhandled(update.raw.clone()))?;
            }
        }

        self.invoke(
            EventKind::ChannelUpdate,
            &ChatEvent::ChannelUpdate(update.channel),
        )
    }

    fn on_invite(&self, update: &ChannelUpdate) -> HookResult {
        let invite = ChannelInvite::from_update(update.channel.clone(), update.raw.clone());

        if invite.is_invited(&self.identity.id) {
            self.invoke(EventKind::Invite, &ChatEvent::Invite(invite))
        } else {
            self.invoke(EventKind::InviteBroadcast, &ChatEvent::InviteBroadcast(invite))
        }
    }

    fn on_membership(&self, update: &ChannelUpdate, kind: EventKind) -> HookResult {
        let Some(user_id) = update.acting_user_id() else {
            warn!(category = update.kind.code(), "Channel event without data.user_id");
            return Ok(());
        };

        let user = User::new(user_id);
        let channel = update.channel.clone();
        let event = match kind {
            EventKind::UserJoin => ChatEvent::UserJoin { user, channel },
            _ => ChatEvent::UserExit { user, channel },
        };

        self.invoke(kind, &event)
    }
}

impl FrameHandler for ProtocolDispatcher {
    fn handle(&mut self, raw: &str) -> chatsockets::Result<()> {
        self.resolve(raw)
            .map_err(|e| SocketError::Hook(e.to_string()))
    }

    fn on_disconnect(&mut self) -> chatsockets::Result<()> {
        self.disconnected()
            .map_err(|e| SocketError::Hook(e.to_string()))
    }
}
