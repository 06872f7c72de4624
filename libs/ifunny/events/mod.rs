//! Chat events
//!
//! - **registry**: name → hook bindings with a default fallback
//! - **commands**: prefix commands run for incoming messages
//! - **dispatcher**: turns raw socket frames into hook calls

pub mod commands;
pub mod dispatcher;
pub mod registry;

pub use commands::{CommandContext, CommandTable, Invocation, PrefixSource};
pub use dispatcher::{LocalIdentity, ProtocolDispatcher};
pub use registry::{
    EventBinding, EventCallback, EventHandler, EventRegistry, HookError, HookResult,
};

use crate::domain::{Channel, ChannelInvite, Message, User};
use serde_json::Value;

/// Payload handed to a hook
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// `LOGI` payload
    Connect(Value),
    /// `PING` payload
    Ping(Value),
    Message(Message),
    ChannelUpdate(Channel),
    /// The local user was invited
    Invite(ChannelInvite),
    /// Someone else was invited in a channel the local user can see
    InviteBroadcast(ChannelInvite),
    UserJoin { user: User, channel: Channel },
    UserExit { user: User, channel: Channel },
    Disconnect,
    /// Event with no dedicated hook (e.g. an unknown `SYEV` category)
    Unhandled(Value),
}

impl ChatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connect(_) => EventKind::Connect,
            Self::Ping(_) => EventKind::Ping,
            Self::Message(_) => EventKind::Message,
            Self::ChannelUpdate(_) => EventKind::ChannelUpdate,
            Self::Invite(_) => EventKind::Invite,
            Self::InviteBroadcast(_) => EventKind::InviteBroadcast,
            Self::UserJoin { .. } => EventKind::UserJoin,
            Self::UserExit { .. } => EventKind::UserExit,
            Self::Disconnect => EventKind::Disconnect,
            Self::Unhandled(_) => EventKind::Default,
        }
    }
}

/// Known hook names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Ping,
    Message,
    ChannelUpdate,
    Invite,
    InviteBroadcast,
    UserJoin,
    UserExit,
    Disconnect,
    /// Receives everything that has no binding of its own
    Default,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Connect,
        EventKind::Ping,
        EventKind::Message,
        EventKind::ChannelUpdate,
        EventKind::Invite,
        EventKind::InviteBroadcast,
        EventKind::UserJoin,
        EventKind::UserExit,
        EventKind::Disconnect,
        EventKind::Default,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Connect => "on_connect",
            Self::Ping => "on_ping",
            Self::Message => "on_message",
            Self::ChannelUpdate => "on_channel_update",
            Self::Invite => "on_invite",
            Self::InviteBroadcast => "on_invite_broadcast",
            Self::UserJoin => "on_user_join",
            Self::UserExit => "on_user_exit",
            Self::Disconnect => "on_disconnect",
            Self::Default => registry::DEFAULT_EVENT,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}
