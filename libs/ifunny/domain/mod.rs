//! Domain Layer
//!
//! Value types handed to event hooks and returned by paginators.

pub mod models;

pub use models::{Channel, ChannelInvite, Message, Notification, User};
