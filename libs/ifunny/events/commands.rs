//! Chat commands
//!
//! A message is a command when its first word starts with one of the
//! configured prefixes and the rest of that word names a registered command
//! (or `help`, which is built in). Remaining words are the arguments.
//!
//! Prefixes are either a fixed set or a [`PrefixSource`] asked again for
//! every message.

use super::registry::HookResult;
use crate::domain::Message;
use crate::protocol;
use chatsockets::FrameSink;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the built-in command listing
pub const HELP_COMMAND: &str = "help";

pub type CommandCallback = Arc<dyn Fn(&CommandContext<'_>) -> HookResult + Send + Sync>;

/// Computes the current prefix set
pub type PrefixSource = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// What a command handler gets to work with
pub struct CommandContext<'a> {
    pub message: &'a Message,
    pub name: &'a str,
    pub args: &'a [String],
    sink: &'a dyn FrameSink,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        message: &'a Message,
        name: &'a str,
        args: &'a [String],
        sink: &'a dyn FrameSink,
    ) -> Self {
        Self {
            message,
            name,
            args,
            sink,
        }
    }

    /// Send `text` to the channel the command came from
    pub fn reply(&self, text: &str) -> chatsockets::Result<()> {
        let frame = protocol::message_frame(
            self.message.channel_url(),
            text,
            self.sink.next_request_id(),
        );
        self.sink.send_frame(&frame)
    }
}

#[derive(Clone)]
struct Command {
    handler: CommandCallback,
    help: Option<String>,
}

#[derive(Clone)]
enum Prefixes {
    Fixed(Vec<String>),
    Dynamic(PrefixSource),
}

/// Longest first, so "!!" wins over "!"
fn normalize(mut prefixes: Vec<String>) -> Vec<String> {
    prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    prefixes.dedup();
    prefixes
}

/// Per-client command table
#[derive(Clone)]
pub struct CommandTable {
    prefixes: Prefixes,
    commands: HashMap<String, Command>,
}

impl CommandTable {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: Prefixes::Fixed(normalize(prefixes.into_iter().map(Into::into).collect())),
            commands: HashMap::new(),
        }
    }

    /// Ask `source` for the prefixes each time a message is parsed
    ///
    /// `source` runs while the table is read-locked, so it must not register
    /// commands.
    pub fn set_prefix_source<F>(&mut self, source: F)
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.prefixes = Prefixes::Dynamic(Arc::new(source));
    }

    /// Replace the prefixes with a fixed set
    pub fn set_prefixes<I, S>(&mut self, prefixes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = Prefixes::Fixed(normalize(prefixes.into_iter().map(Into::into).collect()));
    }

    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&CommandContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(handler), None);
    }

    pub fn register_documented<F>(&mut self, name: impl Into<String>, help: impl Into<String>, handler: F)
    where
        F: Fn(&CommandContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(handler), Some(help.into()));
    }

    fn insert(&mut self, name: String, handler: CommandCallback, help: Option<String>) {
        self.commands.insert(name, Command { handler, help });
    }

    /// Current prefixes, longest first
    pub fn prefixes(&self) -> Vec<String> {
        match &self.prefixes {
            Prefixes::Fixed(prefixes) => prefixes.clone(),
            Prefixes::Dynamic(source) => normalize(source()),
        }
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Split `content` into a command name and arguments
    pub fn parse(&self, content: &str) -> Option<(String, Vec<String>)> {
        let mut words = content.split_whitespace();
        let first = words.next()?;

        let name = self
            .prefixes()
            .iter()
            .find_map(|prefix| first.strip_prefix(prefix.as_str()))
            .filter(|name| !name.is_empty())?
            .to_string();

        Some((name, words.map(str::to_string).collect()))
    }

    /// Find what to run for `content`
    ///
    /// The returned [`Invocation`] owns its handler, so the table can be
    /// unlocked before the command runs.
    pub fn resolve(&self, content: &str) -> Option<Invocation> {
        let (name, args) = self.parse(content)?;

        let action = match self.commands.get(&name) {
            Some(command) => Action::Run(Arc::clone(&command.handler)),
            None if name == HELP_COMMAND => Action::Reply(self.help_text()),
            None => return None,
        };

        Some(Invocation { name, args, action })
    }

    /// Text of the built-in `help` command
    pub fn help_text(&self) -> String {
        let prefix = self.prefixes().pop().unwrap_or_default();

        let mut lines = vec!["Commands:".to_string()];
        for name in self.names() {
            match self.commands.get(name).and_then(|c| c.help.as_deref()) {
                Some(help) => lines.push(format!("{}{} - {}", prefix, name, help)),
                None => lines.push(format!("{}{}", prefix, name)),
            }
        }
        if !self.commands.contains_key(HELP_COMMAND) {
            lines.push(format!("{}{} - list commands", prefix, HELP_COMMAND));
        }
        lines.join("\n")
    }
}

enum Action {
    Run(CommandCallback),
    Reply(String),
}

/// A resolved command, ready to run
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
    action: Action,
}

impl Invocation {
    pub fn run(&self, message: &Message, sink: &dyn FrameSink) -> HookResult {
        let ctx = CommandContext::new(message, &self.name, &self.args, sink);
        match &self.action {
            Action::Run(handler) => handler(&ctx),
            Action::Reply(text) => Ok(ctx.reply(text)?),
        }
    }
}
