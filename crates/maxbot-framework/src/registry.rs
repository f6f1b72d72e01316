//! Pattern registry for commands, events and actions.
//!
//! Registrations are collected once at startup with builder-style calls and
//! handed to a [`Dispatcher`](crate::Dispatcher), which never mutates them.
//!
//! ```rust,ignore
//! let registry = Registry::new()
//!     .command("start", "Welcome!")
//!     .command("echo", |param: Param| async move { param.text().to_string() })
//!     .regex(r"^/sum (\d+) (\d+)$", sum)?
//!     .action("color:(.+)", pick_color)?
//!     .on("bot_started|user_added", greet)
//!     .on("*", log_everything);
//! ```
//!
//! Commands and actions are kept in insertion order and the first match wins,
//! so registering the same command name twice leaves the second entry
//! unreachable. Events are keyed by exact type name and a later registration
//! replaces an earlier one.

use std::collections::HashMap;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::handler::{Handler, IntoHandler};

/// Separator accepted by [`Registry::on`] to bind several event types at once.
pub const EVENT_SEPARATOR: char = '|';

// ============================================================================
// Entries
// ============================================================================

/// How a command entry matches message text.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// `/name` optionally followed by one whitespace character and arguments.
    Name(String),
    /// A regular expression matched against the full message text.
    Raw(Regex),
}

impl CommandPattern {
    /// Matches `text` and returns the captured groups.
    ///
    /// For [`CommandPattern::Name`] the result holds a single element, the
    /// argument text (empty when the command was sent bare).
    pub(crate) fn matches(&self, text: &str) -> Option<Vec<String>> {
        match self {
            Self::Name(name) => match_command_name(name, text).map(|args| vec![args.to_string()]),
            Self::Raw(regex) => capture_all(regex, text),
        }
    }
}

/// Matches `/name` followed by nothing, or by one whitespace and a single-line tail.
///
/// One trailing newline is ignored, so `"/echo hi\n"` yields `"hi"`.
fn match_command_name<'t>(name: &str, text: &'t str) -> Option<&'t str> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let rest = text.strip_prefix('/')?.strip_prefix(name)?;
    if rest.is_empty() {
        return Some("");
    }

    let mut chars = rest.chars();
    let first = chars.next()?;
    let tail = chars.as_str();
    if !first.is_whitespace() || tail.contains('\n') {
        return None;
    }
    Some(tail)
}

/// Runs `regex` against `haystack` and collects every group.
///
/// Groups that did not take part in the match become empty strings.
pub(crate) fn capture_all(regex: &Regex, haystack: &str) -> Option<Vec<String>> {
    let captures = regex.captures(haystack)?;
    Some(
        captures
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect(),
    )
}

/// A command registration.
#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub(crate) pattern: CommandPattern,
    pub(crate) handler: Handler,
}

impl CommandEntry {
    /// Returns the pattern.
    pub fn pattern(&self) -> &CommandPattern {
        &self.pattern
    }
}

/// An action (callback payload) registration.
#[derive(Debug, Clone)]
pub struct ActionEntry {
    pub(crate) source: String,
    pub(crate) regex: Regex,
    pub(crate) handler: Handler,
}

impl ActionEntry {
    /// Returns the pattern as registered.
    pub fn source(&self) -> &str {
        &self.source
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered registrations for the three namespaces.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: Vec<CommandEntry>,
    events: HashMap<String, Handler>,
    actions: Vec<ActionEntry>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `/name` command.
    ///
    /// The handler receives the text after the command and one whitespace
    /// character, or an empty string for a bare command.
    pub fn command<H, M>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: IntoHandler<M>,
    {
        let name = name.into();
        if self
            .commands
            .iter()
            .any(|entry| matches!(&entry.pattern, CommandPattern::Name(existing) if *existing == name))
        {
            warn!(command = %name, "Command registered twice, the later handler is unreachable");
        }
        debug!(command = %name, "Registered command");
        self.commands.push(CommandEntry {
            pattern: CommandPattern::Name(name),
            handler: handler.into_handler(),
        });
        self
    }

    /// Registers a raw regular expression matched against the whole text of
    /// messages that start with `/`.
    ///
    /// The handler receives every capture group. Fails if the pattern does not
    /// compile.
    pub fn regex<H, M>(mut self, pattern: &str, handler: H) -> RegistryResult<Self>
    where
        H: IntoHandler<M>,
    {
        let regex = Regex::new(pattern).map_err(|e| RegistryError::invalid_pattern(pattern, e))?;
        debug!(pattern, "Registered command regex");
        self.commands.push(CommandEntry {
            pattern: CommandPattern::Raw(regex),
            handler: handler.into_handler(),
        });
        Ok(self)
    }

    /// Registers a handler for one or more update types separated by `|`.
    ///
    /// `*` registers the fallback used when no exact type matches. A later
    /// registration for the same type replaces the earlier one.
    pub fn on<H, M>(mut self, events: &str, handler: H) -> Self
    where
        H: IntoHandler<M>,
    {
        let handler = handler.into_handler();
        for event in events.split(EVENT_SEPARATOR) {
            if self.events.insert(event.to_string(), handler.clone()).is_some() {
                debug!(event, "Replaced event handler");
            } else {
                debug!(event, "Registered event handler");
            }
        }
        self
    }

    /// Registers a handler for button callbacks.
    ///
    /// The pattern is first tried as an unanchored regular expression against
    /// the callback payload and then as an exact string. Fails if the pattern
    /// does not compile; use [`regex::escape`] for payloads containing
    /// metacharacters that should match literally.
    pub fn action<H, M>(mut self, pattern: &str, handler: H) -> RegistryResult<Self>
    where
        H: IntoHandler<M>,
    {
        let regex = Regex::new(pattern).map_err(|e| RegistryError::invalid_pattern(pattern, e))?;
        if self.actions.iter().any(|entry| entry.source == pattern) {
            warn!(pattern, "Action registered twice, the later handler is unreachable");
        }
        debug!(pattern, "Registered action");
        self.actions.push(ActionEntry {
            source: pattern.to_string(),
            regex,
            handler: handler.into_handler(),
        });
        Ok(self)
    }

    /// Returns the command registrations in insertion order.
    pub fn commands(&self) -> &[CommandEntry] {
        &self.commands
    }

    /// Returns the action registrations in insertion order.
    pub fn actions(&self) -> &[ActionEntry] {
        &self.actions
    }

    /// Looks up the handler registered for exactly `event`.
    pub fn event(&self, event: &str) -> Option<&Handler> {
        self.events.get(event)
    }

    /// Returns the number of command registrations, raw regexes included.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Returns the number of distinct event keys.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns the number of action registrations.
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.events.is_empty() && self.actions.is_empty()
    }
}
