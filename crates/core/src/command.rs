//! Command grammar types.
//!
//! One line of model output becomes either a [`Command`] or a [`ParseError`].
//! Commands are consumed exactly once by the dispatcher.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a SAY message, in characters.
pub const MAX_SAY_CHARS: usize = 256;

/// A command verb, in the order the grammar lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Say,
    Move,
    Look,
    Mine,
    Place,
    Build,
    Attack,
    Kill,
    GoPlyr,
    Store,
    Hold,
}

impl Verb {
    pub const ALL: [Verb; 11] = [
        Verb::Say,
        Verb::Move,
        Verb::Look,
        Verb::Mine,
        Verb::Place,
        Verb::Build,
        Verb::Attack,
        Verb::Kill,
        Verb::GoPlyr,
        Verb::Store,
        Verb::Hold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Say => "SAY",
            Verb::Move => "MOVE",
            Verb::Look => "LOOK",
            Verb::Mine => "MINE",
            Verb::Place => "PLACE",
            Verb::Build => "BUILD",
            Verb::Attack => "ATTACK",
            Verb::Kill => "KILL",
            Verb::GoPlyr => "GOPLYR",
            Verb::Store => "STORE",
            Verb::Hold => "HOLD",
        }
    }

    /// Case-insensitive lookup of a verb token.
    pub fn from_token(token: &str) -> Option<Verb> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(token))
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who an ATTACK or KILL is aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// The nearest entity of any kind.
    Nearest,
    /// A namespaced entity type, stored without the `minecraft:` prefix.
    EntityType(String),
    /// A player by username.
    PlayerName(String),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Nearest => f.write_str("nearest"),
            Target::EntityType(kind) => write!(f, "minecraft:{kind}"),
            Target::PlayerName(name) => f.write_str(name),
        }
    }
}

/// A typed, validated instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verb", rename_all = "UPPERCASE")]
pub enum Command {
    Say { message: String },
    Move { x: f64, y: f64, z: f64 },
    Look { x: f64, y: f64, z: f64 },
    Mine,
    Place { slot: u16 },
    Build { size: u32, slot: u16 },
    Attack { target: Target },
    Kill { target: Target },
    #[serde(rename = "GOPLYR")]
    GoPlyr { player: String },
    Store { slot: u16 },
    Hold { slot: u16 },
}

impl Command {
    pub fn verb(&self) -> Verb {
        match self {
            Command::Say { .. } => Verb::Say,
            Command::Move { .. } => Verb::Move,
            Command::Look { .. } => Verb::Look,
            Command::Mine => Verb::Mine,
            Command::Place { .. } => Verb::Place,
            Command::Build { .. } => Verb::Build,
            Command::Attack { .. } => Verb::Attack,
            Command::Kill { .. } => Verb::Kill,
            Command::GoPlyr { .. } => Verb::GoPlyr,
            Command::Store { .. } => Verb::Store,
            Command::Hold { .. } => Verb::Hold,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Say { message } => write!(f, "SAY {message}"),
            Command::Move { x, y, z } => write!(f, "MOVE {x} {y} {z}"),
            Command::Look { x, y, z } => write!(f, "LOOK {x} {y} {z}"),
            Command::Mine => f.write_str("MINE"),
            Command::Place { slot } => write!(f, "PLACE {slot}"),
            Command::Build { size, slot } => write!(f, "BUILD {size} {slot}"),
            Command::Attack { target } => write!(f, "ATTACK {target}"),
            Command::Kill { target } => write!(f, "KILL {target}"),
            Command::GoPlyr { player } => write!(f, "GOPLYR {player}"),
            Command::Store { slot } => write!(f, "STORE {slot}"),
            Command::Hold { slot } => write!(f, "HOLD {slot}"),
        }
    }
}

/// Why a line did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("Unknown command: {0}")]
    UnknownVerb(String),

    #[error("{verb} expects {expected}, got {found} argument(s)")]
    Arity {
        verb: Verb,
        expected: &'static str,
        found: usize,
    },

    #[error("{verb} {arg} must be a number, got \"{value}\"")]
    InvalidNumber {
        verb: Verb,
        arg: &'static str,
        value: String,
    },

    #[error("{verb} {arg} must be a whole number in range, got \"{value}\"")]
    InvalidInteger {
        verb: Verb,
        arg: &'static str,
        value: String,
    },

    #[error("{verb} target is empty")]
    EmptyTarget { verb: Verb },

    #[error("SAY needs a message")]
    EmptyMessage,
}

/// A line of model output that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line_number}: {kind}")]
pub struct ParseError {
    /// 1-based line number within the reply.
    pub line_number: usize,
    /// The offending line, trimmed.
    pub line: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// The chat-facing form of this error.
    pub fn chat_message(&self) -> String {
        match &self.kind {
            ParseErrorKind::UnknownVerb(_) => self.kind.to_string(),
            kind => format!("Cannot run \"{}\": {kind}", self.line),
        }
    }
}
