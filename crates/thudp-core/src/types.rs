//! Protocol types and record definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Command byte values
pub mod cmd {
    pub const QUERY: u8 = b'?';
    pub const SET: u8 = b'!';
    pub const BROADCAST: u8 = b'#';
    pub const SUBSCRIBE: u8 = b'*';
}

/// Record command
///
/// Any byte is accepted on the wire; bytes outside the four defined
/// commands decode to [`Command::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "char", try_from = "char")]
pub enum Command {
    /// Query the current state of one zone (`?`)
    Query,
    /// Push a value and setpoint (`!`)
    Set,
    /// Broadcast (`#`)
    Broadcast,
    /// Subscribe to updates of every zone (`*`)
    Subscribe,
    /// Any other byte
    Unknown(u8),
}

impl Command {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            cmd::QUERY => Command::Query,
            cmd::SET => Command::Set,
            cmd::BROADCAST => Command::Broadcast,
            cmd::SUBSCRIBE => Command::Subscribe,
            other => Command::Unknown(other),
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Command::Query => cmd::QUERY,
            Command::Set => cmd::SET,
            Command::Broadcast => cmd::BROADCAST,
            Command::Subscribe => cmd::SUBSCRIBE,
            Command::Unknown(byte) => *byte,
        }
    }

    /// How many replies a controller waits for after sending this command
    pub fn reply_mode(&self) -> ReplyMode {
        match self {
            Command::Query => ReplyMode::Single,
            Command::Subscribe => ReplyMode::Stream,
            Command::Set | Command::Broadcast | Command::Unknown(_) => ReplyMode::None,
        }
    }

    /// Whether the value and setpoint fields carry data
    pub fn carries_payload(&self) -> bool {
        matches!(self, Command::Set)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte().escape_ascii())
    }
}

impl From<Command> for char {
    fn from(command: Command) -> Self {
        command.as_byte() as char
    }
}

impl TryFrom<char> for Command {
    type Error = Error;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        u8::try_from(c)
            .map(Command::from_byte)
            .map_err(|_| Error::UnknownCommand(c.to_string()))
    }
}

impl FromStr for Command {
    type Err = Error;

    /// Parses either the command character or its name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "?" | "query" => Ok(Command::Query),
            "!" | "set" => Ok(Command::Set),
            "#" | "broadcast" => Ok(Command::Broadcast),
            "*" | "subscribe" => Ok(Command::Subscribe),
            _ => Err(Error::UnknownCommand(s.to_string())),
        }
    }
}

/// Interaction pattern driven by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Fire and forget
    None,
    /// Exactly one reply
    Single,
    /// Replies until cancelled
    Stream,
}

/// A ThUDP record without its secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub command: Command,
    /// Zone name, at most [`crate::ZONE_LEN`] bytes survive encoding
    pub zone: String,
    /// Current value (meaningful for [`Command::Set`] only)
    pub value: f32,
    /// Desired value (meaningful for [`Command::Set`] only)
    pub setpoint: f32,
}

impl Record {
    pub fn new(command: Command, zone: impl Into<String>) -> Self {
        Self {
            command,
            zone: zone.into(),
            value: 0.0,
            setpoint: 0.0,
        }
    }

    pub fn query(zone: impl Into<String>) -> Self {
        Self::new(Command::Query, zone)
    }

    pub fn set(zone: impl Into<String>, value: f32, setpoint: f32) -> Self {
        Self {
            command: Command::Set,
            zone: zone.into(),
            value,
            setpoint,
        }
    }

    pub fn broadcast(zone: impl Into<String>) -> Self {
        Self::new(Command::Broadcast, zone)
    }

    pub fn subscribe() -> Self {
        Self::new(Command::Subscribe, "")
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} val={:.1} set={:.1}",
            self.command, self.zone, self.value, self.setpoint
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        for byte in [b'?', b'!', b'#', b'*', b'x', 0] {
            assert_eq!(Command::from_byte(byte).as_byte(), byte);
        }
        assert_eq!(Command::from_byte(b'x'), Command::Unknown(b'x'));
    }

    #[test]
    fn test_reply_mode() {
        assert_eq!(Command::Query.reply_mode(), ReplyMode::Single);
        assert_eq!(Command::Subscribe.reply_mode(), ReplyMode::Stream);
        assert_eq!(Command::Set.reply_mode(), ReplyMode::None);
        assert_eq!(Command::Broadcast.reply_mode(), ReplyMode::None);
        assert_eq!(Command::Unknown(b'x').reply_mode(), ReplyMode::None);
    }

    #[test]
    fn test_command_from_str() {
        assert_eq!("?".parse::<Command>().unwrap(), Command::Query);
        assert_eq!("SET".parse::<Command>().unwrap(), Command::Set);
        assert_eq!("#".parse::<Command>().unwrap(), Command::Broadcast);
        assert_eq!("subscribe".parse::<Command>().unwrap(), Command::Subscribe);
        assert!("get".parse::<Command>().is_err());
    }

    #[test]
    fn test_command_char_conversion() {
        assert_eq!(char::from(Command::Set), '!');
        assert_eq!(Command::try_from('*').unwrap(), Command::Subscribe);
        assert!(Command::try_from('€').is_err());
    }
}
