//! Player-name validation for registry identity and persistence safety.
//!
//! A player's name is its live-registry key and its storage key, so the
//! rules here are deliberately conservative: short ASCII names, no
//! whitespace, nothing that collides with command words or NPC key syntax.

use std::collections::HashSet;

/// Name validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("Name is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Name cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Name must start with a letter")]
    MustStartWithLetter,

    #[error("Name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Name is a reserved word")]
    Reserved,
}

const MIN_LENGTH: usize = 2;
const MAX_LENGTH: usize = 16;

/// Names that collide with command words or system identities.
fn reserved_names() -> HashSet<&'static str> {
    [
        "admin", "administrator", "root", "system", "sysop", "operator", "guest", "anonymous",
        "someone", "somebody", "self", "me", "all", "north", "south", "east", "west", "up",
        "down", "look", "get", "drop", "kill", "flee", "quit", "save", "who", "help",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a player name, returning its canonical (lowercase) registry key.
pub fn validate_player_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();

    if trimmed != name {
        return Err(NameError::InvalidWhitespace);
    }
    if trimmed.len() < MIN_LENGTH {
        return Err(NameError::TooShort { min: MIN_LENGTH });
    }
    if trimmed.len() > MAX_LENGTH {
        return Err(NameError::TooLong { max: MAX_LENGTH });
    }

    let lowered = trimmed.to_ascii_lowercase();
    if reserved_names().contains(lowered.as_str()) {
        return Err(NameError::Reserved);
    }

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(NameError::MustStartWithLetter),
    }

    // `#` is the NPC key separator and must never appear in a player key.
    let invalid: HashSet<char> = trimmed
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric())
        .collect();
    if !invalid.is_empty() {
        let mut chars: Vec<String> = invalid.into_iter().map(|c| format!("'{}'", c)).collect();
        chars.sort();
        return Err(NameError::InvalidCharacters {
            chars: chars.join(", "),
        });
    }

    Ok(lowered)
}
