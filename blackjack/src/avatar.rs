//! Deterministic avatar selection from a participant's name.

use std::fmt;

const AVATARS: [&str; 32] = [
    "🦄", "🐱", "🐶", "🦊", "🐸", "🐵", "🐼", "🐯", "🐨", "🐰", "🦁", "🐮", "🐷", "🐙", "🐧", "🐤",
    "🦉", "🦋", "🐝", "🦄", "🐲", "🦖", "🦕", "🦓", "🦒", "🦘", "🦥", "🦦", "🦨", "🦡", "🦔", "🐾",
];

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Avatar {
    Dealer,
    /// Index into the avatar table.
    Participant(usize),
}

impl Avatar {
    /// Sums the name's UTF-16 code units, so the same name always maps to
    /// the same avatar on every client.
    pub fn for_name(name: &str) -> Self {
        let hash: u64 = name.encode_utf16().map(u64::from).sum();
        Self::Participant((hash % AVATARS.len() as u64) as usize)
    }
}

impl fmt::Display for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Dealer => "🃏",
            Self::Participant(idx) => AVATARS[*idx % AVATARS.len()],
        };
        write!(f, "{repr}")
    }
}
