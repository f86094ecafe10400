//! Item types and the merge ladder
//!
//! Two touching items of the same kind fuse into the next kind in the chain.
//! The last kind is terminal and never merges further.

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Item types, in ladder order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Rice,
    Chili,
    Garlic,
    #[serde(alias = "dark-garlic")]
    DarkGarlic,
    Plum,
    Apple,
    Peach,
}

impl ItemKind {
    /// Every kind, smallest first
    pub const ALL: [ItemKind; 7] = [
        ItemKind::Rice,
        ItemKind::Chili,
        ItemKind::Garlic,
        ItemKind::DarkGarlic,
        ItemKind::Plum,
        ItemKind::Apple,
        ItemKind::Peach,
    ];

    /// The kind two of these merge into, or `None` for the terminal kind
    pub const fn successor(self) -> Option<ItemKind> {
        match self {
            ItemKind::Rice => Some(ItemKind::Chili),
            ItemKind::Chili => Some(ItemKind::Garlic),
            ItemKind::Garlic => Some(ItemKind::DarkGarlic),
            ItemKind::DarkGarlic => Some(ItemKind::Plum),
            ItemKind::Plum => Some(ItemKind::Apple),
            ItemKind::Apple => Some(ItemKind::Peach),
            ItemKind::Peach => None,
        }
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        self.successor().is_none()
    }

    /// Position in the ladder (0 = first)
    #[inline]
    pub const fn rank(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Rice => "rice",
            ItemKind::Chili => "chili",
            ItemKind::Garlic => "garlic",
            ItemKind::DarkGarlic => "darkgarlic",
            ItemKind::Plum => "plum",
            ItemKind::Apple => "apple",
            ItemKind::Peach => "peach",
        }
    }

    /// Parse a kind by name (case-insensitive, `dark-garlic` accepted)
    pub fn parse(s: &str) -> Result<Self, GameError> {
        match s.to_lowercase().as_str() {
            "rice" => Ok(ItemKind::Rice),
            "chili" => Ok(ItemKind::Chili),
            "garlic" => Ok(ItemKind::Garlic),
            "darkgarlic" | "dark-garlic" | "dark_garlic" => Ok(ItemKind::DarkGarlic),
            "plum" => Ok(ItemKind::Plum),
            "apple" => Ok(ItemKind::Apple),
            "peach" => Ok(ItemKind::Peach),
            _ => Err(GameError::UnknownItemType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
