//! Roles and the loyalty they project to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The side a player is on. This is the only part of a role the rules
/// ever look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Loyalty {
    Good,
    Evil,
}

impl fmt::Display for Loyalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Evil => write!(f, "Evil"),
        }
    }
}

/// A dealt role card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Loyal servant of Arthur.
    LoyalServant,
    /// Minion of Mordred.
    Minion,
}

impl Role {
    pub fn loyalty(self) -> Loyalty {
        match self {
            Self::LoyalServant => Loyalty::Good,
            Self::Minion => Loyalty::Evil,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoyalServant => write!(f, "Loyal Servant of Arthur"),
            Self::Minion => write!(f, "Minion of Mordred"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_loyalty_projection() {
        assert_eq!(Role::LoyalServant.loyalty(), Loyalty::Good);
        assert_eq!(Role::Minion.loyalty(), Loyalty::Evil);
    }

    #[test]
    fn test_loyalty_serializes_as_variant_name() {
        let json = serde_json::to_string(&Loyalty::Evil).unwrap();
        assert_eq!(json, "\"Evil\"");
    }
}
