//! Failures surfaced by game operations.

use conquest_core::{Coord, ResourceBundle, TerritoryId, ValidationError};
use conquest_econ::EconError;
use persistence::StoreError;
use thiserror::Error;

/// Errors returned by [`crate::Game`] operations.
///
/// Every variant except [`GameError::Store`] is a rule rejection: the
/// operation changed nothing and the message can be shown to the player.
#[derive(Debug, Error)]
pub enum GameError {
    /// The map cell is already owned.
    #[error("territory at ({}, {}) is already claimed", .0.lat, .0.lon)]
    AlreadyClaimed(Coord),

    /// Holdings do not cover the cost shown.
    #[error("insufficient resources: need {0}")]
    InsufficientResources(ResourceBundle),

    /// No user is registered under this name.
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    /// No territory has this id.
    #[error("unknown territory {0}")]
    UnknownTerritory(TerritoryId),

    /// Construction on a territory held by someone else.
    #[error("{user} does not own territory {territory}")]
    NotOwner { user: String, territory: TerritoryId },

    /// The attacker already owns the target.
    #[error("cannot attack your own territory {0}")]
    OwnTerritory(TerritoryId),

    /// A name or coordinate failed validation.
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    /// Database or migration failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// True for game-rule rejections, false for infrastructure failures.
    pub fn is_rule(&self) -> bool {
        !matches!(self, GameError::Store(_))
    }
}

impl From<EconError> for GameError {
    fn from(e: EconError) -> Self {
        match e {
            EconError::InsufficientResources { needed, .. } => GameError::InsufficientResources(needed),
        }
    }
}

impl From<sqlx::Error> for GameError {
    fn from(e: sqlx::Error) -> Self {
        GameError::Store(StoreError::from(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn econ_overdraft_maps_to_rule_rejection() {
        let needed = ResourceBundle::new(100, 0, 50, 30);
        let err = GameError::from(EconError::InsufficientResources {
            needed,
            held: ResourceBundle::ZERO,
        });
        assert!(matches!(err, GameError::InsufficientResources(n) if n == needed));
        assert!(err.is_rule());
    }
}
