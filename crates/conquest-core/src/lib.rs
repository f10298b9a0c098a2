#![deny(warnings)]

//! Core domain models and invariants for the territory-conquest game.
//!
//! This crate defines the serializable types shared by the economy, battle,
//! persistence, and runtime crates: resource bundles, the closed kinds of
//! buildings, troops and points of interest, and the stored records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod config;

pub use config::{ConfigError, GameConfig};

/// The four resource kinds a user can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Gold coins.
    Gold,
    /// Wood planks.
    Wood,
    /// Stone blocks.
    Stone,
    /// Energy units.
    Energy,
}

impl ResourceKind {
    /// Every resource kind in storage order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Gold,
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Energy,
    ];

    /// Lowercase name used in messages and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Gold => "gold",
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Energy => "energy",
        }
    }
}

/// Amounts per resource kind. Used for costs, holdings and production.
///
/// Kinds that a cost does not mention are simply zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceBundle {
    /// Gold amount.
    pub gold: i64,
    /// Wood amount.
    pub wood: i64,
    /// Stone amount.
    pub stone: i64,
    /// Energy amount.
    pub energy: i64,
}

/// Holdings granted to a user on first registration.
pub const STARTING_RESOURCES: ResourceBundle = ResourceBundle::new(100, 50, 50, 20);

impl ResourceBundle {
    /// The empty bundle.
    pub const ZERO: ResourceBundle = ResourceBundle::new(0, 0, 0, 0);

    /// Build a bundle from explicit amounts (gold, wood, stone, energy).
    pub const fn new(gold: i64, wood: i64, stone: i64, energy: i64) -> Self {
        Self {
            gold,
            wood,
            stone,
            energy,
        }
    }

    /// Amount held for a single kind.
    pub fn get(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Energy => self.energy,
        }
    }

    /// Return a copy with one kind replaced.
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, amount: i64) -> Self {
        match kind {
            ResourceKind::Gold => self.gold = amount,
            ResourceKind::Wood => self.wood = amount,
            ResourceKind::Stone => self.stone = amount,
            ResourceKind::Energy => self.energy = amount,
        }
        self
    }

    /// True when every kind is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// True when every kind is held in at least the amount `cost` requires.
    pub fn covers(&self, cost: &ResourceBundle) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|&k| self.get(k) >= cost.get(k))
    }

    /// Subtract `cost`, or `None` if any kind would go negative.
    pub fn checked_sub(&self, cost: &ResourceBundle) -> Option<ResourceBundle> {
        if !self.covers(cost) {
            return None;
        }
        Some(ResourceBundle::new(
            self.gold.checked_sub(cost.gold)?,
            self.wood.checked_sub(cost.wood)?,
            self.stone.checked_sub(cost.stone)?,
            self.energy.checked_sub(cost.energy)?,
        ))
    }

    /// Add two bundles, saturating at `i64::MAX`.
    #[must_use]
    pub fn saturating_add(&self, other: &ResourceBundle) -> ResourceBundle {
        ResourceBundle::new(
            self.gold.saturating_add(other.gold),
            self.wood.saturating_add(other.wood),
            self.stone.saturating_add(other.stone),
            self.energy.saturating_add(other.energy),
        )
    }

    /// Multiply every kind by `factor`, saturating.
    #[must_use]
    pub fn scaled(&self, factor: i64) -> ResourceBundle {
        ResourceBundle::new(
            self.gold.saturating_mul(factor),
            self.wood.saturating_mul(factor),
            self.stone.saturating_mul(factor),
            self.energy.saturating_mul(factor),
        )
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in ResourceKind::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}: {}", kind.as_str(), self.get(kind))?;
        }
        Ok(())
    }
}

/// Error returned when a kind name does not match any known variant.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {category}: {value:?}")]
pub struct ParseKindError {
    /// Which enumeration was being parsed ("building", "troop", "poi").
    pub category: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Constructible structures. The first five produce resources, the last two
/// raise a territory's defense rating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// House.
    Casa,
    /// Factory, produces gold.
    Fabrica,
    /// Sawmill, produces wood.
    Serraria,
    /// Quarry, produces stone.
    Pedreira,
    /// Power plant, produces energy.
    Usina,
    /// Wall, raises defense.
    Muralha,
    /// Tower, raises defense.
    Torre,
}

impl BuildingKind {
    /// Every building kind.
    pub const ALL: [BuildingKind; 7] = [
        BuildingKind::Casa,
        BuildingKind::Fabrica,
        BuildingKind::Serraria,
        BuildingKind::Pedreira,
        BuildingKind::Usina,
        BuildingKind::Muralha,
        BuildingKind::Torre,
    ];

    /// Stored and displayed name.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildingKind::Casa => "casa",
            BuildingKind::Fabrica => "fabrica",
            BuildingKind::Serraria => "serraria",
            BuildingKind::Pedreira => "pedreira",
            BuildingKind::Usina => "usina",
            BuildingKind::Muralha => "muralha",
            BuildingKind::Torre => "torre",
        }
    }
}

/// Trainable troop types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopKind {
    /// Foot soldier.
    Soldado,
    /// Archer.
    Arqueiro,
    /// Knight.
    Cavaleiro,
}

impl TroopKind {
    /// Every troop kind.
    pub const ALL: [TroopKind; 3] = [TroopKind::Soldado, TroopKind::Arqueiro, TroopKind::Cavaleiro];

    /// Stored and displayed name.
    pub fn as_str(self) -> &'static str {
        match self {
            TroopKind::Soldado => "soldado",
            TroopKind::Arqueiro => "arqueiro",
            TroopKind::Cavaleiro => "cavaleiro",
        }
    }
}

/// Environmental tag fixed on a territory at claim time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    /// Park, yields energy.
    Parque,
    /// Restaurant, yields gold.
    Restaurante,
    /// Natural quarry, yields stone.
    PedreiraNatural,
}

impl PoiKind {
    /// Every point-of-interest kind.
    pub const ALL: [PoiKind; 3] = [PoiKind::Parque, PoiKind::Restaurante, PoiKind::PedreiraNatural];

    /// Stored and displayed name.
    pub fn as_str(self) -> &'static str {
        match self {
            PoiKind::Parque => "parque",
            PoiKind::Restaurante => "restaurante",
            PoiKind::PedreiraNatural => "pedreira_natural",
        }
    }
}

fn parse_kind<K: Copy>(
    all: &[K],
    name: fn(K) -> &'static str,
    category: &'static str,
    s: &str,
) -> Result<K, ParseKindError> {
    let wanted = s.trim();
    all.iter()
        .copied()
        .find(|&k| name(k).eq_ignore_ascii_case(wanted))
        .ok_or_else(|| ParseKindError {
            category,
            value: s.to_string(),
        })
}

impl FromStr for BuildingKind {
    type Err = ParseKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind(&Self::ALL, Self::as_str, "building", s)
    }
}

impl FromStr for TroopKind {
    type Err = ParseKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind(&Self::ALL, Self::as_str, "troop", s)
    }
}

impl FromStr for PoiKind {
    type Err = ParseKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind(&Self::ALL, Self::as_str, "poi", s)
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TroopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PoiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map coordinate. Equality is exact; two claims collide only on identical
/// (lat, lon) pairs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coord {
    /// Build a coordinate.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Unique identifier of a territory row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TerritoryId(pub i64);

impl fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered player and their holdings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique player name.
    pub name: String,
    /// Current holdings (never negative).
    pub resources: ResourceBundle,
}

/// A claimed map cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    /// Row identifier.
    pub id: TerritoryId,
    /// Name of the owning user.
    pub owner: String,
    /// Location; unique across all territories.
    pub coord: Coord,
    /// Structure built on the cell, if any.
    pub building: Option<BuildingKind>,
    /// Environmental tag, if any.
    pub poi: Option<PoiKind>,
    /// Accumulated defense rating (>= 0, only ever increases).
    pub defense: i64,
    /// Last time production was credited for this cell.
    pub last_update: DateTime<Utc>,
}

/// A trained unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Troop {
    /// Row identifier.
    pub id: i64,
    /// Name of the owning user.
    pub owner: String,
    /// Troop type.
    pub kind: TroopKind,
    /// Attack bonus fixed when the troop was trained.
    pub attack_bonus: i64,
}

/// Validation errors for domain inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// User names must contain a non-whitespace character.
    #[error("user name must not be empty")]
    EmptyName,
    /// Coordinates must be finite numbers.
    #[error("coordinate ({lat}, {lon}) is not a finite point")]
    NonFiniteCoord { lat: f64, lon: f64 },
}

/// Validate a user name before registration.
pub fn validate_user_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

/// Reject NaN or infinite coordinates before they reach the map.
pub fn validate_coord(coord: Coord) -> Result<(), ValidationError> {
    if !(coord.lat.is_finite() && coord.lon.is_finite()) {
        return Err(ValidationError::NonFiniteCoord {
            lat: coord.lat,
            lon: coord.lon,
        });
    }
    Ok(())
}
