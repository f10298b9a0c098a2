#![deny(warnings)]

//! Game service: economy and battle operations over an injected store.
//!
//! Each operation runs inside one database transaction, so the
//! affordability check, the debit and the resulting mutation either all
//! happen or none do.

use chrono::{DateTime, Utc};
use conquest_battle::{attack_power, defense_power, resolve, BattleReport, Dice, SeededDice};
use conquest_core::{
    validate_coord, validate_user_name, BuildingKind, Coord, GameConfig, PoiKind, ResourceBundle, Territory,
    TerritoryId, Troop, TroopKind, User, STARTING_RESOURCES,
};
use conquest_econ as econ;
use persistence::{territories, troops, users, Store};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};

pub mod error;

pub use error::GameError;

/// Outcome of crediting passive production to one user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualReport {
    pub user: String,
    /// Total resources added across all territories.
    pub credited: ResourceBundle,
    /// Territories whose production clock advanced.
    pub territories_updated: usize,
}

/// The game backend. Owns the store handle and the battle dice.
#[derive(Debug)]
pub struct Game<D = SeededDice> {
    store: Store,
    dice: D,
}

impl Game<SeededDice> {
    /// Open the configured database and seed the dice from the config.
    pub async fn from_config(cfg: &GameConfig) -> Result<Self, GameError> {
        let store = Store::connect(&cfg.database_url).await?;
        Ok(Self::new(store, SeededDice::new(cfg.rng_seed)))
    }
}

async fn require_user(conn: &mut SqliteConnection, name: &str) -> Result<User, GameError> {
    users::fetch(conn, name)
        .await?
        .ok_or_else(|| GameError::UnknownUser(name.to_string()))
}

async fn require_territory(
    conn: &mut SqliteConnection,
    id: TerritoryId,
) -> Result<Territory, GameError> {
    territories::fetch(conn, id)
        .await?
        .ok_or(GameError::UnknownTerritory(id))
}

/// Check `cost` against the stored holdings and debit it. The conditional
/// debit still refuses if the row changed after the read.
async fn pay(
    conn: &mut SqliteConnection,
    name: &str,
    cost: &ResourceBundle,
) -> Result<ResourceBundle, GameError> {
    let held = users::fetch(conn, name).await?.map(|u| u.resources);
    if !econ::can_afford(held.as_ref(), cost) {
        return Err(GameError::InsufficientResources(*cost));
    }
    let left = econ::spend(&held.unwrap_or_default(), cost)?;
    if !users::debit(conn, name, cost).await? {
        return Err(GameError::InsufficientResources(*cost));
    }
    debug!(user = name, cost = %cost, left = %left, "resources spent");
    Ok(left)
}

impl<D: Dice> Game<D> {
    /// Wrap an already migrated store and a dice source.
    pub fn new(store: Store, dice: D) -> Self {
        Self { store, dice }
    }

    /// The underlying store, for callers that need raw queries or `close`.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Register `name` with the starting resources. Registering an existing
    /// name changes nothing and returns the stored user.
    pub async fn register_user(&self, name: &str) -> Result<User, GameError> {
        validate_user_name(name)?;
        let mut tx = self.store.begin().await?;
        let created = users::insert_if_absent(&mut tx, name, &STARTING_RESOURCES).await?;
        let user = require_user(&mut tx, name).await?;
        tx.commit().await?;
        if created {
            info!(user = name, "user registered");
        }
        Ok(user)
    }

    /// Current holdings, or `None` for an unknown user.
    pub async fn user_resources(&self, name: &str) -> Result<Option<ResourceBundle>, GameError> {
        let mut conn = self.store.pool().acquire().await?;
        Ok(users::fetch(&mut conn, name).await?.map(|u| u.resources))
    }

    /// Claim the cell at `coord` for `user` at the current time.
    pub async fn claim_territory(
        &self,
        user: &str,
        coord: Coord,
        poi: Option<PoiKind>,
    ) -> Result<Territory, GameError> {
        self.claim_territory_at(user, coord, poi, Utc::now()).await
    }

    /// Claim the cell at `coord`, starting its production clock at `now`.
    pub async fn claim_territory_at(
        &self,
        user: &str,
        coord: Coord,
        poi: Option<PoiKind>,
        now: DateTime<Utc>,
    ) -> Result<Territory, GameError> {
        validate_coord(coord)?;
        let mut tx = self.store.begin().await?;
        require_user(&mut tx, user).await?;
        if territories::find_at(&mut tx, coord).await?.is_some() {
            return Err(GameError::AlreadyClaimed(coord));
        }
        pay(&mut tx, user, &econ::CLAIM_COST).await?;
        let territory = match territories::insert(&mut tx, user, coord, poi, now).await {
            Ok(t) => t,
            Err(e) if e.is_unique_violation() => return Err(GameError::AlreadyClaimed(coord)),
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;
        info!(user, territory = %territory.id, lat = coord.lat, lon = coord.lon, "territory claimed");
        Ok(territory)
    }

    /// Build `kind` on a territory `user` owns, paying its cost.
    pub async fn construct_building(
        &self,
        user: &str,
        territory: TerritoryId,
        kind: BuildingKind,
    ) -> Result<Territory, GameError> {
        let mut tx = self.store.begin().await?;
        require_user(&mut tx, user).await?;
        let current = require_territory(&mut tx, territory).await?;
        if current.owner != user {
            return Err(GameError::NotOwner {
                user: user.to_string(),
                territory,
            });
        }
        pay(&mut tx, user, &econ::building_cost(kind)).await?;
        territories::set_building(&mut tx, territory, kind, econ::building_defense_bonus(kind))
            .await?;
        let updated = require_territory(&mut tx, territory).await?;
        tx.commit().await?;
        info!(user, territory = %territory, building = %kind, defense = updated.defense, "building constructed");
        Ok(updated)
    }

    /// Train one troop of `kind` for `user`.
    pub async fn train_troop(&self, user: &str, kind: TroopKind) -> Result<Troop, GameError> {
        let mut tx = self.store.begin().await?;
        require_user(&mut tx, user).await?;
        pay(&mut tx, user, &econ::troop_cost(kind)).await?;
        let troop = troops::insert(&mut tx, user, kind, econ::troop_attack_bonus(kind)).await?;
        tx.commit().await?;
        info!(user, troop = %kind, attack_bonus = troop.attack_bonus, "troop trained");
        Ok(troop)
    }

    /// Credit production for every territory `user` owns, as of now.
    pub async fn accrue_production(&self, user: &str) -> Result<AccrualReport, GameError> {
        self.accrue_production_at(user, Utc::now()).await
    }

    /// Credit whole minutes of production up to `now`. Territories with less
    /// than a minute pending keep their clock, so the remainder carries over.
    pub async fn accrue_production_at(
        &self,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<AccrualReport, GameError> {
        let mut tx = self.store.begin().await?;
        require_user(&mut tx, user).await?;
        let owned = territories::list_owned(&mut tx, user).await?;
        let mut report = AccrualReport {
            user: user.to_string(),
            ..AccrualReport::default()
        };
        for t in owned {
            let Some(accrual) = econ::accrue(t.building, t.poi, t.last_update, now) else {
                continue;
            };
            if !accrual.credit.is_zero() {
                users::credit(&mut tx, user, &accrual.credit).await?;
            }
            territories::set_last_update(&mut tx, t.id, now).await?;
            debug!(territory = %t.id, minutes = accrual.minutes, credit = %accrual.credit, "production credited");
            report.credited = report.credited.saturating_add(&accrual.credit);
            report.territories_updated += 1;
        }
        tx.commit().await?;
        if report.territories_updated > 0 {
            info!(user, credited = %report.credited, territories = report.territories_updated, "production accrued");
        }
        Ok(report)
    }

    /// `attacker` attacks a territory held by someone else. On a win the
    /// territory changes hands; troops are never lost.
    pub async fn attack(
        &mut self,
        attacker: &str,
        territory: TerritoryId,
    ) -> Result<BattleReport, GameError> {
        let mut tx = self.store.begin().await?;
        require_user(&mut tx, attacker).await?;
        let target = require_territory(&mut tx, territory).await?;
        if target.owner == attacker {
            return Err(GameError::OwnTerritory(territory));
        }
        let atk = attack_power(troops::bonus_sum(&mut tx, attacker).await?);
        let def = defense_power(target.defense, troops::bonus_sum(&mut tx, &target.owner).await?);
        let clash = resolve(atk, def, &mut self.dice);
        let report = BattleReport::new(attacker.to_string(), target.owner, territory, clash);
        if report.conquered {
            territories::set_owner(&mut tx, territory, attacker).await?;
        }
        tx.commit().await?;
        info!(
            attacker,
            defender = %report.defender,
            territory = %territory,
            attack = clash.attack_total(),
            defense = clash.defense_total(),
            conquered = report.conquered,
            "battle resolved"
        );
        Ok(report)
    }

    /// Look up one territory by id.
    pub async fn territory(&self, id: TerritoryId) -> Result<Option<Territory>, GameError> {
        let mut conn = self.store.pool().acquire().await?;
        Ok(territories::fetch(&mut conn, id).await?)
    }

    /// Territories currently owned by `user`.
    pub async fn territories(&self, user: &str) -> Result<Vec<Territory>, GameError> {
        let mut conn = self.store.pool().acquire().await?;
        Ok(territories::list_owned(&mut conn, user).await?)
    }

    /// Troops trained by `user`.
    pub async fn troops(&self, user: &str) -> Result<Vec<Troop>, GameError> {
        let mut conn = self.store.pool().acquire().await?;
        Ok(troops::list_owned(&mut conn, user).await?)
    }
}
