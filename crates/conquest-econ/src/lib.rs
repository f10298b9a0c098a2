#![deny(warnings)]

//! Economic rules: cost tables, affordability, and passive production.
//!
//! This crate provides pure helpers for:
//! - Claim, building and troop cost tables (exhaustive over the kinds)
//! - Affordability checks and non-negative spending
//! - Production rates and whole-minute accrual since a timestamp

use chrono::{DateTime, Utc};
use conquest_core::{BuildingKind, PoiKind, ResourceBundle, TroopKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EconError {
    /// Holdings do not cover the cost in at least one kind.
    #[error("insufficient resources: need {needed}, have {held}")]
    InsufficientResources {
        /// Requested cost.
        needed: ResourceBundle,
        /// Holdings at the time of the check.
        held: ResourceBundle,
    },
}

/// Cost of claiming an empty map cell.
pub const CLAIM_COST: ResourceBundle = ResourceBundle::new(50, 20, 0, 0);

/// Cost of constructing `kind`.
pub fn building_cost(kind: BuildingKind) -> ResourceBundle {
    match kind {
        BuildingKind::Casa => ResourceBundle::new(0, 50, 20, 0),
        BuildingKind::Fabrica => ResourceBundle::new(100, 0, 0, 50),
        BuildingKind::Serraria => ResourceBundle::new(80, 0, 30, 0),
        BuildingKind::Pedreira => ResourceBundle::new(70, 40, 0, 0),
        BuildingKind::Usina => ResourceBundle::new(120, 0, 50, 0),
        BuildingKind::Muralha => ResourceBundle::new(0, 30, 60, 0),
        BuildingKind::Torre => ResourceBundle::new(60, 0, 80, 0),
    }
}

/// Defense rating added to a territory when `kind` is constructed on it.
/// Production buildings add nothing.
pub fn building_defense_bonus(kind: BuildingKind) -> i64 {
    match kind {
        BuildingKind::Muralha => 5,
        BuildingKind::Torre => 10,
        BuildingKind::Casa
        | BuildingKind::Fabrica
        | BuildingKind::Serraria
        | BuildingKind::Pedreira
        | BuildingKind::Usina => 0,
    }
}

/// Cost of training one troop of `kind`.
pub fn troop_cost(kind: TroopKind) -> ResourceBundle {
    match kind {
        TroopKind::Soldado => ResourceBundle::new(50, 20, 0, 0),
        TroopKind::Arqueiro => ResourceBundle::new(70, 30, 0, 0),
        TroopKind::Cavaleiro => ResourceBundle::new(100, 0, 50, 30),
    }
}

/// Attack bonus stamped onto a troop of `kind` when it is trained.
pub fn troop_attack_bonus(kind: TroopKind) -> i64 {
    match kind {
        TroopKind::Soldado => 5,
        TroopKind::Arqueiro => 7,
        TroopKind::Cavaleiro => 12,
    }
}

/// Per-minute production of a building.
pub fn building_production(kind: BuildingKind) -> ResourceBundle {
    match kind {
        BuildingKind::Fabrica => ResourceBundle::new(10, 0, 0, 0),
        BuildingKind::Serraria => ResourceBundle::new(0, 5, 0, 0),
        BuildingKind::Pedreira => ResourceBundle::new(0, 0, 7, 0),
        BuildingKind::Usina => ResourceBundle::new(0, 0, 0, 3),
        BuildingKind::Casa | BuildingKind::Muralha | BuildingKind::Torre => ResourceBundle::ZERO,
    }
}

/// Per-minute production of a point of interest.
pub fn poi_production(kind: PoiKind) -> ResourceBundle {
    match kind {
        PoiKind::Parque => ResourceBundle::new(0, 0, 0, 2),
        PoiKind::Restaurante => ResourceBundle::new(5, 0, 0, 0),
        PoiKind::PedreiraNatural => ResourceBundle::new(0, 0, 4, 0),
    }
}

/// Combined per-minute production of a cell. Building and POI yields stack.
pub fn production_per_minute(
    building: Option<BuildingKind>,
    poi: Option<PoiKind>,
) -> ResourceBundle {
    let b = building.map(building_production).unwrap_or_default();
    let p = poi.map(poi_production).unwrap_or_default();
    b.saturating_add(&p)
}

/// Whole minutes elapsed from `since` to `now`; zero if `now` is earlier.
pub fn elapsed_minutes(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_minutes().max(0)
}

/// Production owed to one territory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accrual {
    /// Whole minutes credited (>= 1).
    pub minutes: i64,
    /// Resources to credit to the owner.
    pub credit: ResourceBundle,
}

/// Compute what a territory has produced since `last_update`.
///
/// Returns `None` while less than one full minute has passed; the partial
/// minute is carried to the next call because the caller leaves the
/// timestamp untouched in that case. A territory with nothing to produce
/// still yields an `Accrual` with a zero credit so its clock advances.
///
/// Example:
/// let a = accrue(Some(BuildingKind::Fabrica), None, now - 125s, now).unwrap();
/// assert_eq!(a.credit.gold, 20);
pub fn accrue(
    building: Option<BuildingKind>,
    poi: Option<PoiKind>,
    last_update: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<Accrual> {
    let minutes = elapsed_minutes(last_update, now);
    if minutes < 1 {
        return None;
    }
    Some(Accrual {
        minutes,
        credit: production_per_minute(building, poi).scaled(minutes),
    })
}

/// True iff `holdings` exist and cover `cost`. A missing user can afford
/// nothing, not even a zero cost.
pub fn can_afford(holdings: Option<&ResourceBundle>, cost: &ResourceBundle) -> bool {
    holdings.is_some_and(|h| h.covers(cost))
}

/// Subtract `cost` from `holdings`, refusing any overdraft.
pub fn spend(holdings: &ResourceBundle, cost: &ResourceBundle) -> Result<ResourceBundle, EconError> {
    holdings
        .checked_sub(cost)
        .ok_or(EconError::InsufficientResources {
            needed: *cost,
            held: *holdings,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use conquest_core::{ResourceKind, STARTING_RESOURCES};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn claim_from_starting_balance() {
        let left = spend(&STARTING_RESOURCES, &CLAIM_COST).unwrap();
        assert_eq!(left, ResourceBundle::new(50, 30, 50, 20));
    }

    #[test]
    fn cavaleiro_without_gold_is_refused() {
        let broke = STARTING_RESOURCES.with(ResourceKind::Gold, 0);
        let cost = troop_cost(TroopKind::Cavaleiro);
        assert!(!can_afford(Some(&broke), &cost));
        let err = spend(&broke, &cost).unwrap_err();
        assert!(matches!(err, EconError::InsufficientResources { .. }));
    }

    #[test]
    fn missing_user_affords_nothing() {
        assert!(!can_afford(None, &ResourceBundle::ZERO));
        assert!(can_afford(Some(&ResourceBundle::ZERO), &ResourceBundle::ZERO));
    }

    #[test]
    fn only_defensive_structures_add_defense() {
        for kind in BuildingKind::ALL {
            let bonus = building_defense_bonus(kind);
            match kind {
                BuildingKind::Muralha => assert_eq!(bonus, 5),
                BuildingKind::Torre => assert_eq!(bonus, 10),
                _ => assert_eq!(bonus, 0),
            }
        }
    }

    #[test]
    fn troop_bonuses() {
        assert_eq!(troop_attack_bonus(TroopKind::Soldado), 5);
        assert_eq!(troop_attack_bonus(TroopKind::Arqueiro), 7);
        assert_eq!(troop_attack_bonus(TroopKind::Cavaleiro), 12);
    }

    #[test]
    fn fabrica_after_125_seconds_yields_two_minutes() {
        let now = t0();
        let a = accrue(Some(BuildingKind::Fabrica), None, now - Duration::seconds(125), now).unwrap();
        assert_eq!(a.minutes, 2);
        assert_eq!(a.credit, ResourceBundle::new(20, 0, 0, 0));
    }

    #[test]
    fn building_and_poi_stack() {
        let now = t0();
        let a = accrue(
            Some(BuildingKind::Usina),
            Some(PoiKind::Parque),
            now - Duration::minutes(3),
            now,
        )
        .unwrap();
        assert_eq!(a.credit, ResourceBundle::new(0, 0, 0, 15));
        let b = production_per_minute(Some(BuildingKind::Pedreira), Some(PoiKind::PedreiraNatural));
        assert_eq!(b.stone, 11);
    }

    #[test]
    fn partial_minute_is_not_credited() {
        let now = t0();
        assert_eq!(accrue(Some(BuildingKind::Fabrica), None, now - Duration::seconds(59), now), None);
        assert_eq!(accrue(Some(BuildingKind::Fabrica), None, now, now), None);
    }

    #[test]
    fn clock_skew_counts_as_zero() {
        let now = t0();
        assert_eq!(elapsed_minutes(now + Duration::minutes(5), now), 0);
    }

    #[test]
    fn idle_territory_still_advances() {
        let now = t0();
        let a = accrue(Some(BuildingKind::Casa), None, now - Duration::minutes(10), now).unwrap();
        assert!(a.credit.is_zero());
        assert_eq!(a.minutes, 10);
    }

    proptest! {
        #[test]
        fn accrual_is_linear_in_minutes(secs in 60i64..1_000_000) {
            let now = t0();
            let a = accrue(Some(BuildingKind::Fabrica), Some(PoiKind::Restaurante), now - Duration::seconds(secs), now).unwrap();
            prop_assert_eq!(a.minutes, secs / 60);
            prop_assert_eq!(a.credit.gold, 15 * (secs / 60));
        }

        #[test]
        fn affordable_spend_stays_non_negative(g in 0i64..500, w in 0i64..500, s in 0i64..500, e in 0i64..500) {
            let held = ResourceBundle::new(g, w, s, e);
            for kind in TroopKind::ALL {
                let cost = troop_cost(kind);
                if can_afford(Some(&held), &cost) {
                    let left = spend(&held, &cost).unwrap();
                    for k in ResourceKind::ALL {
                        prop_assert!(left.get(k) >= 0);
                    }
                }
            }
        }
    }
}
