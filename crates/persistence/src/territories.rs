//! Queries on the `territories` table.
//!
//! `last_update` is stored as unix epoch milliseconds; building and POI
//! kinds as their lowercase names.

use chrono::{DateTime, TimeZone, Utc};
use conquest_core::{BuildingKind, Coord, PoiKind, Territory, TerritoryId};
use sqlx::{FromRow, SqliteConnection};

use crate::error::StoreError;

const SELECT_TERRITORY: &str =
    "SELECT id, owner, lat, lon, building, poi, defense, last_update FROM territories";

#[derive(Debug, FromRow)]
struct TerritoryRow {
    id: i64,
    owner: String,
    lat: f64,
    lon: f64,
    building: Option<String>,
    poi: Option<String>,
    defense: i64,
    last_update: i64,
}

impl TryFrom<TerritoryRow> for Territory {
    type Error = StoreError;

    fn try_from(r: TerritoryRow) -> Result<Self, Self::Error> {
        let building = r
            .building
            .as_deref()
            .map(str::parse::<BuildingKind>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let poi = r
            .poi
            .as_deref()
            .map(str::parse::<PoiKind>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let last_update = Utc
            .timestamp_millis_opt(r.last_update)
            .single()
            .ok_or_else(|| StoreError::Corrupt(format!("timestamp {}", r.last_update)))?;
        Ok(Territory {
            id: TerritoryId(r.id),
            owner: r.owner,
            coord: Coord::new(r.lat, r.lon),
            building,
            poi,
            defense: r.defense,
            last_update,
        })
    }
}

/// Id of the territory at exactly `coord`, if any.
pub async fn find_at(
    conn: &mut SqliteConnection,
    coord: Coord,
) -> Result<Option<TerritoryId>, StoreError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM territories WHERE lat = ? AND lon = ?")
        .bind(coord.lat)
        .bind(coord.lon)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id.map(TerritoryId))
}

/// Insert a freshly claimed territory with no building and zero defense.
///
/// Fails with a UNIQUE violation if the coordinate is already taken.
pub async fn insert(
    conn: &mut SqliteConnection,
    owner: &str,
    coord: Coord,
    poi: Option<PoiKind>,
    now: DateTime<Utc>,
) -> Result<Territory, StoreError> {
    let res = sqlx::query(
        "INSERT INTO territories (owner, lat, lon, building, poi, defense, last_update) \
         VALUES (?, ?, ?, NULL, ?, 0, ?)",
    )
    .bind(owner)
    .bind(coord.lat)
    .bind(coord.lon)
    .bind(poi.map(PoiKind::as_str))
    .bind(now.timestamp_millis())
    .execute(&mut *conn)
    .await?;
    let id = TerritoryId(res.last_insert_rowid());
    fetch(conn, id)
        .await?
        .ok_or_else(|| StoreError::Corrupt(format!("territory {id} vanished after insert")))
}

/// Look up a territory by id.
pub async fn fetch(
    conn: &mut SqliteConnection,
    id: TerritoryId,
) -> Result<Option<Territory>, StoreError> {
    let row = sqlx::query_as::<_, TerritoryRow>(&format!("{SELECT_TERRITORY} WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Territory::try_from).transpose()
}

/// All territories owned by `owner`, oldest first.
pub async fn list_owned(
    conn: &mut SqliteConnection,
    owner: &str,
) -> Result<Vec<Territory>, StoreError> {
    let rows = sqlx::query_as::<_, TerritoryRow>(&format!(
        "{SELECT_TERRITORY} WHERE owner = ? ORDER BY id"
    ))
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(Territory::try_from).collect()
}

/// Replace the building on a territory and raise its defense by `defense_bonus`.
pub async fn set_building(
    conn: &mut SqliteConnection,
    id: TerritoryId,
    building: BuildingKind,
    defense_bonus: i64,
) -> Result<bool, StoreError> {
    let res = sqlx::query("UPDATE territories SET building = ?, defense = defense + ? WHERE id = ?")
        .bind(building.as_str())
        .bind(defense_bonus)
        .bind(id.0)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Hand a territory to a new owner.
pub async fn set_owner(
    conn: &mut SqliteConnection,
    id: TerritoryId,
    owner: &str,
) -> Result<bool, StoreError> {
    let res = sqlx::query("UPDATE territories SET owner = ? WHERE id = ?")
        .bind(owner)
        .bind(id.0)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Move the production clock of a territory.
pub async fn set_last_update(
    conn: &mut SqliteConnection,
    id: TerritoryId,
    at: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let res = sqlx::query("UPDATE territories SET last_update = ? WHERE id = ?")
        .bind(at.timestamp_millis())
        .bind(id.0)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{users, Store};
    use chrono::Duration;
    use conquest_core::STARTING_RESOURCES;

    async fn store_with(owner: &str) -> Store {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.pool().acquire().await.unwrap();
        users::insert_if_absent(&mut conn, owner, &STARTING_RESOURCES)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn insert_and_fetch_roundtrip() {
        let store = store_with("Alice").await;
        let mut conn = store.pool().acquire().await.unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let t = insert(&mut conn, "Alice", Coord::new(10.0, 20.0), Some(PoiKind::Parque), now)
            .await
            .unwrap();
        assert_eq!(t.owner, "Alice");
        assert_eq!(t.building, None);
        assert_eq!(t.poi, Some(PoiKind::Parque));
        assert_eq!(t.defense, 0);
        assert_eq!(t.last_update, now);
        assert_eq!(find_at(&mut conn, Coord::new(10.0, 20.0)).await.unwrap(), Some(t.id));
        assert_eq!(find_at(&mut conn, Coord::new(10.0, 20.000001)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_coordinates_violate_unique() {
        let store = store_with("Alice").await;
        let mut conn = store.pool().acquire().await.unwrap();
        let now = Utc::now();
        insert(&mut conn, "Alice", Coord::new(1.5, 2.5), None, now).await.unwrap();
        let err = insert(&mut conn, "Alice", Coord::new(1.5, 2.5), None, now)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn building_accumulates_defense() {
        let store = store_with("Alice").await;
        let mut conn = store.pool().acquire().await.unwrap();
        let t = insert(&mut conn, "Alice", Coord::new(0.0, 0.0), None, Utc::now())
            .await
            .unwrap();
        set_building(&mut conn, t.id, BuildingKind::Muralha, 5).await.unwrap();
        set_building(&mut conn, t.id, BuildingKind::Torre, 10).await.unwrap();
        let t = fetch(&mut conn, t.id).await.unwrap().unwrap();
        assert_eq!(t.building, Some(BuildingKind::Torre));
        assert_eq!(t.defense, 15);
    }

    #[tokio::test]
    async fn owner_and_clock_updates() {
        let store = store_with("Alice").await;
        let mut conn = store.pool().acquire().await.unwrap();
        users::insert_if_absent(&mut conn, "Bob", &STARTING_RESOURCES).await.unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let t = insert(&mut conn, "Alice", Coord::new(3.0, 4.0), None, now).await.unwrap();
        set_owner(&mut conn, t.id, "Bob").await.unwrap();
        set_last_update(&mut conn, t.id, now + Duration::minutes(5)).await.unwrap();
        assert!(list_owned(&mut conn, "Alice").await.unwrap().is_empty());
        let bobs = list_owned(&mut conn, "Bob").await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].last_update, now + Duration::minutes(5));
        assert!(fetch(&mut conn, TerritoryId(999)).await.unwrap().is_none());
    }
}
