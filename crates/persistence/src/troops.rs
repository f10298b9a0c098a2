//! Queries on the `troops` table.

use conquest_core::{Troop, TroopKind};
use sqlx::{FromRow, SqliteConnection};

use crate::error::StoreError;

#[derive(Debug, FromRow)]
struct TroopRow {
    id: i64,
    owner: String,
    kind: String,
    attack_bonus: i64,
}

impl TryFrom<TroopRow> for Troop {
    type Error = StoreError;

    fn try_from(r: TroopRow) -> Result<Self, Self::Error> {
        let kind = r
            .kind
            .parse::<TroopKind>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Troop {
            id: r.id,
            owner: r.owner,
            kind,
            attack_bonus: r.attack_bonus,
        })
    }
}

/// Record a trained troop with the bonus it was trained with.
pub async fn insert(
    conn: &mut SqliteConnection,
    owner: &str,
    kind: TroopKind,
    attack_bonus: i64,
) -> Result<Troop, StoreError> {
    let res = sqlx::query("INSERT INTO troops (owner, kind, attack_bonus) VALUES (?, ?, ?)")
        .bind(owner)
        .bind(kind.as_str())
        .bind(attack_bonus)
        .execute(&mut *conn)
        .await?;
    Ok(Troop {
        id: res.last_insert_rowid(),
        owner: owner.to_string(),
        kind,
        attack_bonus,
    })
}

/// Sum of stored attack bonuses over every troop `owner` has; zero if none.
pub async fn bonus_sum(conn: &mut SqliteConnection, owner: &str) -> Result<i64, StoreError> {
    let sum: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(attack_bonus), 0) FROM troops WHERE owner = ?")
            .bind(owner)
            .fetch_one(&mut *conn)
            .await?;
    Ok(sum)
}

/// Every troop `owner` has, oldest first.
pub async fn list_owned(conn: &mut SqliteConnection, owner: &str) -> Result<Vec<Troop>, StoreError> {
    let rows = sqlx::query_as::<_, TroopRow>(
        "SELECT id, owner, kind, attack_bonus FROM troops WHERE owner = ? ORDER BY id",
    )
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(Troop::try_from).collect()
}
