//! Queries on the `users` table.

use conquest_core::{ResourceBundle, User};
use sqlx::{FromRow, SqliteConnection};

use crate::error::StoreError;

#[derive(Debug, FromRow)]
struct UserRow {
    name: String,
    gold: i64,
    wood: i64,
    stone: i64,
    energy: i64,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            name: r.name,
            resources: ResourceBundle::new(r.gold, r.wood, r.stone, r.energy),
        }
    }
}

/// Insert `name` with `start` holdings unless it already exists.
/// Returns `true` when a row was created.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    name: &str,
    start: &ResourceBundle,
) -> Result<bool, StoreError> {
    let res = sqlx::query(
        "INSERT OR IGNORE INTO users (name, gold, wood, stone, energy) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(start.gold)
    .bind(start.wood)
    .bind(start.stone)
    .bind(start.energy)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Look up a user by name.
pub async fn fetch(conn: &mut SqliteConnection, name: &str) -> Result<Option<User>, StoreError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT name, gold, wood, stone, energy FROM users WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(User::from))
}

/// Subtract `cost` only if every field stays non-negative.
///
/// The affordability check and the debit are a single statement, so the
/// balance cannot be overdrawn between them. Returns `false` (and changes
/// nothing) when the user is missing or cannot afford the cost.
pub async fn debit(
    conn: &mut SqliteConnection,
    name: &str,
    cost: &ResourceBundle,
) -> Result<bool, StoreError> {
    let res = sqlx::query(
        "UPDATE users SET gold = gold - ?1, wood = wood - ?2, stone = stone - ?3, energy = energy - ?4 \
         WHERE name = ?5 AND gold >= ?1 AND wood >= ?2 AND stone >= ?3 AND energy >= ?4",
    )
    .bind(cost.gold)
    .bind(cost.wood)
    .bind(cost.stone)
    .bind(cost.energy)
    .bind(name)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Add `amount` to a user's holdings. Returns `false` if the user is missing.
pub async fn credit(
    conn: &mut SqliteConnection,
    name: &str,
    amount: &ResourceBundle,
) -> Result<bool, StoreError> {
    let res = sqlx::query(
        "UPDATE users SET gold = gold + ?, wood = wood + ?, stone = stone + ?, energy = energy + ? \
         WHERE name = ?",
    )
    .bind(amount.gold)
    .bind(amount.wood)
    .bind(amount.stone)
    .bind(amount.energy)
    .bind(name)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Overwrite a user's holdings. No game operation calls this; tests use it
/// to stage balances.
pub async fn set_resources(
    conn: &mut SqliteConnection,
    name: &str,
    resources: &ResourceBundle,
) -> Result<bool, StoreError> {
    let res = sqlx::query(
        "UPDATE users SET gold = ?, wood = ?, stone = ?, energy = ? WHERE name = ?",
    )
    .bind(resources.gold)
    .bind(resources.wood)
    .bind(resources.stone)
    .bind(resources.energy)
    .bind(name)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use conquest_core::STARTING_RESOURCES;

    #[tokio::test]
    async fn registration_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.pool().acquire().await.unwrap();
        assert!(insert_if_absent(&mut conn, "Alice", &STARTING_RESOURCES).await.unwrap());
        assert!(!insert_if_absent(&mut conn, "Alice", &ResourceBundle::ZERO).await.unwrap());
        let alice = fetch(&mut conn, "Alice").await.unwrap().unwrap();
        assert_eq!(alice.resources, STARTING_RESOURCES);
        assert!(fetch(&mut conn, "Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn debit_refuses_overdraft() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.pool().acquire().await.unwrap();
        insert_if_absent(&mut conn, "Bob", &ResourceBundle::new(10, 0, 0, 0))
            .await
            .unwrap();
        let cost = ResourceBundle::new(50, 20, 0, 0);
        assert!(!debit(&mut conn, "Bob", &cost).await.unwrap());
        let bob = fetch(&mut conn, "Bob").await.unwrap().unwrap();
        assert_eq!(bob.resources, ResourceBundle::new(10, 0, 0, 0));
        assert!(debit(&mut conn, "Bob", &ResourceBundle::new(10, 0, 0, 0)).await.unwrap());
        assert!(!debit(&mut conn, "Ghost", &ResourceBundle::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn credit_adds_to_holdings() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.pool().acquire().await.unwrap();
        insert_if_absent(&mut conn, "Carol", &STARTING_RESOURCES).await.unwrap();
        credit(&mut conn, "Carol", &ResourceBundle::new(20, 0, 4, 2)).await.unwrap();
        let carol = fetch(&mut conn, "Carol").await.unwrap().unwrap();
        assert_eq!(carol.resources, ResourceBundle::new(120, 50, 54, 22));
    }
}
