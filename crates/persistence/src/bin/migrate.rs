#![deny(warnings)]

use persistence::{default_sqlite_url, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    let store = Store::connect(&url).await?;
    store.close().await;
    println!("DB migrated at {}", url);
    Ok(())
}
