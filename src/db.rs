// src/db.rs - Read-side schema of the inventory/order collaborator
//
// The service never writes these tables. `run_migrations` only exists so a
// fresh development database (or a test pool) has the shape the ERP exports.

use sqlx::SqlitePool;
use anyhow::Result;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stock_locations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 255),
            barcode TEXT CHECK(barcode IS NULL OR length(barcode) <= 255),
            parent_id INTEGER,
            usage TEXT NOT NULL DEFAULT 'internal',
            active INTEGER NOT NULL DEFAULT 1 CHECK(active IN (0, 1)),
            FOREIGN KEY (parent_id) REFERENCES stock_locations (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS res_partners (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sale_orders (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            partner_id INTEGER,
            state TEXT NOT NULL,
            source_location_id INTEGER,
            container_ref TEXT,
            external_ref TEXT,
            write_date DATETIME NOT NULL,
            FOREIGN KEY (partner_id) REFERENCES res_partners (id),
            FOREIGN KEY (source_location_id) REFERENCES stock_locations (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_state_changes (
            id INTEGER PRIMARY KEY,
            order_id INTEGER NOT NULL,
            new_state TEXT NOT NULL,
            changed_at DATETIME NOT NULL,
            FOREIGN KEY (order_id) REFERENCES sale_orders (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stock_quants (
            id INTEGER PRIMARY KEY,
            location_id INTEGER NOT NULL,
            quantity REAL NOT NULL DEFAULT 0.0,
            FOREIGN KEY (location_id) REFERENCES stock_locations (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    create_indexes(pool).await?;

    log::info!("Database schema ready");
    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_stock_locations_parent ON stock_locations(parent_id, usage)",
        "CREATE INDEX IF NOT EXISTS idx_sale_orders_source_state ON sale_orders(source_location_id, state)",
        "CREATE INDEX IF NOT EXISTS idx_order_state_changes_order ON order_state_changes(order_id, new_state)",
        "CREATE INDEX IF NOT EXISTS idx_stock_quants_location ON stock_quants(location_id)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Single-connection in-memory pool; every connection of `sqlite::memory:`
/// would otherwise see its own empty database.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}
