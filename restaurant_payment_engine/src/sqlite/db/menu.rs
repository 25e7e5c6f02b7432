use sqlx::SqliteConnection;

use crate::db_types::MenuItem;

pub async fn fetch_menu_item(id: &str, conn: &mut SqliteConnection) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM menu_items WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn upsert_menu_item(item: MenuItem, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO menu_items (id, name, price, available) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET name = $2, price = $3, available = $4;
        "#,
    )
    .bind(&item.id)
    .bind(&item.name)
    .bind(item.price)
    .bind(item.available)
    .execute(conn)
    .await?;
    Ok(())
}
