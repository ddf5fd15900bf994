use sqlx::PgConnection;

// ---

/// Style code of an article, `None` when the article does not exist.
pub async fn find_style(
    conn: &mut PgConnection,
    article_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    // ---
    sqlx::query_scalar("SELECT article_style FROM articles WHERE id = $1")
        .bind(article_id)
        .fetch_optional(conn)
        .await
}
