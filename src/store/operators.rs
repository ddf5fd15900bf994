use sqlx::PgPool;

use crate::models::Operator;

// ---

pub async fn find_by_employee_id(
    pool: &PgPool,
    employee_id: &str,
) -> Result<Option<Operator>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Operator>(
        r#"
        SELECT id, full_name, employee_id, department, login_pin
        FROM operators
        WHERE employee_id = $1
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await
}
