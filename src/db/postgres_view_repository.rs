use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::view_repository::ViewRepository;
use crate::models::view::{View, ViewDefinition};

pub struct PostgresViewRepository {
    pub pool: PgPool,
}

const VIEW_COLUMNS: &str = "id, name, pinned, definition, created_at, updated_at";

#[derive(FromRow)]
struct ViewRow {
    id: Uuid,
    name: String,
    pinned: bool,
    definition: serde_json::Value,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<ViewRow> for View {
    type Error = sqlx::Error;

    fn try_from(row: ViewRow) -> Result<Self, Self::Error> {
        let definition: ViewDefinition = serde_json::from_value(row.definition)
            .map_err(|e| sqlx::Error::Decode(format!("invalid view definition: {e}").into()))?;
        Ok(View {
            id: row.id,
            name: row.name,
            pinned: row.pinned,
            definition,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn definition_json(definition: &ViewDefinition) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(definition)
        .map_err(|e| sqlx::Error::Decode(format!("serialize failed: {e}").into()))
}

#[async_trait]
impl ViewRepository for PostgresViewRepository {
    async fn create_view(
        &self,
        name: &str,
        definition: ViewDefinition,
    ) -> Result<View, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO views (name, pinned, definition, created_at, updated_at)
            VALUES ($1, FALSE, $2, now(), now())
            RETURNING {VIEW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(name)
            .bind(definition_json(&definition)?)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn list_views(&self) -> Result<Vec<View>, sqlx::Error> {
        let sql = format!(
            "SELECT {VIEW_COLUMNS} FROM views ORDER BY pinned DESC, created_at ASC"
        );
        let rows = sqlx::query_as::<_, ViewRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(View::try_from).collect()
    }

    async fn find_view(&self, view_id: Uuid) -> Result<Option<View>, sqlx::Error> {
        let sql = format!("SELECT {VIEW_COLUMNS} FROM views WHERE id = $1");
        let row = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(view_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(View::try_from).transpose()
    }

    async fn update_view(
        &self,
        view_id: Uuid,
        name: &str,
        definition: ViewDefinition,
    ) -> Result<Option<View>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE views
            SET name = $2, definition = $3, updated_at = now()
            WHERE id = $1
            RETURNING {VIEW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(view_id)
            .bind(name)
            .bind(definition_json(&definition)?)
            .fetch_optional(&self.pool)
            .await?;
        row.map(View::try_from).transpose()
    }

    async fn set_pinned(&self, view_id: Uuid, pinned: bool) -> Result<Option<View>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE views
            SET pinned = $2, updated_at = now()
            WHERE id = $1
            RETURNING {VIEW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(view_id)
            .bind(pinned)
            .fetch_optional(&self.pool)
            .await?;
        row.map(View::try_from).transpose()
    }

    async fn delete_view(&self, view_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM views WHERE id = $1")
            .bind(view_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
