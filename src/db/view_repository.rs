use async_trait::async_trait;
use uuid::Uuid;

use crate::models::view::{View, ViewDefinition};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ViewRepository: Send + Sync {
    async fn create_view(
        &self,
        name: &str,
        definition: ViewDefinition,
    ) -> Result<View, sqlx::Error>;

    /// Pinned views first, then by creation time.
    async fn list_views(&self) -> Result<Vec<View>, sqlx::Error>;

    async fn find_view(&self, view_id: Uuid) -> Result<Option<View>, sqlx::Error>;

    async fn update_view(
        &self,
        view_id: Uuid,
        name: &str,
        definition: ViewDefinition,
    ) -> Result<Option<View>, sqlx::Error>;

    async fn set_pinned(&self, view_id: Uuid, pinned: bool) -> Result<Option<View>, sqlx::Error>;

    async fn delete_view(&self, view_id: Uuid) -> Result<bool, sqlx::Error>;
}
