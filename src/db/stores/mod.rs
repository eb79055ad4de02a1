use async_trait::async_trait;

use super::DatabaseError;
use super::models::{Post, User};

/// Read-only view over a seeded demo database.
#[async_trait]
pub trait DemoStore: Send + Sync {
    async fn count_users(&self) -> Result<i64, DatabaseError>;
    async fn count_posts(&self) -> Result<i64, DatabaseError>;
    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, DatabaseError>;
    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, DatabaseError>;
}
