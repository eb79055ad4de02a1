use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::db::schema_sqlite::{posts, users};

use super::{
    DatabaseError,
    models::{Post, User},
};

// SQLite uses i32 for INTEGER (primary keys), but we want to keep i64 in our API
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
struct DbUser {
    id: i32,
    name: String,
    password: String,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        Self {
            id: row.id as i64,
            name: row.name,
            password: row.password,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
struct DbPost {
    id: i32,
    title: String,
    body: String,
}

impl From<DbPost> for Post {
    fn from(row: DbPost) -> Self {
        Self {
            id: row.id as i64,
            title: row.title,
            body: row.body,
        }
    }
}

pub(crate) fn establish_connection(path: &Path) -> Result<SqliteConnection, DatabaseError> {
    SqliteConnection::establish(&path.to_string_lossy())
        .map_err(|e| DatabaseError::Connection(e.to_string()))
}

/// Opening a missing file would silently create an empty database.
fn open_existing(path: &Path) -> Result<SqliteConnection, DatabaseError> {
    if !path.exists() {
        return Err(DatabaseError::NotFound(path.display().to_string()));
    }
    establish_connection(path)
}

#[derive(Debug, QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = diesel::sql_types::Text)]
    journal_mode: String,
}

async fn pragma_journal_mode(path: &Path, statement: String) -> Result<String, DatabaseError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut conn = open_existing(&path)?;
        diesel::sql_query(statement)
            .get_result::<JournalMode>(&mut conn)
            .map(|row| row.journal_mode.to_lowercase())
            .map_err(|e| DatabaseError::Query(e.to_string()))
    })
    .await
    .map_err(|e| DatabaseError::Task(e.to_string()))?
}

/// Current journal mode of an existing database, lowercased.
pub async fn journal_mode(path: &Path) -> Result<String, DatabaseError> {
    pragma_journal_mode(path, "PRAGMA journal_mode".to_string()).await
}

/// Switches journal mode and returns the mode SQLite actually applied.
pub async fn set_journal_mode(path: &Path, mode: &str) -> Result<String, DatabaseError> {
    pragma_journal_mode(path, format!("PRAGMA journal_mode={mode}")).await
}

pub struct SqliteDemoStore {
    db_path: Arc<PathBuf>,
}

impl SqliteDemoStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    pub async fn journal_mode(&self) -> Result<String, DatabaseError> {
        journal_mode(&self.db_path).await
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> QueryResult<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = open_existing(&db_path)?;
            f(&mut conn).map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Task(e.to_string()))?
    }
}

#[async_trait]
impl super::DemoStore for SqliteDemoStore {
    async fn count_users(&self) -> Result<i64, DatabaseError> {
        self.with_connection(|conn| users::table.count().get_result::<i64>(conn))
            .await
    }

    async fn count_posts(&self) -> Result<i64, DatabaseError> {
        self.with_connection(|conn| posts::table.count().get_result::<i64>(conn))
            .await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, DatabaseError> {
        let rows = self
            .with_connection(move |conn| {
                users::table
                    .select(DbUser::as_select())
                    .order(users::id.asc())
                    .limit(limit)
                    .offset(offset)
                    .load::<DbUser>(conn)
            })
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, DatabaseError> {
        let rows = self
            .with_connection(move |conn| {
                posts::table
                    .select(DbPost::as_select())
                    .order(posts::id.asc())
                    .limit(limit)
                    .offset(offset)
                    .load::<DbPost>(conn)
            })
            .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use diesel::connection::SimpleConnection;

    use super::*;
    use crate::db::DemoStore;

    const SEED_SQL: &str = include_str!("../../sql/seed.sql");

    fn seeded_database(dir: &Path) -> PathBuf {
        let path = dir.join("demo.db");
        let mut conn = establish_connection(&path).expect("open sqlite");
        conn.batch_execute(SEED_SQL).expect("apply seed");
        path
    }

    #[tokio::test]
    async fn counts_match_seed_script() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SqliteDemoStore::new(seeded_database(dir.path()));

        assert_eq!(store.count_users().await.expect("count users"), 3);
        assert_eq!(store.count_posts().await.expect("count posts"), 5);
    }

    #[tokio::test]
    async fn list_users_is_ordered_and_paged() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SqliteDemoStore::new(seeded_database(dir.path()));

        let all = store.list_users(10, 0).await.expect("list users");
        let names: Vec<_> = all.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
        assert_eq!(all[0].id, 1);

        let page = store.list_users(1, 1).await.expect("list page");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "bob");
        assert_eq!(page[0].password, "hunter2");
    }

    #[tokio::test]
    async fn list_posts_returns_seeded_titles() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SqliteDemoStore::new(seeded_database(dir.path()));

        let posts = store.list_posts(100, 0).await.expect("list posts");
        assert_eq!(posts.len(), 5);
        assert_eq!(posts[0].title, "Hello, world");
        assert_eq!(posts[4].title, "Goodbye");
    }

    #[tokio::test]
    async fn missing_database_is_not_created() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.db");
        let store = SqliteDemoStore::new(&path);

        let result = store.count_users().await;

        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn set_journal_mode_reports_applied_mode() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = seeded_database(dir.path());
        let store = SqliteDemoStore::new(&path);

        assert_eq!(store.journal_mode().await.expect("read mode"), "delete");
        assert_eq!(set_journal_mode(&path, "WAL").await.expect("set mode"), "wal");
        assert_eq!(store.journal_mode().await.expect("read mode"), "wal");
    }

    #[tokio::test]
    async fn journal_mode_requires_existing_database() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.db");

        let result = set_journal_mode(&path, "WAL").await;

        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
        assert!(!path.exists());
    }

    #[test]
    fn user_names_are_unique() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = seeded_database(dir.path());
        let mut conn = establish_connection(&path).expect("open sqlite");

        let result =
            conn.batch_execute("INSERT INTO users (name, password) VALUES ('alice', 'again');");

        assert!(result.is_err());
    }
}
