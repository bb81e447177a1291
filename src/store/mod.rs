//! Relational metadata store backed by sea-orm.
//!
//! Production runs against Postgres; SQLite URLs work too and back the test suite. Every query
//! checks out a pooled connection for its own duration, and writes go through a transaction the
//! caller commits explicitly.

#[allow(missing_docs)]
pub mod entity;

pub use entity::Model as FileMetadata;

use entity::{ActiveModel, Column, Entity};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder, Schema, Set, SqlErr,
    TransactionTrait,
};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another row already owns this storage path.
    #[error("A file is already stored at {0}")]
    DuplicatePath(String),
    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Column values for a new row; the identifier is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Original filename.
    pub name: String,
    /// Storage path, unique across rows.
    pub path: String,
    /// Lowercase extension without the leading dot.
    pub format: String,
    /// Stored size in bytes.
    pub size: i64,
    /// Generated summary.
    pub summary: String,
}

/// Handle to the `files` table.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    db: DatabaseConnection,
}

impl MetadataStore {
    /// Open a connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let mut options = ConnectOptions::new(url.to_owned());
        options
            .max_connections(max_connections.max(1))
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .sqlx_logging(true);

        let db = Database::connect(options).await?;
        tracing::info!(backend = ?db.get_database_backend(), "Connected to metadata store");
        Ok(Self { db })
    }

    /// Underlying connection, for callers composing their own queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the `files` table and its indexes when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(Entity);
        table.if_not_exists();
        self.db.execute(backend.build(&table)).await?;

        for mut index in schema.create_index_from_entity(Entity) {
            index.if_not_exists();
            self.db.execute(backend.build(&index)).await?;
        }
        tracing::debug!("Metadata schema ensured");
        Ok(())
    }

    /// Look up the row stored at `path`.
    pub async fn find_by_path(&self, path: &str) -> Result<Option<FileMetadata>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Path.eq(path))
            .one(&self.db)
            .await?)
    }

    /// Look up a row by identifier.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<FileMetadata>, StoreError> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    /// All rows in identifier order.
    pub async fn list(&self) -> Result<Vec<FileMetadata>, StoreError> {
        Ok(Entity::find()
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Start a transaction; dropping it without committing rolls back.
    pub async fn begin(&self) -> Result<DatabaseTransaction, StoreError> {
        Ok(self.db.begin().await?)
    }

    /// Insert a row through `conn` (the pool or an open transaction).
    ///
    /// A unique-constraint violation on `path` maps to [`StoreError::DuplicatePath`].
    pub async fn insert<C>(conn: &C, record: NewFileRecord) -> Result<FileMetadata, StoreError>
    where
        C: ConnectionTrait,
    {
        let path = record.path.clone();
        let row = ActiveModel {
            id: NotSet,
            name: Set(record.name),
            path: Set(record.path),
            format: Set(record.format),
            size: Set(record.size),
            summary: Set(Some(record.summary)),
        };

        row.insert(conn).await.map_err(|error| {
            if matches!(error.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                StoreError::DuplicatePath(path)
            } else {
                StoreError::Database(error)
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Fresh in-memory SQLite store. One pooled connection keeps every query on the same database.
    pub(crate) async fn memory_store() -> MetadataStore {
        let store = MetadataStore::connect("sqlite::memory:", 1)
            .await
            .expect("sqlite connection");
        store.ensure_schema().await.expect("schema");
        store
    }

    pub(crate) fn record(name: &str, path: &str) -> NewFileRecord {
        NewFileRecord {
            name: name.into(),
            path: path.into(),
            format: "txt".into(),
            size: 10,
            summary: format!("Summary of {name}"),
        }
    }
}
