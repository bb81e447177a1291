use sea_orm::entity::prelude::*;
use serde::Serialize;

/// One row per successfully ingested file.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Original filename supplied by the client; not unique.
    #[sea_orm(indexed)]
    pub name: String,

    /// Storage location on disk; the de-duplication key.
    #[sea_orm(unique)]
    pub path: String,

    /// Lowercase extension without the leading dot.
    pub format: String,

    /// Stored size in bytes.
    pub size: i64,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
