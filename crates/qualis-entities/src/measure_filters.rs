//! Measure filters entity
//!
//! A saved measure filter: a named query over project measures, optionally
//! owned by a user and optionally shared with everyone.

use async_trait::async_trait;
use qualis_core::DBDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "measure_filters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Display name, at most 100 characters
    pub name: String,

    /// Owner of the filter, if any
    pub user_id: Option<i32>,

    pub shared: Option<bool>,

    /// Free text, at most 4000 characters
    pub description: Option<String>,

    /// Serialized filter criteria
    #[sea_orm(column_type = "Text", nullable)]
    pub data: Option<String>,

    pub created_at: Option<DBDateTime>,
    pub updated_at: Option<DBDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Some(chrono::Utc::now());

        if insert {
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.updated_at.is_not_set() {
                self.updated_at = Set(now);
            }
        } else {
            self.updated_at = Set(now);
        }

        Ok(self)
    }
}
