//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Venue (journal or conference) the paper appeared in
    #[sea_orm(column_type = "Text")]
    pub published_in: String,

    pub year: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper_author::Entity")]
    PaperAuthors,
}

impl Related<super::paper_author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperAuthors.def()
    }
}

/// Authors of a paper, through the association table
impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        super::paper_author::Relation::Author.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::paper_author::Relation::Paper.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
