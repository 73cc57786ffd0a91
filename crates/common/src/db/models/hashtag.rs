//! Hashtag entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hashtags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Lower-case tag without the leading '#'
    #[sea_orm(unique)]
    pub tag: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tweet_hashtag::Entity")]
    TweetHashtags,
}

impl Related<super::tweet_hashtag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TweetHashtags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
