//! SeaORM entity models
//!
//! Database entities for Flock

mod account;
mod follow;
mod hashtag;
mod like;
mod notification;
mod profile;
mod retweet;
mod tweet;
mod tweet_hashtag;

pub use tweet::PREVIEW_CHARS;

pub use account::{
    Entity as AccountEntity,
    Model as Account,
    ActiveModel as AccountActiveModel,
    Column as AccountColumn,
};

pub use profile::{
    Entity as ProfileEntity,
    Model as Profile,
    ActiveModel as ProfileActiveModel,
    Column as ProfileColumn,
};

pub use tweet::{
    Entity as TweetEntity,
    Model as Tweet,
    ActiveModel as TweetActiveModel,
    Column as TweetColumn,
    Relation as TweetRelation,
};

pub use hashtag::{
    Entity as HashtagEntity,
    Model as Hashtag,
    ActiveModel as HashtagActiveModel,
    Column as HashtagColumn,
    Relation as HashtagRelation,
};

pub use tweet_hashtag::{
    Entity as TweetHashtagEntity,
    Model as TweetHashtag,
    ActiveModel as TweetHashtagActiveModel,
    Column as TweetHashtagColumn,
    Relation as TweetHashtagRelation,
};

pub use follow::{
    Entity as FollowEntity,
    Model as Follow,
    ActiveModel as FollowActiveModel,
    Column as FollowColumn,
};

pub use like::{
    Entity as LikeEntity,
    Model as Like,
    ActiveModel as LikeActiveModel,
    Column as LikeColumn,
};

pub use retweet::{
    Entity as RetweetEntity,
    Model as Retweet,
    ActiveModel as RetweetActiveModel,
    Column as RetweetColumn,
};

pub use notification::{
    Entity as NotificationEntity,
    Model as Notification,
    ActiveModel as NotificationActiveModel,
    Column as NotificationColumn,
};
