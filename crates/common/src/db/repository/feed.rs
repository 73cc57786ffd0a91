use super::{Page, Repository};
use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

impl Repository {
    /// Live tweets by the profiles `viewer_id` follows, newest first.
    ///
    /// The viewer's own tweets appear only if they follow themselves.
    /// `None` returns every qualifying tweet.
    pub async fn build_feed(&self, viewer_id: i32, page: Option<Page>) -> Result<Vec<Tweet>> {
        let followed = Query::select()
            .column(FollowColumn::FollowedId)
            .from(FollowEntity)
            .and_where(FollowColumn::FollowerId.eq(viewer_id))
            .to_owned();

        TweetEntity::find()
            .filter(TweetColumn::AuthorId.in_subquery(followed))
            .filter(TweetColumn::IsDeleted.eq(false))
            .order_by_desc(TweetColumn::CreatedAt)
            .order_by_desc(TweetColumn::Id)
            .offset(page.map(|p| p.offset))
            .limit(page.map(|p| p.limit))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{member, post, repo};
    use super::*;

    #[tokio::test]
    async fn test_feed_shows_followed_authors_only() {
        let repo = repo().await;
        let viewer = member(&repo, "viewer").await;
        let followed = member(&repo, "followed").await;
        let stranger = member(&repo, "stranger").await;

        repo.follow(&viewer, &followed).await.unwrap();

        let first = post(&repo, &followed, "first").await;
        let second = post(&repo, &followed, "second").await;
        let hidden = post(&repo, &followed, "hidden").await;
        post(&repo, &stranger, "not followed").await;
        post(&repo, &viewer, "my own").await;
        repo.soft_delete_tweet(hidden.id, None).await.unwrap();

        let feed = repo.build_feed(viewer.profile_id, None).await.unwrap();
        let ids: Vec<i32> = feed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_feed_after_unfollow_is_empty() {
        let repo = repo().await;
        let viewer = member(&repo, "viewer").await;
        let author = member(&repo, "author").await;

        repo.follow(&viewer, &author).await.unwrap();
        post(&repo, &author, "hello").await;
        repo.unfollow(&viewer, &author).await.unwrap();

        let feed = repo.build_feed(viewer.profile_id, None).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_self_follow_includes_own_tweets() {
        let repo = repo().await;
        let viewer = member(&repo, "viewer").await;
        let mine = post(&repo, &viewer, "mine").await;

        repo.follow(&viewer, &viewer).await.unwrap();

        let feed = repo.build_feed(viewer.profile_id, None).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, mine.id);
    }

    #[tokio::test]
    async fn test_feed_without_page_returns_everything() {
        let repo = repo().await;
        let viewer = member(&repo, "viewer").await;
        let author = member(&repo, "author").await;
        repo.follow(&viewer, &author).await.unwrap();

        for n in 0..230 {
            post(&repo, &author, &format!("tweet {}", n)).await;
        }

        let all = repo.build_feed(viewer.profile_id, None).await.unwrap();
        assert_eq!(all.len(), 230);

        let first_page = repo
            .build_feed(viewer.profile_id, Some(Page::default()))
            .await
            .unwrap();
        assert_eq!(first_page.len(), 50);
        assert_eq!(first_page[0].id, all[0].id);
    }
}
