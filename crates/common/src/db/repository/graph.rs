//! Follow edges and notifications

use super::{is_unique_violation, Member, Page, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use tracing::info;

/// Message sent to the target of a new follow
pub fn follow_message(follower: &str) -> String {
    format!("{} has started following you.", follower)
}

impl Repository {
    /// Follow `target` as `actor` and notify the target.
    ///
    /// Following yourself is allowed.
    pub async fn follow(&self, actor: &Member, target: &Member) -> Result<Follow> {
        let duplicate = || AppError::DuplicateFollow {
            username: target.username.clone(),
        };

        let now = chrono::Utc::now();
        let txn = self.write_conn().begin().await?;

        let edge = FollowActiveModel {
            follower_id: Set(actor.profile_id),
            followed_id: Set(target.profile_id),
            created_at: Set(now.into()),
        };

        let inserted = FollowEntity::insert(edge)
            .on_conflict(
                OnConflict::columns([FollowColumn::FollowerId, FollowColumn::FollowedId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(|e| if is_unique_violation(&e) { duplicate() } else { e.into() })?;

        if inserted == 0 {
            return Err(duplicate());
        }

        NotificationEntity::insert(NotificationActiveModel {
            recipient_id: Set(target.profile_id),
            sender_id: Set(Some(actor.profile_id)),
            message: Set(follow_message(&actor.username)),
            read: Set(false),
            created_at: Set(now.into()),
            ..Default::default()
        })
        .exec_without_returning(&txn)
        .await?;

        txn.commit().await?;

        info!(
            follower = %actor.username,
            followed = %target.username,
            "Follow created"
        );

        Ok(Follow {
            follower_id: actor.profile_id,
            followed_id: target.profile_id,
            created_at: now.into(),
        })
    }

    /// Remove the follow edge from `actor` to `target`
    pub async fn unfollow(&self, actor: &Member, target: &Member) -> Result<()> {
        let result = FollowEntity::delete_many()
            .filter(FollowColumn::FollowerId.eq(actor.profile_id))
            .filter(FollowColumn::FollowedId.eq(target.profile_id))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFollowing {
                username: target.username.clone(),
            });
        }

        info!(
            follower = %actor.username,
            followed = %target.username,
            "Follow removed"
        );
        Ok(())
    }

    pub async fn is_following(&self, follower_id: i32, followed_id: i32) -> Result<bool> {
        let count = FollowEntity::find()
            .filter(FollowColumn::FollowerId.eq(follower_id))
            .filter(FollowColumn::FollowedId.eq(followed_id))
            .count(self.read_conn())
            .await?;
        Ok(count > 0)
    }

    /// A profile's notifications, newest first
    pub async fn notifications_for(&self, recipient_id: i32, page: Option<Page>) -> Result<Vec<Notification>> {
        NotificationEntity::find()
            .filter(NotificationColumn::RecipientId.eq(recipient_id))
            .order_by_desc(NotificationColumn::CreatedAt)
            .order_by_desc(NotificationColumn::Id)
            .offset(page.map(|p| p.offset))
            .limit(page.map(|p| p.limit))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{member, repo};
    use super::*;

    #[tokio::test]
    async fn test_follow_notifies_target() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let bob = member(&repo, "bob").await;

        repo.follow(&alice, &bob).await.unwrap();
        assert!(repo.is_following(alice.profile_id, bob.profile_id).await.unwrap());
        assert!(!repo.is_following(bob.profile_id, alice.profile_id).await.unwrap());

        let inbox = repo.notifications_for(bob.profile_id, None).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].message, "alice has started following you.");
        assert_eq!(inbox[0].sender_id, Some(alice.profile_id));
        assert!(!inbox[0].read);
    }

    #[tokio::test]
    async fn test_double_follow_is_rejected() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let bob = member(&repo, "bob").await;

        repo.follow(&alice, &bob).await.unwrap();
        let err = repo.follow(&alice, &bob).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateFollow { ref username } if username == "bob"));

        let inbox = repo.notifications_for(bob.profile_id, None).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(repo.follow_counts(bob.profile_id).await.unwrap(), (1, 0));
    }

    #[tokio::test]
    async fn test_unfollow_without_follow() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;
        let bob = member(&repo, "bob").await;

        let err = repo.unfollow(&alice, &bob).await.unwrap_err();
        assert!(matches!(err, AppError::NotFollowing { .. }));

        repo.follow(&alice, &bob).await.unwrap();
        repo.unfollow(&alice, &bob).await.unwrap();
        assert!(!repo.is_following(alice.profile_id, bob.profile_id).await.unwrap());

        // Unfollowing sends nothing
        let inbox = repo.notifications_for(bob.profile_id, None).await.unwrap();
        assert_eq!(inbox.len(), 1);
    }

    #[tokio::test]
    async fn test_self_follow_allowed() {
        let repo = repo().await;
        let alice = member(&repo, "alice").await;

        repo.follow(&alice, &alice).await.unwrap();
        assert_eq!(repo.follow_counts(alice.profile_id).await.unwrap(), (1, 1));
    }
}
