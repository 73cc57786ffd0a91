//! Accounts, profiles and member lookup

use super::{is_unique_violation, Member, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::info;

impl Repository {
    /// Create an account and its profile in one transaction
    pub async fn create_account(
        &self,
        username: &str,
        password_hash: &str,
        bio: &str,
    ) -> Result<(Account, Profile)> {
        let now = chrono::Utc::now();
        let txn = self.write_conn().begin().await?;

        let exists = AccountEntity::find()
            .filter(AccountColumn::Username.eq(username))
            .one(&txn)
            .await?
            .is_some();
        if exists {
            return Err(AppError::DuplicateAccount {
                username: username.to_string(),
            });
        }

        let account = AccountActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            last_login: Set(None),
            date_joined: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateAccount {
                    username: username.to_string(),
                }
            } else {
                e.into()
            }
        })?;

        let profile = insert_profile(&txn, account.id, bio).await?;
        txn.commit().await?;

        info!(account_id = account.id, profile_id = profile.id, "Account created");
        Ok((account, profile))
    }

    /// Find account by username
    pub async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        AccountEntity::find()
            .filter(AccountColumn::Username.eq(username))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find account by ID
    pub async fn find_account_by_id(&self, id: i32) -> Result<Option<Account>> {
        AccountEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Stamp `last_login` with the current time
    pub async fn record_login(&self, account_id: i32) -> Result<Account> {
        let account = AccountEntity::find_by_id(account_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::not_found("account", account_id))?;

        let mut account: AccountActiveModel = account.into();
        account.last_login = Set(Some(chrono::Utc::now().into()));
        account.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Find the profile owned by an account
    pub async fn find_profile_by_account(&self, account_id: i32) -> Result<Option<Profile>> {
        ProfileEntity::find()
            .filter(ProfileColumn::AccountId.eq(account_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a profile and its account by username
    pub async fn find_member_profile(&self, username: &str) -> Result<Option<(Profile, Account)>> {
        let found = ProfileEntity::find()
            .find_also_related(AccountEntity)
            .filter(AccountColumn::Username.eq(username))
            .one(self.read_conn())
            .await?;

        Ok(found.and_then(|(profile, account)| account.map(|a| (profile, a))))
    }

    /// Resolve a username to a [`Member`]
    pub async fn find_member(&self, username: &str) -> Result<Option<Member>> {
        Ok(self
            .find_member_profile(username)
            .await?
            .map(|(profile, account)| Member {
                profile_id: profile.id,
                username: account.username,
            }))
    }

    /// Profile of an account, creating an empty one if missing
    pub async fn ensure_profile(&self, account_id: i32) -> Result<Profile> {
        if let Some(profile) = self.find_profile_by_account(account_id).await? {
            return Ok(profile);
        }

        insert_profile(self.write_conn(), account_id, "").await
    }

    /// Replace a profile's bio
    pub async fn update_bio(&self, profile_id: i32, bio: &str) -> Result<Profile> {
        let profile = ProfileEntity::find_by_id(profile_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::not_found("profile", profile_id))?;

        let mut profile: ProfileActiveModel = profile.into();
        profile.bio = Set(bio.to_string());
        profile.update(self.write_conn()).await.map_err(Into::into)
    }

    /// (followers, following) counts for a profile
    pub async fn follow_counts(&self, profile_id: i32) -> Result<(u64, u64)> {
        let followers = FollowEntity::find()
            .filter(FollowColumn::FollowedId.eq(profile_id))
            .count(self.read_conn())
            .await?;

        let following = FollowEntity::find()
            .filter(FollowColumn::FollowerId.eq(profile_id))
            .count(self.read_conn())
            .await?;

        Ok((followers, following))
    }
}

async fn insert_profile<C: ConnectionTrait>(db: &C, account_id: i32, bio: &str) -> Result<Profile> {
    ProfileActiveModel {
        account_id: Set(account_id),
        bio: Set(bio.to_string()),
        created_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use crate::errors::AppError;

    #[tokio::test]
    async fn test_create_account_creates_profile() {
        let repo = testing::repo().await;
        let (account, profile) = repo.create_account("alice", "hash", "Test bio").await.unwrap();

        assert_eq!(profile.account_id, account.id);
        assert_eq!(profile.bio, "Test bio");
        assert!(account.last_login.is_none());

        let member = repo.find_member("alice").await.unwrap().unwrap();
        assert_eq!(member.profile_id, profile.id);
        assert!(repo.find_member("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = testing::repo().await;
        repo.create_account("alice", "hash", "").await.unwrap();

        let err = repo.create_account("alice", "hash", "").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount { .. }));
    }

    #[tokio::test]
    async fn test_record_login_and_ensure_profile() {
        let repo = testing::repo().await;
        let (account, profile) = repo.create_account("alice", "hash", "").await.unwrap();

        let account = repo.record_login(account.id).await.unwrap();
        assert!(account.last_login.is_some());

        let same = repo.ensure_profile(account.id).await.unwrap();
        assert_eq!(same.id, profile.id);

        let updated = repo.update_bio(profile.id, "new bio").await.unwrap();
        assert_eq!(updated.bio, "new bio");
    }
}
