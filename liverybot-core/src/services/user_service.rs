// src/services/user_service.rs

use std::sync::Arc;
use tracing::info;
use liverybot_common::models::User;
use liverybot_common::traits::repository_traits::{Ledger, UserRepository};
use crate::Error;

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    ledger: Arc<dyn Ledger>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, ledger: Arc<dyn Ledger>) -> Self {
        Self { user_repo, ledger }
    }

    /// First contact creates the row; later calls return it unchanged.
    pub async fn get_or_create_user(
        &self,
        telegram_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, Error> {
        self.user_repo
            .get_or_create(telegram_id, username, first_name, last_name)
            .await
    }

    pub async fn get_user(&self, telegram_id: i64) -> Result<Option<User>, Error> {
        self.user_repo.get(telegram_id).await
    }

    pub async fn balance(&self, telegram_id: i64) -> Result<i64, Error> {
        self.ledger.balance(telegram_id).await
    }

    /// Admin grant outside the purchase flow (`/addpoints`).
    pub async fn add_points(
        &self,
        telegram_id: i64,
        amount: i64,
        admin_id: i64,
    ) -> Result<(), Error> {
        self.ledger.credit(telegram_id, amount).await?;
        info!("admin {} credited {} points to user {}", admin_id, amount, telegram_id);
        Ok(())
    }

    /// Admin override of the whole balance (`/setpoints`).
    pub async fn set_points(
        &self,
        telegram_id: i64,
        amount: i64,
        admin_id: i64,
    ) -> Result<(), Error> {
        self.ledger.set_points(telegram_id, amount).await?;
        info!("admin {} set user {} balance to {}", admin_id, telegram_id, amount);
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.user_repo.list_all().await
    }
}
