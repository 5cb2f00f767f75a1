// src/services/purchase_service.rs
//
// Purchase flow: a user picks a product, the transaction sits pending
// until an admin confirms the off-band payment, and confirmation credits
// the snapshotted points exactly once.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use liverybot_common::models::Transaction;
use liverybot_common::traits::repository_traits::{
    ProductRepository, TransactionRepository, UserRepository,
};
use crate::Error;

pub struct PurchaseService {
    user_repo: Arc<dyn UserRepository>,
    product_repo: Arc<dyn ProductRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
}

impl PurchaseService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        product_repo: Arc<dyn ProductRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            user_repo,
            product_repo,
            transaction_repo,
        }
    }

    pub async fn create_transaction(
        &self,
        telegram_id: i64,
        product_id: i64,
    ) -> Result<Transaction, Error> {
        let product = self
            .product_repo
            .get(product_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("product {}", product_id)))?;

        if !product.is_active {
            return Err(Error::ItemUnavailable(format!(
                "product '{}' is inactive",
                product.name
            )));
        }

        // The FK on transactions needs the user row; first contact may come
        // through this path.
        self.user_repo
            .get_or_create(telegram_id, None, None, None)
            .await?;

        let tx = self.transaction_repo.create(telegram_id, &product).await?;
        info!(
            "created transaction {} for user {} ({} points, Rp{})",
            tx.transaction_uuid, telegram_id, tx.points, tx.amount_idr
        );
        Ok(tx)
    }

    /// Idempotent from the caller's side: a retried confirm reports
    /// `AlreadyConfirmed` and never credits twice.
    pub async fn confirm_transaction(
        &self,
        transaction_uuid: Uuid,
        admin_id: i64,
    ) -> Result<Transaction, Error> {
        let tx = self.transaction_repo.confirm(transaction_uuid, admin_id).await?;
        info!(
            "transaction {} confirmed by admin {}: credited {} points to user {}",
            tx.transaction_uuid, admin_id, tx.points, tx.telegram_id
        );
        Ok(tx)
    }

    pub async fn cancel_transaction(&self, transaction_uuid: Uuid) -> Result<Transaction, Error> {
        let tx = self.transaction_repo.cancel(transaction_uuid).await?;
        info!("transaction {} cancelled", tx.transaction_uuid);
        Ok(tx)
    }

    pub async fn get_transaction(
        &self,
        transaction_uuid: Uuid,
    ) -> Result<Option<Transaction>, Error> {
        self.transaction_repo.get_by_uuid(transaction_uuid).await
    }

    pub async fn user_history(
        &self,
        telegram_id: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, Error> {
        self.transaction_repo.list_for_user(telegram_id, limit).await
    }

    pub async fn pending_transactions(&self) -> Result<Vec<Transaction>, Error> {
        self.transaction_repo.list_pending().await
    }
}
