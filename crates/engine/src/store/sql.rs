//! sea-orm backed store.
//!
//! Increments are single `UPDATE` statements computed by the database, so
//! concurrent reconciliations on the same row serialize inside sqlite instead
//! of racing on a fetch-then-write.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Theme, ThemeUpdate, Transaction, TransactionKind, Wallet,
    WalletUpdate, themes, transactions, wallets,
};

use super::{CatalogStore, LedgerStore, TransactionFilter};

#[derive(Clone, Debug)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn wallet_not_found() -> EngineError {
    EngineError::KeyNotFound("wallet not exists".to_string())
}

fn theme_not_found() -> EngineError {
    EngineError::KeyNotFound("theme not exists".to_string())
}

fn transaction_not_found() -> EngineError {
    EngineError::KeyNotFound("transaction not exists".to_string())
}

async fn wallet_model<C: ConnectionTrait>(db: &C, wallet_id: Uuid) -> ResultEngine<wallets::Model> {
    wallets::Entity::find_by_id(wallet_id.to_string())
        .one(db)
        .await?
        .ok_or_else(wallet_not_found)
}

async fn theme_model<C: ConnectionTrait>(db: &C, theme_id: Uuid) -> ResultEngine<themes::Model> {
    themes::Entity::find_by_id(theme_id.to_string())
        .one(db)
        .await?
        .ok_or_else(theme_not_found)
}

#[async_trait]
impl LedgerStore for SqlStore {
    async fn insert_transaction(&self, tx: &Transaction) -> ResultEngine<Transaction> {
        let model = transactions::ActiveModel::from(tx).insert(&self.db).await?;
        Transaction::try_from(model)
    }

    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<Transaction> {
        let mut active = transactions::ActiveModel::from(tx);
        active.created_at = ActiveValue::NotSet;
        match active.update(&self.db).await {
            Ok(model) => Transaction::try_from(model),
            Err(DbErr::RecordNotUpdated) => Err(transaction_not_found()),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()> {
        let res = transactions::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(transaction_not_found());
        }
        Ok(())
    }

    async fn transaction(&self, id: Uuid) -> ResultEngine<Option<Transaction>> {
        transactions::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    async fn wallet_balance(&self, wallet_id: Uuid) -> ResultEngine<Money> {
        let model = wallet_model(&self.db, wallet_id).await?;
        Ok(Money::new(model.balance))
    }

    async fn set_wallet_balance(&self, wallet_id: Uuid, balance: Money) -> ResultEngine<()> {
        let res = wallets::Entity::update_many()
            .col_expr(wallets::Column::Balance, Expr::value(balance.minor()))
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::Id.eq(wallet_id.to_string()))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(wallet_not_found());
        }
        Ok(())
    }

    async fn increment_wallet_balance(
        &self,
        wallet_id: Uuid,
        delta: Money,
    ) -> ResultEngine<Money> {
        let db_tx = self.db.begin().await?;
        let res = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(delta.minor()),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::Id.eq(wallet_id.to_string()))
            .exec(&db_tx)
            .await?;
        if res.rows_affected == 0 {
            return Err(wallet_not_found());
        }
        let model = wallet_model(&db_tx, wallet_id).await?;
        db_tx.commit().await?;
        Ok(Money::new(model.balance))
    }

    async fn theme(&self, theme_id: Uuid) -> ResultEngine<Option<Theme>> {
        themes::Entity::find_by_id(theme_id.to_string())
            .one(&self.db)
            .await?
            .map(Theme::try_from)
            .transpose()
    }

    async fn theme_spent(&self, theme_id: Uuid) -> ResultEngine<Money> {
        let model = theme_model(&self.db, theme_id).await?;
        Ok(Money::new(model.current_spent))
    }

    async fn set_theme_spent(&self, theme_id: Uuid, spent: Money) -> ResultEngine<()> {
        let res = themes::Entity::update_many()
            .col_expr(
                themes::Column::CurrentSpent,
                Expr::value(spent.clamp_non_negative().minor()),
            )
            .col_expr(themes::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(themes::Column::Id.eq(theme_id.to_string()))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(theme_not_found());
        }
        Ok(())
    }

    async fn increment_theme_spent(&self, theme_id: Uuid, delta: Money) -> ResultEngine<Money> {
        let db_tx = self.db.begin().await?;
        let res = themes::Entity::update_many()
            .col_expr(
                themes::Column::CurrentSpent,
                Expr::cust_with_values("MAX(current_spent + ?, 0)", [delta.minor()]),
            )
            .col_expr(themes::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(themes::Column::Id.eq(theme_id.to_string()))
            .exec(&db_tx)
            .await?;
        if res.rows_affected == 0 {
            return Err(theme_not_found());
        }
        let model = theme_model(&db_tx, theme_id).await?;
        db_tx.commit().await?;
        Ok(Money::new(model.current_spent))
    }
}

#[async_trait]
impl CatalogStore for SqlStore {
    async fn insert_wallet(&self, wallet: &Wallet) -> ResultEngine<Wallet> {
        let model = wallets::ActiveModel::from(wallet).insert(&self.db).await?;
        Wallet::try_from(model)
    }

    async fn wallet(&self, wallet_id: Uuid) -> ResultEngine<Option<Wallet>> {
        wallets::Entity::find_by_id(wallet_id.to_string())
            .one(&self.db)
            .await?
            .map(Wallet::try_from)
            .transpose()
    }

    async fn wallets_for_owner(&self, owner_id: &str) -> ResultEngine<Vec<Wallet>> {
        wallets::Entity::find()
            .filter(wallets::Column::OwnerId.eq(owner_id))
            .order_by_desc(wallets::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Wallet::try_from)
            .collect()
    }

    async fn update_wallet(&self, wallet_id: Uuid, update: &WalletUpdate) -> ResultEngine<Wallet> {
        let mut active: wallets::ActiveModel = wallet_model(&self.db, wallet_id).await?.into();
        if let Some(name) = &update.name {
            active.name = ActiveValue::Set(name.clone());
        }
        if let Some(balance) = update.balance {
            active.balance = ActiveValue::Set(balance.minor());
        }
        active.updated_at = ActiveValue::Set(Utc::now());
        let model = active.update(&self.db).await?;
        Wallet::try_from(model)
    }

    async fn delete_wallet(&self, wallet_id: Uuid) -> ResultEngine<()> {
        let id = wallet_id.to_string();
        let db_tx = self.db.begin().await?;
        transactions::Entity::delete_many()
            .filter(transactions::Column::WalletId.eq(id.clone()))
            .exec(&db_tx)
            .await?;
        themes::Entity::delete_many()
            .filter(themes::Column::WalletId.eq(id.clone()))
            .exec(&db_tx)
            .await?;
        let res = wallets::Entity::delete_by_id(id).exec(&db_tx).await?;
        if res.rows_affected == 0 {
            return Err(wallet_not_found());
        }
        db_tx.commit().await?;
        Ok(())
    }

    async fn insert_theme(&self, theme: &Theme) -> ResultEngine<Theme> {
        let model = themes::ActiveModel::from(theme).insert(&self.db).await?;
        Theme::try_from(model)
    }

    async fn themes_for_wallet(&self, wallet_id: Uuid) -> ResultEngine<Vec<Theme>> {
        themes::Entity::find()
            .filter(themes::Column::WalletId.eq(wallet_id.to_string()))
            .order_by_desc(themes::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Theme::try_from)
            .collect()
    }

    async fn update_theme(&self, theme_id: Uuid, update: &ThemeUpdate) -> ResultEngine<Theme> {
        let mut active: themes::ActiveModel = theme_model(&self.db, theme_id).await?.into();
        if let Some(name) = &update.name {
            active.name = ActiveValue::Set(name.clone());
        }
        if let Some(max_budget) = update.max_budget {
            active.max_budget = ActiveValue::Set(max_budget.minor());
        }
        active.updated_at = ActiveValue::Set(Utc::now());
        let model = active.update(&self.db).await?;
        Theme::try_from(model)
    }

    async fn delete_theme(&self, theme_id: Uuid) -> ResultEngine<()> {
        let id = theme_id.to_string();
        let db_tx = self.db.begin().await?;
        transactions::Entity::update_many()
            .col_expr(
                transactions::Column::ThemeId,
                Expr::value(Option::<String>::None),
            )
            .filter(transactions::Column::ThemeId.eq(id.clone()))
            .exec(&db_tx)
            .await?;
        let res = themes::Entity::delete_by_id(id).exec(&db_tx).await?;
        if res.rows_affected == 0 {
            return Err(theme_not_found());
        }
        db_tx.commit().await?;
        Ok(())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        if filter.wallet_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = transactions::Entity::find().filter(
            transactions::Column::WalletId
                .is_in(filter.wallet_ids.iter().map(ToString::to_string)),
        );
        if let Some(theme_id) = filter.theme_id {
            query = query.filter(transactions::Column::ThemeId.eq(theme_id.to_string()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::CreatedAt.lte(to));
        }

        query
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn sum_expenses_for_theme(&self, theme_id: Uuid) -> ResultEngine<Money> {
        let total: Option<Option<i64>> = transactions::Entity::find()
            .select_only()
            .column_as(transactions::Column::Amount.sum(), "total")
            .filter(transactions::Column::ThemeId.eq(theme_id.to_string()))
            .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
            .into_tuple()
            .one(&self.db)
            .await?;
        Ok(Money::new(total.flatten().unwrap_or(0)))
    }
}
