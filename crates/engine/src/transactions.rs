//! Transaction primitives.
//!
//! A `Transaction` is an income or expense recorded against one wallet and,
//! for expenses, one theme. Its effect on balances is described by
//! [`Effect`](crate::reconcile::Effect).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub theme_id: Option<Uuid>,
    pub description: String,
    pub amount: Money,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new transaction, before it gets an id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub wallet_id: Uuid,
    pub theme_id: Option<Uuid>,
    pub description: String,
    pub amount: Money,
    pub kind: TransactionKind,
}

/// The full post-edit state of a transaction.
///
/// Every field is replaced, so an edit can change the amount, the kind, the
/// theme and the wallet at once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEdits {
    pub wallet_id: Uuid,
    pub theme_id: Option<Uuid>,
    pub description: String,
    pub amount: Money,
    pub kind: TransactionKind,
}

impl TransactionEdits {
    /// Start an edit from the current state of `tx`.
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            wallet_id: tx.wallet_id,
            theme_id: tx.theme_id,
            description: tx.description.clone(),
            amount: tx.amount,
            kind: tx.kind,
        }
    }
}

impl NewTransaction {
    /// Validates required fields and builds the record to insert.
    ///
    /// Descriptions are trimmed. Amounts must be strictly positive, an expense
    /// needs a theme and an income must not carry one.
    pub fn into_transaction(self) -> ResultEngine<Transaction> {
        let description = crate::util::normalize_required_text(&self.description, "description")?;
        crate::util::validate_entry(self.amount, self.kind, self.theme_id)?;
        let now = Utc::now();
        Ok(Transaction {
            id: Uuid::new_v4(),
            wallet_id: self.wallet_id,
            theme_id: self.theme_id,
            description,
            amount: self.amount,
            kind: self.kind,
            created_at: now,
            updated_at: now,
        })
    }
}

impl TransactionEdits {
    /// Validates the edit and applies it on top of `old`.
    pub fn apply_to(self, old: &Transaction) -> ResultEngine<Transaction> {
        let description = crate::util::normalize_required_text(&self.description, "description")?;
        crate::util::validate_entry(self.amount, self.kind, self.theme_id)?;
        Ok(Transaction {
            id: old.id,
            wallet_id: self.wallet_id,
            theme_id: self.theme_id,
            description,
            amount: self.amount,
            kind: self.kind,
            created_at: old.created_at,
            updated_at: Utc::now(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_id: String,
    pub theme_id: Option<String>,
    pub description: String,
    pub amount: i64,
    pub kind: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Wallet,
    #[sea_orm(
        belongs_to = "super::themes::Entity",
        from = "Column::ThemeId",
        to = "super::themes::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Theme,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl Related<super::themes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Theme.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            wallet_id: ActiveValue::Set(tx.wallet_id.to_string()),
            theme_id: ActiveValue::Set(tx.theme_id.map(|id| id.to_string())),
            description: ActiveValue::Set(tx.description.clone()),
            amount: ActiveValue::Set(tx.amount.minor()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            theme_id: model
                .theme_id
                .as_deref()
                .map(|id| parse_uuid(id, "theme"))
                .transpose()?,
            description: model.description,
            amount: Money::new(model.amount),
            kind: TransactionKind::try_from(model.kind.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
