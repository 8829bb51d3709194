//! The module contains `Wallet` struct and its implementation.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// A wallet.
///
/// A wallet is a named account (cash, e-wallet, bank) holding a running
/// balance. It is owned by exactly one user and its balance moves only through
/// recorded transactions, or through an explicit balance edit by the owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(owner_id: String, name: String, balance: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            balance,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial edit of a wallet. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletUpdate {
    pub name: Option<String>,
    pub balance: Option<Money>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub balance: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::themes::Entity")]
    Themes,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::themes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Themes.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            balance: ActiveValue::Set(value.balance.minor()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "wallet")?,
            owner_id: model.owner_id,
            name: model.name,
            balance: Money::new(model.balance),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
