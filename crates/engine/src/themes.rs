//! Budget themes: spending categories with a cap, scoped to one wallet.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// A budget category.
///
/// `current_spent` is a running total maintained by reconciliation: it
/// should equal the sum of the amounts of the expense transactions currently
/// pointing at this theme, and it never goes below zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub name: String,
    pub max_budget: Money,
    pub current_spent: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Theme {
    pub fn new(wallet_id: Uuid, name: String, max_budget: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            name,
            max_budget,
            current_spent: Money::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Budget left before reaching the cap. Negative when over budget.
    pub fn remaining(&self) -> Money {
        self.max_budget - self.current_spent
    }

    pub fn is_over_budget(&self) -> bool {
        self.current_spent > self.max_budget
    }
}

/// Partial edit of a theme. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThemeUpdate {
    pub name: Option<String>,
    pub max_budget: Option<Money>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "themes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_id: String,
    pub name: String,
    pub max_budget: i64,
    pub current_spent: i64,
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
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Theme> for ActiveModel {
    fn from(value: &Theme) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            wallet_id: ActiveValue::Set(value.wallet_id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            max_budget: ActiveValue::Set(value.max_budget.minor()),
            current_spent: ActiveValue::Set(value.current_spent.minor()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Theme {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "theme")?,
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            name: model.name,
            max_budget: Money::new(model.max_budget),
            current_spent: Money::new(model.current_spent),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
