//! Order status and the role-gated transition table.
//!
//! | from      | to        | who      |
//! |-----------|-----------|----------|
//! | DRAFT     | SUBMITTED | receiver |
//! | SUBMITTED | APPROVED  | farmer   |
//! | SUBMITTED | DECLINED  | farmer   |
//! | SUBMITTED | COMPLETED | receiver |
//! | APPROVED  | DECLINED  | farmer   |
//! | APPROVED  | SHIPPING  | farmer   |
//! | SHIPPING  | COMPLETED | receiver |
//!
//! `COMPLETED` and `DECLINED` are terminal.

use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// A cart that has not been handed to any farm yet.
    #[default]
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "SUBMITTED")]
    Submitted,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "DECLINED")]
    Declined,
    #[sea_orm(string_value = "SHIPPING")]
    Shipping,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

/// Who is asking for a status change. Authorization of the caller is done
/// before the request reaches the order service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// The buyer of the order.
    Receiver,
    /// The owner of a farm whose items are in the order.
    Farmer,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Draft,
        OrderStatus::Submitted,
        OrderStatus::Approved,
        OrderStatus::Declined,
        OrderStatus::Shipping,
        OrderStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Submitted => "SUBMITTED",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Declined => "DECLINED",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Declined)
    }

    /// Returns true if `role` may move an order from `self` to `to`.
    pub fn can_transition(&self, to: OrderStatus, role: ActorRole) -> bool {
        use OrderStatus::*;

        match role {
            ActorRole::Receiver => matches!(
                (self, to),
                (Draft, Submitted) | (Submitted, Completed) | (Shipping, Completed)
            ),
            ActorRole::Farmer => matches!(
                (self, to),
                (Submitted, Approved)
                    | (Submitted, Declined)
                    | (Approved, Declined)
                    | (Approved, Shipping)
            ),
        }
    }

    /// Validates a transition and returns the new status.
    pub fn transition(self, to: OrderStatus, role: ActorRole) -> AppResult<OrderStatus> {
        if self.can_transition(to, role) {
            Ok(to)
        } else {
            Err(AppError::InvalidTransition {
                from: self,
                to,
                role,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("unknown order status `{s}`")))
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRole::Receiver => f.write_str("receiver"),
            ActorRole::Farmer => f.write_str("farmer"),
        }
    }
}
