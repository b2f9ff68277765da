use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    response::ApiResponse,
    status::{ActorRole, OrderStatus},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Insufficient stock for offer {offer_id}: requested {requested}, available {available}")]
    InsufficientStock {
        offer_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Offer {offer_id} belongs to the buyer")]
    SelfPurchase { offer_id: Uuid },

    #[error("Offer {offer_id} is already in the order")]
    DuplicateOfferInOrder { offer_id: Uuid },

    #[error("User already has an order in DRAFT status")]
    DraftAlreadyExists,

    #[error("Farm {farm_id} has no items in the order")]
    FarmNotInOrder { farm_id: Uuid },

    #[error("Status change {from} -> {to} is not allowed for {role}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        role: ActorRole,
    },

    #[error("Storage error")]
    Storage(#[from] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine readable name of the error, sent as `data.code`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Forbidden => "forbidden",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::SelfPurchase { .. } => "self_purchase",
            AppError::DuplicateOfferInOrder { .. } => "duplicate_offer",
            AppError::DraftAlreadyExists => "draft_exists",
            AppError::FarmNotInOrder { .. } => "farm_not_in_order",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Storage(_) => "storage",
            AppError::Internal(_) => "internal",
        }
    }

    /// Maps a unique violation on the single-draft index to
    /// [`AppError::DraftAlreadyExists`].
    pub fn from_draft_insert(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DraftAlreadyExists,
            _ => AppError::Storage(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InsufficientStock { .. }
            | AppError::SelfPurchase { .. }
            | AppError::DuplicateOfferInOrder { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DraftAlreadyExists
            | AppError::FarmNotInOrder { .. }
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &self {
            AppError::Storage(err) => tracing::error!(error = %err, "storage failure"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal failure"),
            rejection => tracing::debug!(reason = %rejection, "request rejected"),
        }

        let body = ApiResponse::failure(self.code(), self.to_string());

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
