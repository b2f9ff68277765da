//! The JSON envelope every endpoint answers with, errors included.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
    pub total_pages: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
            total_pages: Some(total_pages),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            total_pages: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

/// `data` of a rejected request. `code` is stable across releases, `error`
/// is the human readable text.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct ErrorBody {
    pub code: &'static str,
    pub error: String,
}

impl ApiResponse<ErrorBody> {
    pub fn failure(code: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            data: Some(ErrorBody {
                code,
                error: message.clone(),
            }),
            message,
            meta: Some(Meta::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(Meta::new(1, 20, 41).total_pages, Some(3));
        assert_eq!(Meta::new(1, 20, 40).total_pages, Some(2));
        assert_eq!(Meta::new(1, 20, 0).total_pages, Some(0));
        assert_eq!(Meta::empty().total_pages, None);
    }

    #[test]
    fn failure_carries_code_and_text() {
        let body = ApiResponse::failure("draft_exists", "User already has a draft");
        assert_eq!(body.message, "User already has a draft");
        assert_eq!(
            body.data,
            Some(ErrorBody {
                code: "draft_exists",
                error: "User already has a draft".into(),
            })
        );
        assert_eq!(body.meta, Some(Meta::empty()));
    }
}
