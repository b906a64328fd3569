//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ListMeta {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread: Option<i64>,
}

impl ListMeta {
    fn count(count: u64) -> Self {
        ListMeta {
            count,
            total: None,
            limit: None,
            offset: None,
            unread: None,
        }
    }
}

/// limit/offset query parameters shared by list endpoints.
#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// Clamp to [1, max]; missing limit becomes `default`, negative offset becomes 0.
    pub fn resolve(self, default: i64, max: i64) -> (i64, i64) {
        let limit = self.limit.unwrap_or(default).clamp(1, max);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::CREATED,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::OK,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: ListMeta::count(count),
        }),
    )
}

/// Paginated list: count of this page plus total matching rows.
pub fn success_page<T: Serialize>(
    data: Vec<T>,
    total: i64,
    limit: i64,
    offset: i64,
) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: ListMeta {
                total: Some(total),
                limit: Some(limit),
                offset: Some(offset),
                ..ListMeta::count(count)
            },
        }),
    )
}

pub fn success_many_with_unread<T: Serialize>(
    data: Vec<T>,
    unread: i64,
) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: ListMeta {
                unread: Some(unread),
                ..ListMeta::count(count)
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_clamp() {
        let p = PageParams { limit: Some(500), offset: Some(-3) };
        assert_eq!(p.resolve(24, 100), (100, 0));
        assert_eq!(PageParams::default().resolve(24, 100), (24, 0));
        let p = PageParams { limit: Some(0), offset: Some(10) };
        assert_eq!(p.resolve(24, 100), (1, 10));
    }
}
