//! HTTP handlers
//!
//! DTOs validate at the boundary; responses follow the standard
//! envelopes: `{success: true, ...}` for commands, the bare entity for
//! GETs, and `{data, meta}` for lists.

pub mod auth;
pub mod consent;
pub mod dsr;
pub mod health;
pub mod legal;
pub mod mfa;
pub mod sanction;
pub mod session;

use serde::Serialize;

/// Pagination envelope for list responses
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        Self {
            data,
            meta: ListMeta {
                total,
                page,
                limit,
                total_pages: total.div_ceil(limit),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_meta_total_pages() {
        let response = ListResponse::new(vec![1, 2, 3], 25, 1, 10);
        assert_eq!(response.meta.total_pages, 3);

        let response = ListResponse::new(Vec::<i32>::new(), 0, 1, 10);
        assert_eq!(response.meta.total_pages, 0);

        let response = ListResponse::new(vec![1], 10, 1, 10);
        assert_eq!(response.meta.total_pages, 1);
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let response = ListResponse::new(vec![1], 1, 1, 20);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["meta"].get("totalPages").is_some());
    }
}
