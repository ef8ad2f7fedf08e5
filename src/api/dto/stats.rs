//! DTOs for statistics, listing and search responses.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::services::{UrlPage, UrlStats};

/// A URL record with its live visit count, as exposed over the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlStatsResponse {
    pub id: i64,
    pub long_url: String,
    pub short_code: String,
    pub created_at: DateTime<Utc>,
    pub visit_count: i64,
    pub last_visited_at: Option<DateTime<Utc>>,
}

impl From<UrlStats> for UrlStatsResponse {
    fn from(stats: UrlStats) -> Self {
        Self {
            id: stats.id,
            long_url: stats.long_url,
            short_code: stats.short_code,
            created_at: stats.created_at,
            visit_count: stats.visit_count,
            last_visited_at: stats.last_visited_at,
        }
    }
}

/// One page of listed or searched records.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub data: Vec<UrlStatsResponse>,
}

impl From<UrlPage> for ListResponse {
    fn from(page: UrlPage) -> Self {
        Self {
            total: page.total,
            page: page.page,
            limit: page.limit,
            data: page.items.into_iter().map(UrlStatsResponse::from).collect(),
        }
    }
}
