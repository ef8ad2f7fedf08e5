//! Pagination and search query parameters.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

/// Pagination query parameters.
///
/// Uses `serde_with` to parse page numbers from query strings as integers.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageParams {
    /// Validates pagination parameters and applies defaults.
    ///
    /// # Defaults
    ///
    /// - `page`: 1
    /// - `limit`: 10
    ///
    /// # Validation
    ///
    /// - Page must be > 0
    /// - Limit must be between 1 and 100
    ///
    /// # Returns
    ///
    /// `(page, limit)` tuple.
    pub fn resolve(&self) -> Result<(u32, u32), String> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(10);

        if page == 0 {
            return Err("Page must be greater than 0".to_string());
        }

        if !(1..=100).contains(&limit) {
            return Err("Limit must be between 1 and 100".to_string());
        }

        Ok((page, limit))
    }
}

/// Query parameters for the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,

    #[serde(flatten)]
    pub pagination: PageParams,
}
