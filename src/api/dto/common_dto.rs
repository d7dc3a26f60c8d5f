//! Shared DTO types used across multiple endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::MonitorError;

/// Largest page the live feed serves.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination query parameters for feed listings.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    #[param(minimum = 1, example = 1)]
    pub page: u32,
    /// Items per page (1..=100). Defaults to 30.
    #[serde(default = "default_per_page")]
    #[param(minimum = 1, maximum = 100, example = 30)]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    30
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Checks that `page >= 1` and `1 <= per_page <= 100`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidParameter`] for out-of-range values.
    pub fn validated(self) -> Result<Self, MonitorError> {
        if self.page == 0 {
            return Err(MonitorError::InvalidParameter(
                "page must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_PER_PAGE).contains(&self.per_page) {
            return Err(MonitorError::InvalidParameter(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        Ok(self)
    }
}
