//! Application configuration constants
//!
//! Central location for the limits, defaults and timing budgets used
//! by the derived views and the API client.

use std::time::Duration;

// ===== API =====

/// Backend used when neither settings nor environment name one
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Environment variable overriding the configured API URL
pub const API_URL_ENV: &str = "PROCLIMA_API_URL";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "PROCLIMA_DATA_DIR";

/// Directory name under `$HOME` when no data directory is given
pub const DEFAULT_DATA_DIR_NAME: &str = ".proclima-desk";

/// Wall-clock budget for a view's batch of joint fetches.
/// Expiry aborts every in-flight request of the batch.
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 12;

// ===== Search =====

/// Queries shorter than this (after normalization) match nothing
pub const MIN_QUERY_LEN: usize = 2;

/// Per-group cap in the header suggestions widget
pub const SUGGESTION_LIMIT: usize = 6;

/// Routes tried in order when discovering the projects collection
pub const PROJECT_COLLECTION_PATHS: &[&str] = &["/projects", "/lucrari", "/works", "/jobs"];

// ===== Listing =====

/// Selectable page sizes for list views
pub const PAGE_SIZE_OPTIONS: &[usize] = &[20, 50, 100, 200];

/// Page size a list view starts with
pub const DEFAULT_PAGE_SIZE: usize = 50;

// ===== Autocomplete =====

/// Debounce for material / worker search-as-you-type
pub const AUTOCOMPLETE_DEBOUNCE: Duration = Duration::from_millis(200);

/// Maximum material suggestions shown in pickers
pub const MATERIAL_SUGGESTION_LIMIT: usize = 12;

/// Maximum worker suggestions shown in the assignment picker
pub const WORKER_SUGGESTION_LIMIT: usize = 20;

// ===== Stock =====

/// Location preselected on the stock page and used for imports
pub const DEFAULT_LOCATION_CODE: &str = "ZOR";

/// Known location codes and their display names
pub const KNOWN_LOCATIONS: &[(&str, &str)] = &[("ZOR", "Zorilor"), ("IRS", "Iris")];

/// Note attached to an adjust that empties a stock row
pub const REMOVE_STOCK_NOTE: &str = "remove (set 0)";

// ===== Validation =====

/// Shortest plausible personal numeric code (CNP) for individuals
pub const MIN_CNP_LEN: usize = 8;

/// Shortest plausible company code (CUI)
pub const MIN_CUI_LEN: usize = 4;

/// Display name for a location code, falling back to the code itself
pub fn location_display_name(code: &str) -> &str {
    KNOWN_LOCATIONS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or(code)
}
