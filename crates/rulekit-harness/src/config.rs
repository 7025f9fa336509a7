//! Harness settings read from the environment.
//!
//! | Variable                     | Default | Meaning                              |
//! |------------------------------|---------|--------------------------------------|
//! | `RULEKIT_LOG`                | `info`  | `tracing-subscriber` filter directive |
//! | `RULEKIT_HARNESS_TREE`       | unset   | Path to a JSON tree document          |
//! | `RULEKIT_HARNESS_ROW_HEIGHT` | `2`     | Rows per outline line (min 1)         |
//! | `RULEKIT_HARNESS_JSON`       | off     | `1`/`true` prints the final document  |

use std::path::PathBuf;

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_ROW_HEIGHT: u16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub log_filter: String,
    pub tree_path: Option<PathBuf>,
    pub row_height: u16,
    pub print_json: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            tree_path: None,
            row_height: DEFAULT_ROW_HEIGHT,
            print_json: false,
        }
    }
}

impl HarnessConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_filter =
            non_empty("RULEKIT_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let tree_path = non_empty("RULEKIT_HARNESS_TREE").map(PathBuf::from);
        let row_height = non_empty("RULEKIT_HARNESS_ROW_HEIGHT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_ROW_HEIGHT)
            .max(1);
        let print_json = lookup("RULEKIT_HARNESS_JSON")
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        Self {
            log_filter,
            tree_path,
            row_height,
            print_json,
        }
    }
}
