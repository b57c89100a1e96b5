//! Declarative request blocking, installed on a page before navigation

use chromiumoxide_cdp::cdp::browser_protocol::network::ResourceType;
use serde::{Deserialize, Serialize};

/// Resource types the monitor can skip without affecting structured data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedResource {
    Image,
    Stylesheet,
    Font,
    Media,
}

impl BlockedResource {
    pub fn resource_type(self) -> ResourceType {
        match self {
            BlockedResource::Image => ResourceType::Image,
            BlockedResource::Stylesheet => ResourceType::Stylesheet,
            BlockedResource::Font => ResourceType::Font,
            BlockedResource::Media => ResourceType::Media,
        }
    }
}

/// Requests to drop while loading the target
///
/// Purely a load-time optimization; an empty filter is always correct.
/// Stylesheets are best left alone when screenshots matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    #[serde(default)]
    pub blocked_resource_types: Vec<BlockedResource>,
    /// URL patterns with `*` wildcards, e.g. `*googletagmanager.com*`
    #[serde(default)]
    pub blocked_url_patterns: Vec<String>,
}

impl RequestFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocked_resource_types.is_empty() && self.blocked_url_patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_yaml() {
        let filter: RequestFilter = serde_yaml::from_str(
            "blocked_resource_types: [image, font]\nblocked_url_patterns: ['*doubleclick.net*']\n",
        )
        .unwrap();
        assert_eq!(
            filter.blocked_resource_types,
            vec![BlockedResource::Image, BlockedResource::Font]
        );
        assert!(!filter.is_empty());
        assert!(RequestFilter::default().is_empty());
    }
}
