//! API handlers module

pub mod auth;
pub mod health;
pub mod stats;
pub mod timeline;
pub mod tweets;
pub mod users;

use flock_common::db::Page;
use serde::{Deserialize, Serialize};

/// `?offset=&limit=` on list endpoints. Without either, the full listing is returned.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> Option<Page> {
        if self.offset.is_none() && self.limit.is_none() {
            return None;
        }
        Some(Page::new(self.offset, self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_only_when_requested() {
        assert_eq!(PageParams::default().page(), None);

        let limited = PageParams { offset: None, limit: Some(10) };
        assert_eq!(limited.page(), Some(Page::new(None, Some(10))));

        let offset = PageParams { offset: Some(5), limit: None };
        assert_eq!(offset.page().map(|p| p.offset), Some(5));
    }
}

/// Plain acknowledgement body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
