//! Paged REST resources
//!
//! Each source captures the headers it was created with, so a paginator
//! keeps working with the credentials it started with.

use super::error::{ClientError, Result};
use super::rest::{pairs, RestTransport};
use crate::config::MAX_PAGE_SIZE;
use crate::domain::{Channel, Notification};
use crate::pagination::{Page, PageCursor, PageSource};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Cursors from an iFunny `paging` object
///
/// ```json
/// {"cursors": {"next": "abc", "prev": "xyz"}, "hasNext": true, "hasPrev": false}
/// ```
///
/// A cursor only counts when its `has*` flag is true (or missing).
pub fn ifunny_cursor(paging: &Value) -> PageCursor {
    let cursor = |key: &str, flag: &str| {
        let allowed = paging.get(flag).and_then(Value::as_bool).unwrap_or(true);
        paging
            .pointer(&format!("/cursors/{}", key))
            .and_then(Value::as_str)
            .filter(|value| allowed && !value.is_empty())
            .map(str::to_string)
    };

    PageCursor::new(cursor("next", "hasNext"), cursor("prev", "hasPrev"))
}

/// `GET {api}/news/my`
pub struct NotificationSource {
    rest: Arc<dyn RestTransport>,
    url: String,
    headers: Vec<(String, String)>,
}

impl NotificationSource {
    pub fn new(rest: Arc<dyn RestTransport>, api_base: &str, headers: Vec<(String, String)>) -> Self {
        Self {
            rest,
            url: format!("{}/news/my", api_base),
            headers,
        }
    }
}

#[async_trait]
impl PageSource<Notification> for NotificationSource {
    async fn fetch(
        &self,
        limit: usize,
        next: Option<&str>,
        prev: Option<&str>,
    ) -> Result<Page<Notification>> {
        let mut query = pairs([("limit", limit.min(MAX_PAGE_SIZE).to_string())]);
        if let Some(next) = next {
            query.push(("next".to_string(), next.to_string()));
        }
        if let Some(prev) = prev {
            query.push(("prev".to_string(), prev.to_string()));
        }

        let response = self
            .rest
            .get(&self.url, &self.headers, &query)
            .await?
            .require_success()?;

        let news = response.field("/data/news")?;
        let items = news
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::MissingField("/data/news/items".to_string()))?
            .iter()
            .cloned()
            .filter_map(Notification::from_payload)
            .collect::<Vec<_>>();

        let paging = news.get("paging").map(ifunny_cursor).unwrap_or_default();
        debug!(count = items.len(), has_next = paging.next.is_some(), "Fetched notifications");

        Ok(Page::new(items, paging))
    }
}

/// Filters for `my_group_channels`, passed through as query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFilters {
    pub show_empty: bool,
    pub show_read_receipt: bool,
    pub show_member: bool,
    pub public_mode: String,
    pub super_mode: String,
    pub distinct_mode: String,
    pub member_state_filter: String,
    pub order: String,
}

impl Default for ChannelFilters {
    fn default() -> Self {
        Self {
            show_empty: true,
            show_read_receipt: true,
            show_member: true,
            public_mode: "all".to_string(),
            super_mode: "all".to_string(),
            distinct_mode: "all".to_string(),
            member_state_filter: "all".to_string(),
            order: "latest_last_message".to_string(),
        }
    }
}

impl ChannelFilters {
    fn query(&self) -> Vec<(String, String)> {
        pairs([
            ("show_empty", self.show_empty.to_string()),
            ("show_read_receipt", self.show_read_receipt.to_string()),
            ("show_member", self.show_member.to_string()),
            ("public_mode", self.public_mode.clone()),
            ("super_mode", self.super_mode.clone()),
            ("distinct_mode", self.distinct_mode.clone()),
            ("member_state_filter", self.member_state_filter.clone()),
            ("order", self.order.clone()),
        ])
    }
}

/// `GET {sendbird}/users/{id}/my_group_channels`
///
/// Sendbird pages forward only, with the cursor in `token`.
pub struct ChannelSource {
    rest: Arc<dyn RestTransport>,
    url: String,
    headers: Vec<(String, String)>,
    filters: ChannelFilters,
}

impl ChannelSource {
    pub fn new(
        rest: Arc<dyn RestTransport>,
        sendbird_api_base: &str,
        user_id: &str,
        headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            rest,
            url: format!("{}/users/{}/my_group_channels", sendbird_api_base, user_id),
            headers,
            filters: ChannelFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: ChannelFilters) -> Self {
        self.filters = filters;
        self
    }
}

#[async_trait]
impl PageSource<Channel> for ChannelSource {
    async fn fetch(&self, limit: usize, next: Option<&str>, _prev: Option<&str>) -> Result<Page<Channel>> {
        let mut query = pairs([("limit", limit.min(MAX_PAGE_SIZE).to_string())]);
        if let Some(next) = next {
            query.push(("token".to_string(), next.to_string()));
        }
        query.extend(self.filters.query());

        let response = self
            .rest
            .get(&self.url, &self.headers, &query)
            .await?
            .require_success()?;

        let items = response
            .field("/channels")?
            .as_array()
            .ok_or_else(|| ClientError::MissingField("/channels".to_string()))?
            .iter()
            .cloned()
            .filter_map(Channel::from_payload)
            .collect::<Vec<_>>();

        // an empty token means the last page
        let next = response
            .body
            .get("next")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        debug!(count = items.len(), has_next = next.is_some(), "Fetched channels");
        Ok(Page::new(items, PageCursor::new(next, None)))
    }
}
