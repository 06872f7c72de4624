//! Cursor pagination
//!
//! A [`PageSource`] fetches one page of a resource; a [`Paginator`] walks
//! the pages lazily, only asking for the next one once every buffered item
//! has been handed out. Iteration ends on the first page without a `next`
//! cursor.
//!
//! Paginators are single-use. Every resource accessor builds a fresh one, so
//! two calls iterate independently.

use crate::client::error::Result;
use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Cursors returned alongside a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub next: Option<String>,
    pub prev: Option<String>,
}

impl PageCursor {
    pub fn new(next: Option<String>, prev: Option<String>) -> Self {
        Self { next, prev }
    }

    /// No page after this one
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub paging: PageCursor,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, paging: PageCursor) -> Self {
        Self { items, paging }
    }

    /// A single, final page
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, PageCursor::default())
    }
}

/// One paged resource
#[async_trait]
pub trait PageSource<T: Send>: Send + Sync {
    /// Fetch up to `limit` items after `next` (or before `prev`)
    async fn fetch(&self, limit: usize, next: Option<&str>, prev: Option<&str>) -> Result<Page<T>>;
}

/// Lazy item iterator over a [`PageSource`]
pub struct Paginator<T: Send> {
    source: Box<dyn PageSource<T>>,
    limit: usize,
    /// `None` until the first page is fetched
    cursor: Option<PageCursor>,
    buffer: VecDeque<T>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<T: Send + 'static> Paginator<T> {
    pub fn new(source: impl PageSource<T> + 'static, limit: usize) -> Self {
        Self::boxed(Box::new(source), limit)
    }

    pub fn boxed(source: Box<dyn PageSource<T>>, limit: usize) -> Self {
        Self {
            source,
            limit,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
            pages_fetched: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Cursors of the most recently fetched page
    pub fn cursor(&self) -> Option<&PageCursor> {
        self.cursor.as_ref()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Next item, fetching a page when the buffer runs dry
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            if self.exhausted {
                return Ok(None);
            }

            let next = match &self.cursor {
                None => None,
                Some(cursor) => match &cursor.next {
                    Some(next) => Some(next.clone()),
                    None => {
                        self.exhausted = true;
                        return Ok(None);
                    }
                },
            };

            self.fetch_page(next).await?;
        }
    }

    async fn fetch_page(&mut self, next: Option<String>) -> Result<()> {
        let page = self.source.fetch(self.limit, next.as_deref(), None).await?;
        self.pages_fetched += 1;

        debug!(
            page = self.pages_fetched,
            items = page.items.len(),
            has_next = !page.paging.is_terminal(),
            "Fetched page"
        );

        if page.paging.is_terminal() {
            self.exhausted = true;
        } else if page.items.is_empty() && page.paging.next == next {
            // the same cursor again would loop forever
            warn!(cursor = ?next, "Empty page repeated its own cursor, stopping");
            self.exhausted = true;
        }

        self.buffer.extend(page.items);
        self.cursor = Some(page.paging);
        Ok(())
    }

    /// At most `n` items
    pub async fn take_items(&mut self, n: usize) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(n.min(self.limit));
        while items.len() < n {
            match self.next().await? {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }

    /// Every remaining item
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        stream::try_unfold(self, |mut paginator| async move {
            Ok(paginator.next().await?.map(|item| (item, paginator)))
        })
    }
}
