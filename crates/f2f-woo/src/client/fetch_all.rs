//! Multi-page collection fetches for `WooClient`.

use serde::de::DeserializeOwned;

use crate::error::WooError;
use crate::pagination::next_page;
use crate::types::{WooCategory, WooOrder, WooProducer, WooProduct};

use super::WooClient;
use super::MAX_PAGES;

impl WooClient {
    /// Fetches every item of a collection endpoint, page by page.
    ///
    /// Stops on a short page or when `X-WP-TotalPages` is reached. Any page
    /// failure discards what was fetched so far: a partial list would make
    /// the import treat missing items as absent.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::fetch_page`]; returns
    /// [`WooError::PaginationLimit`] beyond [`MAX_PAGES`] pages.
    pub async fn fetch_all<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>, WooError> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            if page > MAX_PAGES {
                return Err(WooError::PaginationLimit {
                    endpoint: endpoint.to_owned(),
                    max_pages: MAX_PAGES,
                });
            }

            let (items, total_pages) = self.fetch_page::<T>(endpoint, page).await?;
            let received = items.len();
            all.extend(items);
            tracing::debug!(endpoint, page, received, total = all.len(), "fetched WooCommerce page");

            match next_page(page, received, self.per_page, total_pages) {
                Some(next) => page = next,
                None => break,
            }
        }

        tracing::info!(endpoint, count = all.len(), "fetched WooCommerce collection");
        Ok(all)
    }

    /// # Errors
    ///
    /// See [`Self::fetch_all`].
    pub async fn fetch_categories(&self) -> Result<Vec<WooCategory>, WooError> {
        self.fetch_all("products/categories").await
    }

    /// # Errors
    ///
    /// See [`Self::fetch_all`].
    pub async fn fetch_producers(&self) -> Result<Vec<WooProducer>, WooError> {
        self.fetch_all("producers").await
    }

    /// # Errors
    ///
    /// See [`Self::fetch_all`].
    pub async fn fetch_products(&self) -> Result<Vec<WooProduct>, WooError> {
        self.fetch_all("products").await
    }

    /// # Errors
    ///
    /// See [`Self::fetch_all`].
    pub async fn fetch_orders(&self) -> Result<Vec<WooOrder>, WooError> {
        self.fetch_all("orders").await
    }
}
