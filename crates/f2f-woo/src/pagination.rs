//! Page-number pagination for the WooCommerce REST API.
//!
//! Collection endpoints take `per_page` and `page` query parameters and
//! report the page count in the `X-WP-TotalPages` response header. Some
//! custom endpoints omit the header, so a short page also ends the walk.

/// Name of the response header carrying the total page count.
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Parses an `X-WP-TotalPages` header value.
#[must_use]
pub fn parse_total_pages(header: Option<&str>) -> Option<u32> {
    header?.trim().parse::<u32>().ok()
}

/// Returns the next page number to request, or `None` when `page` was the last.
#[must_use]
pub fn next_page(page: u32, received: usize, per_page: u32, total_pages: Option<u32>) -> Option<u32> {
    if received == 0 || received < per_page as usize {
        return None;
    }
    if let Some(total) = total_pages {
        if page >= total {
            return None;
        }
    }
    Some(page + 1)
}
