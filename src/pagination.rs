//! Page-number pagination shared by every list endpoint. Responses are
//! wrapped in a `{count, next, previous, results}` envelope with absolute
//! page links.

use actix_web::HttpRequest;
use serde::Serialize;

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl Pagination {
    /// Reads `page` / `page_size` out of the raw query values. A `page`
    /// that is not a positive integer answers 404, like a page past the
    /// end would. A bad `page_size` silently falls back to the default.
    pub fn from_parts(page: Option<&str>, page_size: Option<&str>) -> Result<Self, ApiError> {
        let page = match page {
            None => 1,
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(invalid_page()),
            },
        };
        let page_size = page_size
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Ok(Self { page, page_size })
    }

    /// Rejects pages past the end. Page 1 always exists, even empty.
    pub fn check_page(&self, count: u64) -> Result<(), ApiError> {
        if self.page > 1 && self.page > self.num_pages(count) {
            return Err(invalid_page());
        }
        Ok(())
    }

    pub fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.page_size)
    }

    pub fn envelope<T>(&self, req: &HttpRequest, count: u64, results: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages(count);
        let next = (self.page < num_pages).then(|| page_url(req, self.page + 1));
        let previous = (self.page > 1).then(|| page_url(req, self.page - 1));
        Page {
            count,
            next,
            previous,
            results,
        }
    }
}

fn invalid_page() -> ApiError {
    ApiError::NotFound("Invalid page.".to_string())
}

/// Absolute link to another page of the same listing. Every query
/// parameter except `page` is carried over untouched; `page=1` is left
/// implicit.
fn page_url(req: &HttpRequest, page: u64) -> String {
    let info = req.connection_info();
    let mut url = format!("{}://{}{}", info.scheme(), info.host(), req.path());

    let mut params: Vec<&str> = req
        .query_string()
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page=") && *pair != "page")
        .collect();
    let page_param;
    if page > 1 {
        page_param = format!("page={page}");
        params.push(&page_param);
    }
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    url
}
