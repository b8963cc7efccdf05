//! Links and paging parameters shared by every representation

use serde::{Deserialize, Serialize};

use crate::application::ports::outbound::{
    ListQuery, Page, PageRequest, SortDirection, SortField, DEFAULT_PAGE_SIZE,
};

/// One hypermedia link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDto {
    pub rel: String,
    pub href: String,
    pub method: String,
}

impl LinkDto {
    pub fn new(rel: &str, href: impl Into<String>, method: &str) -> Self {
        Self {
            rel: rel.to_string(),
            href: href.into(),
            method: method.to_string(),
        }
    }

    pub fn get(rel: &str, href: impl Into<String>) -> Self {
        Self::new(rel, href, "GET")
    }

    /// self/update/delete links of an item resource
    pub fn crud(base: &str) -> Vec<Self> {
        vec![
            Self::get("self", base),
            Self::new("update", base, "PUT"),
            Self::new("delete", base, "DELETE"),
        ]
    }
}

/// Percent-encode one path segment or query value
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Query string of list and search endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQueryDto {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    /// Search term, only read by search endpoints
    pub q: Option<String>,
}

impl PageQueryDto {
    pub fn page_request(&self, allow_rank: bool) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.size.unwrap_or(DEFAULT_PAGE_SIZE)).sorted(
            SortField::parse(self.sort.as_deref(), allow_rank),
            SortDirection::parse(self.direction.as_deref()),
        )
    }

    pub fn list_query(&self, allow_rank: bool) -> ListQuery {
        ListQuery::all(self.page_request(allow_rank))
    }

    pub fn search_query(&self, allow_rank: bool) -> ListQuery {
        ListQuery::search(self.q.as_deref(), self.page_request(allow_rank))
    }
}

/// Paging summary shared by list responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub total: u64,
    pub total_pages: u32,
    pub has_more: bool,
    /// Link to the following page, or empty on the last page
    pub next_page: String,
}

impl PageInfo {
    /// `path` is the collection path; `q` is repeated on search endpoints
    pub fn of<T>(page: &Page<T>, request: &PageRequest, path: &str, q: Option<&str>) -> Self {
        let has_more = page.has_more();
        let next_page = if has_more {
            let search = q
                .map(|term| format!("q={}&", encode(term)))
                .unwrap_or_default();
            format!(
                "{}?{}page={}&size={}&sort={}&direction={}",
                path,
                search,
                page.page + 1,
                page.size,
                request.sort.as_str(),
                request.direction.as_str()
            )
        } else {
            String::new()
        };

        Self {
            total: page.total,
            total_pages: page.total_pages(),
            has_more,
            next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_link_carries_query() {
        let request = PageRequest::new(1, 2).sorted(SortField::Name, SortDirection::Desc);
        let page = request.slice(vec![1, 2, 3]);

        let info = PageInfo::of(&page, &request, "/characters/search", Some("Gojo S"));
        assert!(info.has_more);
        assert_eq!(info.total_pages, 2);
        assert_eq!(
            info.next_page,
            "/characters/search?q=Gojo%20S&page=2&size=2&sort=name&direction=desc"
        );

        let last_request = PageRequest::new(2, 2);
        let last = last_request.slice(vec![1, 2, 3]);
        let info = PageInfo::of(&last, &last_request, "/characters", None);
        assert!(!info.has_more);
        assert_eq!(info.next_page, "");
    }

    #[test]
    fn test_page_query_defaults_and_whitelist() {
        let query = PageQueryDto {
            sort: Some("rank".into()),
            ..Default::default()
        };
        let request = query.page_request(false);
        assert_eq!(request.page, 1);
        assert_eq!(request.size, DEFAULT_PAGE_SIZE);
        assert_eq!(request.sort, SortField::Id);
        assert_eq!(query.page_request(true).sort, SortField::Rank);
    }
}
