//! In-memory pagination for list pages
//!
//! Admin and reader lists are filtered after loading, so paging happens on
//! the filtered `Vec` rather than in SQL.

use serde::{Serialize, Serializer};

/// Items shown per list page
pub const ITEMS_PER_PAGE: u32 = 10;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: ITEMS_PER_PAGE,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Page from a `?page=` query value; anything unparseable is page 1.
    pub fn from_query(page: Option<&str>) -> Self {
        let page = page.and_then(|p| p.trim().parse::<u32>().ok()).unwrap_or(1);
        Self::new(page, ITEMS_PER_PAGE)
    }

    fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.per_page as usize)
    }
}

/// Page navigation block rendered by the list templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub items_per_page: u32,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: usize,
    /// Serialized as the page number or `false`
    #[serde(serialize_with = "page_or_false")]
    pub next_page: Option<u32>,
    #[serde(serialize_with = "page_or_false")]
    pub previous_page: Option<u32>,
}

fn page_or_false<S: Serializer>(page: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
    match page {
        Some(p) => serializer.serialize_u32(*p),
        None => serializer.serialize_bool(false),
    }
}

/// One page of items plus navigation
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub pageing: Paging,
    pub items: Vec<T>,
}

impl<T> Paged<T> {
    /// Cut `items` down to the requested page.
    pub fn from_vec(items: Vec<T>, params: ListParams) -> Self {
        let total_items = items.len();
        let per_page = params.per_page.max(1);
        let total_pages = total_items.div_ceil(per_page as usize) as u32;
        let current_page = params.page.max(1);

        let page_items = items
            .into_iter()
            .skip(params.offset())
            .take(per_page as usize)
            .collect();

        Self {
            pageing: Paging {
                items_per_page: per_page,
                current_page,
                total_pages,
                total_items,
                next_page: (current_page < total_pages).then_some(current_page + 1),
                previous_page: (current_page != 1).then_some(current_page - 1),
            },
            items: page_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_page() {
        let paged = Paged::from_vec((1..=25).collect::<Vec<_>>(), ListParams::new(1, 10));
        assert_eq!(paged.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(paged.pageing.total_pages, 3);
        assert_eq!(paged.pageing.total_items, 25);
        assert_eq!(paged.pageing.next_page, Some(2));
        assert_eq!(paged.pageing.previous_page, None);
    }

    #[test]
    fn test_last_page_is_partial() {
        let paged = Paged::from_vec((1..=25).collect::<Vec<_>>(), ListParams::new(3, 10));
        assert_eq!(paged.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(paged.pageing.next_page, None);
        assert_eq!(paged.pageing.previous_page, Some(2));
    }

    #[test]
    fn test_empty_list_still_has_items_array() {
        let paged: Paged<i32> = Paged::from_vec(Vec::new(), ListParams::default());
        let json = serde_json::to_value(&paged).unwrap();
        assert_eq!(json["items"], serde_json::json!([]));
        assert_eq!(json["pageing"]["totalPages"], 0);
        assert_eq!(json["pageing"]["nextPage"], false);
        assert_eq!(json["pageing"]["previousPage"], false);
    }

    #[test]
    fn test_from_query() {
        assert_eq!(ListParams::from_query(Some("3")).page, 3);
        assert_eq!(ListParams::from_query(Some("abc")).page, 1);
        assert_eq!(ListParams::from_query(Some("0")).page, 1);
        assert_eq!(ListParams::from_query(None).page, 1);
    }

    proptest! {
        #[test]
        fn prop_page_never_exceeds_per_page(len in 0usize..200, page in 1u32..30) {
            let paged = Paged::from_vec(vec![0u8; len], ListParams::new(page, ITEMS_PER_PAGE));
            prop_assert!(paged.items.len() <= ITEMS_PER_PAGE as usize);
            prop_assert_eq!(paged.pageing.total_items, len);
        }

        #[test]
        fn prop_pages_cover_all_items(len in 0usize..120) {
            let items: Vec<usize> = (0..len).collect();
            let total = Paged::from_vec(items.clone(), ListParams::default()).pageing.total_pages;
            let mut seen = Vec::new();
            for page in 1..=total {
                seen.extend(Paged::from_vec(items.clone(), ListParams::new(page, ITEMS_PER_PAGE)).items);
            }
            prop_assert_eq!(seen, items);
        }
    }
}
