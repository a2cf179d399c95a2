//! Cursor-paginated list payloads

use serde::Deserialize;

/// One page of a cursor-paginated endpoint.
///
/// `next` is the continuation URL; `None` means the list is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(results: Vec<T>, next: Option<String>) -> Self {
        Self { results, next }
    }

    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_without_results_is_rejected() {
        let parsed = serde_json::from_str::<Page<u32>>(r#"{"next": null}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn null_next_marks_last_page() {
        let page: Page<u32> = serde_json::from_str(r#"{"results": [1, 2], "next": null}"#).unwrap();
        assert!(page.is_last());
        assert_eq!(page.results, vec![1, 2]);
    }
}
