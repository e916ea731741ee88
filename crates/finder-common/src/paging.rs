/// Browse and search page-size rules.
use serde::{Deserialize, Serialize};

pub const DEFAULT_BROWSE_LIMIT: usize = 10;
pub const MAX_BROWSE_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

pub const SEARCH_LIMIT_CHOICES: [usize; 4] = [5, 10, 20, 50];
pub const BROWSE_LIMIT_CHOICES: [usize; 4] = [10, 20, 50, 100];

/// Parameters for one page of the browse listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseRequest {
    pub offset: usize,
    pub limit: usize,
    /// Random order instead of catalog order
    pub shuffle: bool,
    /// Optional query narrowing the listing
    pub query: Option<String>,
}

impl Default for BrowseRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_BROWSE_LIMIT,
            shuffle: false,
            query: None,
        }
    }
}

impl BrowseRequest {
    /// Build a request from raw URL or tool parameters, falling back to defaults for
    /// anything missing or unparsable.
    pub fn from_params(
        offset: Option<&str>,
        limit: Option<&str>,
        shuffle: Option<&str>,
        query: Option<&str>,
    ) -> Self {
        Self {
            offset: parse_offset(offset),
            limit: parse_limit(limit, DEFAULT_BROWSE_LIMIT, MAX_BROWSE_LIMIT),
            shuffle: shuffle.map(str::trim) == Some("1"),
            query: query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
        }
    }

    /// Clamp the limit into `1..=MAX_BROWSE_LIMIT`.
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_BROWSE_LIMIT);
        self
    }

    /// Same listing at another offset.
    pub fn at_offset(&self, offset: usize) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    /// Changing the page size starts over from the first item.
    pub fn with_limit(&self, limit: usize) -> Self {
        Self {
            offset: 0,
            limit: limit.clamp(1, MAX_BROWSE_LIMIT),
            ..self.clone()
        }
    }

    /// Flipping shuffle mode starts over from the first item.
    pub fn with_shuffle_toggled(&self) -> Self {
        Self {
            offset: 0,
            shuffle: !self.shuffle,
            ..self.clone()
        }
    }
}

pub fn parse_offset(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok()).unwrap_or(0)
}

/// Parse a page size, falling back to `default` for missing, unparsable or zero values.
pub fn parse_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
        .min(max)
}

/// The browse link from a search asks for at least a default page of items.
pub fn full_list_limit(search_limit: usize) -> usize {
    search_limit.max(DEFAULT_BROWSE_LIMIT).min(MAX_BROWSE_LIMIT)
}

/// Position of one page within the whole listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
}

impl PageWindow {
    pub fn new(offset: usize, limit: usize, total: usize) -> Self {
        Self {
            offset,
            limit: limit.max(1),
            total,
        }
    }

    /// 1-based position of the first item shown, or 0 for an empty listing.
    pub fn first_shown(&self) -> usize {
        self.total.min(self.offset.saturating_add(1))
    }

    pub fn last_shown(&self) -> usize {
        self.total.min(self.offset.saturating_add(self.limit))
    }

    pub fn prev_offset(&self) -> Option<usize> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }

    pub fn next_offset(&self) -> Option<usize> {
        self.offset
            .checked_add(self.limit)
            .filter(|&next| next < self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_request_from_params_defaults() {
        let req = BrowseRequest::from_params(None, None, None, None);
        assert_eq!(req, BrowseRequest::default());

        let req = BrowseRequest::from_params(Some("abc"), Some("-3"), Some("0"), Some("  "));
        assert_eq!(req, BrowseRequest::default());
    }

    #[test]
    fn browse_request_from_params_clamps_limit() {
        let req = BrowseRequest::from_params(Some("20"), Some("500"), Some("1"), Some(" castle "));
        assert_eq!(req.offset, 20);
        assert_eq!(req.limit, MAX_BROWSE_LIMIT);
        assert!(req.shuffle);
        assert_eq!(req.query.as_deref(), Some("castle"));

        assert_eq!(BrowseRequest::from_params(None, Some("0"), None, None).limit, 10);
    }

    #[test]
    fn changing_limit_or_shuffle_resets_offset() {
        let req = BrowseRequest {
            offset: 40,
            limit: 20,
            shuffle: false,
            query: Some("sea".to_string()),
        };
        let resized = req.with_limit(50);
        assert_eq!((resized.offset, resized.limit), (0, 50));
        assert_eq!(resized.query.as_deref(), Some("sea"));

        let shuffled = req.with_shuffle_toggled();
        assert_eq!(shuffled.offset, 0);
        assert!(shuffled.shuffle);
        assert!(!shuffled.with_shuffle_toggled().shuffle);
    }

    #[test]
    fn window_range_and_navigation() {
        let w = PageWindow::new(0, 10, 25);
        assert_eq!((w.first_shown(), w.last_shown()), (1, 10));
        assert_eq!(w.prev_offset(), None);
        assert_eq!(w.next_offset(), Some(10));

        let w = PageWindow::new(20, 10, 25);
        assert_eq!((w.first_shown(), w.last_shown()), (21, 25));
        assert_eq!(w.prev_offset(), Some(10));
        assert_eq!(w.next_offset(), None);

        let w = PageWindow::new(5, 10, 25);
        assert_eq!(w.prev_offset(), Some(0));
    }

    #[test]
    fn empty_listing_window() {
        let w = PageWindow::new(0, 10, 0);
        assert_eq!((w.first_shown(), w.last_shown()), (0, 0));
        assert_eq!(w.next_offset(), None);
    }

    #[test]
    fn huge_offset_stays_within_the_listing() {
        let req = BrowseRequest::from_params(Some("18446744073709551615"), None, None, None);
        assert_eq!(req.offset, usize::MAX);

        let w = PageWindow::new(req.offset, req.limit, 25);
        assert_eq!((w.first_shown(), w.last_shown()), (25, 25));
        assert_eq!(w.next_offset(), None);
        assert_eq!(w.prev_offset(), Some(usize::MAX - 10));

        let w = PageWindow::new(usize::MAX - 3, 10, usize::MAX);
        assert_eq!(w.next_offset(), None);
        assert_eq!(w.last_shown(), usize::MAX);
    }

    #[test]
    fn full_list_limit_has_a_floor() {
        assert_eq!(full_list_limit(5), 10);
        assert_eq!(full_list_limit(50), 50);
    }

    #[test]
    fn search_limit_parsing() {
        assert_eq!(parse_limit(Some("20"), DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT), 20);
        assert_eq!(parse_limit(Some("999"), DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT), 50);
        assert_eq!(parse_limit(Some("x"), DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT), 10);
    }
}
