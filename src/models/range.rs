//! Range scan request.

/// Describes a bounded, ordered scan over one table's keys.
///
/// A bound that is `None` or empty leaves that side of the range open, and a
/// `limit` of zero returns every matching entry.
///
/// # Examples
///
/// ```
/// use sqlkv::RangeRequest;
///
/// let req = RangeRequest::new("users")
///     .min("b", true)
///     .max("d", false)
///     .descending()
///     .limit(10);
/// assert_eq!(req.min_bound(), Some("b"));
/// assert!(req.is_desc);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeRequest {
    /// Table to scan.
    pub table: String,
    /// Lower key bound.
    pub min: Option<String>,
    /// Upper key bound.
    pub max: Option<String>,
    /// Whether the lower bound itself matches.
    pub min_include: bool,
    /// Whether the upper bound itself matches.
    pub max_include: bool,
    /// Maximum number of entries to return (0 = unbounded).
    pub limit: u32,
    /// Return entries in descending key order.
    pub is_desc: bool,
}

impl RangeRequest {
    /// Creates an unbounded ascending scan of `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Sets the lower bound.
    #[must_use]
    pub fn min(mut self, bound: impl Into<String>, inclusive: bool) -> Self {
        self.min = Some(bound.into());
        self.min_include = inclusive;
        self
    }

    /// Sets the upper bound.
    #[must_use]
    pub fn max(mut self, bound: impl Into<String>, inclusive: bool) -> Self {
        self.max = Some(bound.into());
        self.max_include = inclusive;
        self
    }

    /// Caps the number of returned entries.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Orders results by key descending.
    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.is_desc = true;
        self
    }

    /// Returns the effective lower bound, treating an empty string as absent.
    #[must_use]
    pub fn min_bound(&self) -> Option<&str> {
        self.min.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns the effective upper bound, treating an empty string as absent.
    #[must_use]
    pub fn max_bound(&self) -> Option<&str> {
        self.max.as_deref().filter(|s| !s.is_empty())
    }
}
