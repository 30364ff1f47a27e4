//! Data sources the selector reads proxy rows from

pub mod memory;
pub mod proxy;

pub use memory::MemoryProxySource;
pub use proxy::PgProxySource;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProxyRecord;
use crate::selector::FilterPredicate;

/// Lower bound on the id of a matching row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdBound {
    /// `id > n`
    After(i64),
    /// `id >= n`
    AtLeast(i64),
}

impl IdBound {
    pub fn admits(&self, id: i64) -> bool {
        match *self {
            IdBound::After(n) => id > n,
            IdBound::AtLeast(n) => id >= n,
        }
    }
}

/// A "first matching row" lookup, ordered by ascending id
#[derive(Debug, Clone, Default)]
pub struct ProxyQuery {
    pub predicate: FilterPredicate,
    /// Only rows whose status flag marks them usable
    pub active_only: bool,
    pub id_bound: Option<IdBound>,
    pub exclude_ids: Vec<i64>,
}

impl ProxyQuery {
    pub fn new(predicate: FilterPredicate) -> Self {
        Self {
            predicate,
            ..Default::default()
        }
    }

    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    pub fn with_id_bound(mut self, bound: IdBound) -> Self {
        self.id_bound = Some(bound);
        self
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.exclude_ids = ids.into_iter().collect();
        self
    }

    /// Evaluate the whole query against a record in memory
    pub fn matches(&self, record: &ProxyRecord) -> bool {
        if self.active_only && !record.is_active() {
            return false;
        }
        if let Some(bound) = self.id_bound {
            if !bound.admits(record.id) {
                return false;
            }
        }
        if self.exclude_ids.contains(&record.id) {
            return false;
        }
        self.predicate.matches(record)
    }
}

/// Tabular proxy store the selector composes its queries against
#[async_trait]
pub trait ProxySource: Send + Sync {
    /// Smallest and largest id among rows matching the predicate,
    /// regardless of status. `None` when nothing matches.
    async fn id_range(&self, predicate: &FilterPredicate) -> Result<Option<(i64, i64)>>;

    /// Matching row with the lowest id
    async fn first_match(&self, query: &ProxyQuery) -> Result<Option<ProxyRecord>>;

    /// Row with the given id, ignoring status
    async fn find_by_id(&self, id: i64) -> Result<Option<ProxyRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;

    #[test]
    fn test_id_bound_admits() {
        assert!(IdBound::After(5).admits(6));
        assert!(!IdBound::After(5).admits(5));
        assert!(IdBound::AtLeast(5).admits(5));
        assert!(!IdBound::AtLeast(5).admits(4));
    }

    #[test]
    fn test_query_matches() {
        let mut record = ProxyRecord::new(10, "10.0.0.1", 80, ProxyType::Http);

        let query = ProxyQuery::new(FilterPredicate::default())
            .active_only()
            .with_id_bound(IdBound::AtLeast(10))
            .excluding([3, 4]);
        assert!(query.matches(&record));

        let excluded = query.clone().excluding([10]);
        assert!(!excluded.matches(&record));

        let bounded = query.clone().with_id_bound(IdBound::After(10));
        assert!(!bounded.matches(&record));

        record.status = 0;
        assert!(!query.matches(&record));
        assert!(ProxyQuery::default().matches(&record));
    }
}
