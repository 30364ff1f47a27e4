//! In-process proxy source

use async_trait::async_trait;

use super::{ProxyQuery, ProxySource};
use crate::error::Result;
use crate::models::ProxyRecord;
use crate::selector::FilterPredicate;

/// Proxy rows held in memory, for embedding and tests.
///
/// Rows are fixed at construction; build a new source to change them.
#[derive(Debug, Clone, Default)]
pub struct MemoryProxySource {
    records: Vec<ProxyRecord>,
}

impl MemoryProxySource {
    pub fn new(records: Vec<ProxyRecord>) -> Self {
        let mut records = records;
        records.sort_by_key(|r| r.id);
        Self { records }
    }

    pub fn records(&self) -> &[ProxyRecord] {
        &self.records
    }
}

#[async_trait]
impl ProxySource for MemoryProxySource {
    async fn id_range(&self, predicate: &FilterPredicate) -> Result<Option<(i64, i64)>> {
        let mut ids = self
            .records
            .iter()
            .filter(|r| predicate.matches(r))
            .map(|r| r.id);

        Ok(ids.next().map(|first| {
            // records are sorted, so the last match is the maximum
            let last = ids.last().unwrap_or(first);
            (first, last)
        }))
    }

    async fn first_match(&self, query: &ProxyQuery) -> Result<Option<ProxyRecord>> {
        Ok(self.records.iter().find(|r| query.matches(r)).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ProxyRecord>> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }
}
