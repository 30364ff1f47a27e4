//! Proxy filters and their translation into source predicates

use std::collections::BTreeSet;

use crate::config::FieldNames;
use crate::models::{Anonymity, ProxyRecord, ProxyType};

/// Caller-supplied restrictions on which proxies may be selected.
///
/// Each set is independent; an empty set means "no restriction". Type and
/// anonymity filters hold the numeric codes of [`ProxyType`] and
/// [`Anonymity`]; unknown codes are kept but ignored when the predicate is
/// built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub countries: BTreeSet<String>,
    pub types: BTreeSet<i64>,
    pub anonymities: BTreeSet<i64>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.types.is_empty() && self.anonymities.is_empty()
    }

    /// Translate the filter into column values.
    ///
    /// Filters on columns disabled in `fields` are dropped, as are filters
    /// whose codes all map to nothing.
    pub fn predicate(&self, fields: &FieldNames) -> FilterPredicate {
        let countries = if fields.country.is_empty() {
            Vec::new()
        } else {
            self.countries.iter().cloned().collect()
        };

        let types = self
            .types
            .iter()
            .filter_map(|&code| ProxyType::from_code(code))
            .map(|t| t.as_str().to_string())
            .collect();

        let anonymities = if fields.anonymous.is_empty() {
            Vec::new()
        } else {
            self.anonymities
                .iter()
                .filter_map(|&code| Anonymity::from_code(code))
                .flat_map(|a| a.tokens().iter().map(|t| t.to_string()))
                .collect()
        };

        FilterPredicate {
            countries,
            types,
            anonymities,
        }
    }
}

/// Column values a proxy must match, `IN`-style.
///
/// An empty list imposes no restriction on its column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    pub countries: Vec<String>,
    pub types: Vec<String>,
    pub anonymities: Vec<String>,
}

impl FilterPredicate {
    pub fn is_unrestricted(&self) -> bool {
        self.countries.is_empty() && self.types.is_empty() && self.anonymities.is_empty()
    }

    /// Evaluate the predicate against a record in memory.
    ///
    /// Type and anonymity tokens compare without regard to ASCII case, the
    /// same way [`ProxyType::from_str`] and [`Anonymity::from_str`] read them.
    pub fn matches(&self, record: &ProxyRecord) -> bool {
        contains(&self.countries, &record.country, false)
            && contains(&self.types, &record.proxy_type, true)
            && contains(&self.anonymities, &record.anonymity, true)
    }
}

fn contains(allowed: &[String], value: &Option<String>, ignore_case: bool) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match value {
        Some(v) if ignore_case => allowed.iter().any(|a| a.eq_ignore_ascii_case(v)),
        Some(v) => allowed.iter().any(|a| a == v),
        None => false,
    }
}
