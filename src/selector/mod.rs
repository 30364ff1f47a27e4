//! Proxy selection over a filtered proxy table
//!
//! [`ProxySelector`] keeps the caller's filters, the rotation cursor and the
//! recent random picks for one session. Selection methods take `&mut self`,
//! so a selector is used by one task at a time; share the underlying
//! [`ProxySource`] instead and give each request its own selector.

mod filter;
mod memory;

pub use filter::{FilterPredicate, FilterState};
pub use memory::SelectionMemory;

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::{FieldNames, SelectorConfig};
use crate::error::Result;
use crate::models::{Anonymity, ProxyRecord, ProxyType};
use crate::repository::{IdBound, ProxyQuery, ProxySource};

/// Upper bound on random attempts per call: one attempt, then one more after
/// forgetting recent picks
const RANDOM_MAX_ATTEMPTS: usize = 2;

/// Draws per attempt before wrapping to the start of the id range
const RANDOM_DRAWS_BEFORE_WRAP: usize = 2;

/// Strategy types for proxy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    #[default]
    Random,
    Rotate,
}

impl SelectionStrategy {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "rotate" | "rotation" | "round_robin" | "roundrobin" | "round-robin" => Self::Rotate,
            _ => Self::Random,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Rotate => "rotate",
        }
    }
}

/// Picks proxies from a [`ProxySource`] by filter, randomly or in rotation
pub struct ProxySelector {
    source: Arc<dyn ProxySource>,
    fields: FieldNames,
    filter: FilterState,
    memory: SelectionMemory,
    selected: Option<ProxyRecord>,
    rng: StdRng,
}

impl ProxySelector {
    pub fn new(
        source: Arc<dyn ProxySource>,
        fields: FieldNames,
        config: SelectorConfig,
    ) -> Result<Self> {
        fields.validate()?;

        Ok(Self {
            source,
            fields,
            filter: FilterState::default(),
            memory: SelectionMemory::new(config.random_memory_count),
            selected: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Use a fixed seed for random selection
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn memory(&self) -> &SelectionMemory {
        &self.memory
    }

    /// Restrict selection to the given country codes (empty = any)
    pub fn set_country_filter<I, S>(&mut self, countries: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next = countries.into_iter().map(Into::into).collect();
        replace_filter(&mut self.filter.countries, next, &mut self.memory);
        self
    }

    /// Restrict selection to proxy type codes, see [`ProxyType::code`].
    ///
    /// Unknown codes are ignored; if none are known the filter is open.
    pub fn set_type_filter<I>(&mut self, codes: I) -> &mut Self
    where
        I: IntoIterator<Item = i64>,
    {
        let next = codes.into_iter().collect();
        replace_filter(&mut self.filter.types, next, &mut self.memory);
        self
    }

    /// Restrict selection to anonymity codes, see [`Anonymity::code`]
    pub fn set_anonymity_filter<I>(&mut self, codes: I) -> &mut Self
    where
        I: IntoIterator<Item = i64>,
    {
        let next = codes.into_iter().collect();
        replace_filter(&mut self.filter.anonymities, next, &mut self.memory);
        self
    }

    pub fn set_proxy_types(&mut self, types: impl IntoIterator<Item = ProxyType>) -> &mut Self {
        self.set_type_filter(types.into_iter().map(|t| t.code()))
    }

    pub fn set_anonymity_levels(
        &mut self,
        levels: impl IntoIterator<Item = Anonymity>,
    ) -> &mut Self {
        self.set_anonymity_filter(levels.into_iter().map(|a| a.code()))
    }

    /// Select with the given strategy
    pub async fn select(&mut self, strategy: SelectionStrategy) -> Result<Option<&ProxyRecord>> {
        match strategy {
            SelectionStrategy::Random => self.random().await,
            SelectionStrategy::Rotate => self.rotate().await,
        }
    }

    /// Pick a random active proxy matching the filter, avoiding recent picks.
    ///
    /// A random id is drawn from the filtered id range and the first eligible
    /// row at or after it is taken. A draw past the last eligible row is
    /// redrawn once before wrapping to the start of the range. When every
    /// eligible row was picked recently the memory is forgotten and the
    /// attempt repeated once.
    ///
    /// Picks are not uniform: a row is chosen with probability proportional
    /// to the id gap below it, and the lowest eligible row also absorbs draws
    /// that miss twice.
    pub async fn random(&mut self) -> Result<Option<&ProxyRecord>> {
        self.selected = None;
        let predicate = self.filter.predicate(&self.fields);

        let Some((min, max)) = self.source.id_range(&predicate).await? else {
            debug!("No proxies match the current filter");
            return Ok(None);
        };

        for attempt in 1..=RANDOM_MAX_ATTEMPTS {
            if let Some(proxy) = self.random_from(&predicate, min, max).await? {
                debug!(id = proxy.id, attempt, "Selected random proxy");
                self.memory.remember_random(proxy.id);
                self.selected = Some(proxy);
                return Ok(self.selected.as_ref());
            }

            if self.memory.recent_random_ids().next().is_none() {
                break;
            }
            debug!("All eligible proxies picked recently, forgetting random memory");
            self.memory.forget_random();
        }

        warn!(min, max, "No active proxy found for random selection");
        Ok(None)
    }

    async fn random_from(
        &mut self,
        predicate: &FilterPredicate,
        min: i64,
        max: i64,
    ) -> Result<Option<ProxyRecord>> {
        let query = ProxyQuery::new(predicate.clone())
            .active_only()
            .excluding(self.memory.recent_random_ids());

        for _ in 0..RANDOM_DRAWS_BEFORE_WRAP {
            let start = self.rng.gen_range(min..=max);
            let above = query.clone().with_id_bound(IdBound::AtLeast(start));
            if let Some(proxy) = self.source.first_match(&above).await? {
                return Ok(Some(proxy));
            }
        }

        self.source.first_match(&query).await
    }

    /// Take the next active proxy matching the filter in ascending id order,
    /// wrapping to the lowest id after the last one
    pub async fn rotate(&mut self) -> Result<Option<&ProxyRecord>> {
        self.selected = None;
        let predicate = self.filter.predicate(&self.fields);
        let cursor = self.memory.rotate_cursor();

        let mut proxy = self.next_after(&predicate, cursor).await?;
        if proxy.is_none() && cursor > 0 {
            debug!(cursor, "Rotation reached the last proxy, starting over");
            self.memory.set_rotate_cursor(0);
            proxy = self.next_after(&predicate, 0).await?;
        }

        match proxy {
            Some(ref p) => {
                debug!(id = p.id, "Selected rotated proxy");
                self.memory.set_rotate_cursor(p.id);
            }
            None => debug!("No proxies match the current filter"),
        }

        self.selected = proxy;
        Ok(self.selected.as_ref())
    }

    async fn next_after(
        &self,
        predicate: &FilterPredicate,
        cursor: i64,
    ) -> Result<Option<ProxyRecord>> {
        let query = ProxyQuery::new(predicate.clone())
            .active_only()
            .with_id_bound(IdBound::After(cursor));
        self.source.first_match(&query).await
    }

    /// Fetch a proxy by id, ignoring filters and status
    pub async fn by_id(&mut self, id: i64) -> Result<Option<&ProxyRecord>> {
        self.selected = None;
        self.selected = self.source.find_by_id(id).await?;
        if self.selected.is_none() {
            debug!(id, "Proxy not found");
        }
        Ok(self.selected.as_ref())
    }

    /// Last selected proxy, unvalidated
    pub fn raw(&self) -> Option<&ProxyRecord> {
        self.selected.as_ref()
    }

    /// `tcp://[login:password@]ip:port` of the selected proxy, or an empty
    /// string when nothing usable is selected
    pub fn connection_string(&self) -> String {
        self.valid_selection()
            .map(ProxyRecord::connection_string)
            .unwrap_or_default()
    }

    /// Selected proxy keyed by the configured column names.
    ///
    /// Columns disabled in the configuration are left out. Empty when
    /// nothing usable is selected.
    pub fn fields(&self) -> Map<String, Value> {
        let Some(proxy) = self.valid_selection() else {
            return Map::new();
        };

        [
            (&self.fields.id, json!(proxy.id)),
            (&self.fields.ip, json!(proxy.ip)),
            (&self.fields.port, json!(proxy.port)),
            (&self.fields.proxy_type, json!(proxy.proxy_type)),
            (&self.fields.country, json!(proxy.country)),
            (&self.fields.anonymous, json!(proxy.anonymity)),
            (&self.fields.login, json!(proxy.login)),
            (&self.fields.password, json!(proxy.password)),
        ]
        .into_iter()
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.clone(), value))
        .collect()
    }

    fn valid_selection(&self) -> Option<&ProxyRecord> {
        let proxy = self.selected.as_ref()?;
        match proxy.validate() {
            Ok(()) => Some(proxy),
            Err(e) => {
                debug!(id = proxy.id, error = %e, "Selected proxy is not usable");
                None
            }
        }
    }

    /// Forget the rotation cursor and recent random picks
    pub fn reset_memory(&mut self) -> &mut Self {
        self.memory.clear();
        self
    }

    /// Clear all filters and memory
    pub fn reset(&mut self) -> &mut Self {
        self.filter = FilterState::default();
        self.memory.clear();
        self
    }
}

fn replace_filter<T: Ord>(current: &mut BTreeSet<T>, next: BTreeSet<T>, memory: &mut SelectionMemory) {
    if *current != next {
        memory.clear();
    }
    *current = next;
}
