//! Proxy Selector
//!
//! Picks proxy servers out of a relational proxy table.
//!
//! ## Features
//!
//! - Filters by country, proxy type (HTTP, HTTPS, SOCKS4, SOCKS5) and anonymity level
//! - Random selection that avoids handing out the same proxy twice in a row
//! - Round-robin rotation over the filtered table in id order
//! - Direct lookup by id
//! - Configurable table and column names, PostgreSQL via sqlx
//! - `tcp://` connection strings and column-keyed field maps of the selected proxy

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod repository;
pub mod selector;

pub use config::{Config, FieldNames, SelectorConfig};
pub use database::Database;
pub use error::{Result, SelectorError};
pub use models::{Anonymity, ProxyRecord, ProxyType};
pub use repository::{MemoryProxySource, PgProxySource, ProxySource};
pub use selector::{ProxySelector, SelectionStrategy};
