use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{IdBound, ProxyQuery, ProxySource};
use crate::config::FieldNames;
use crate::error::Result;
use crate::models::{ProxyRecord, STATUS_ACTIVE};
use crate::selector::FilterPredicate;

/// Proxy source backed by a PostgreSQL table with configurable column names
#[derive(Clone)]
pub struct PgProxySource {
    pool: PgPool,
    fields: FieldNames,
}

impl PgProxySource {
    /// Create a source over `fields.table`, rejecting unusable column names
    pub fn new(pool: PgPool, fields: FieldNames) -> Result<Self> {
        fields.validate()?;
        Ok(Self { pool, fields })
    }

    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }
}

#[async_trait]
impl ProxySource for PgProxySource {
    async fn id_range(&self, predicate: &FilterPredicate) -> Result<Option<(i64, i64)>> {
        let mut query = build_id_range(&self.fields, predicate);
        let (min, max): (Option<i64>, Option<i64>) =
            query.build_query_as().fetch_one(&self.pool).await?;

        Ok(min.zip(max))
    }

    async fn first_match(&self, query: &ProxyQuery) -> Result<Option<ProxyRecord>> {
        let mut sql = build_first_match(&self.fields, query);
        let proxy = sql
            .build_query_as::<ProxyRecord>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(proxy)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ProxyRecord>> {
        let mut query = build_find_by_id(&self.fields, id);
        let proxy = query
            .build_query_as::<ProxyRecord>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(proxy)
    }
}

/// `SELECT MIN(id), MAX(id)` over rows matching the predicate
fn build_id_range(fields: &FieldNames, predicate: &FilterPredicate) -> QueryBuilder<'static, Postgres> {
    let id = quote_ident(&fields.id);
    let mut query = QueryBuilder::<Postgres>::new("SELECT MIN(");
    query
        .push(&id)
        .push(")::BIGINT, MAX(")
        .push(&id)
        .push(")::BIGINT FROM ")
        .push(quote_ident(&fields.table))
        .push(" WHERE 1=1");
    push_predicate(&mut query, fields, predicate);
    query
}

/// First row matching the query, by ascending id
fn build_first_match(fields: &FieldNames, filter: &ProxyQuery) -> QueryBuilder<'static, Postgres> {
    let id = quote_ident(&fields.id);
    let mut query = select_records(fields);
    query.push(" WHERE 1=1");
    push_predicate(&mut query, fields, &filter.predicate);

    if filter.active_only {
        query
            .push(" AND COALESCE(")
            .push(quote_ident(&fields.status))
            .push("::INTEGER, 0) = ")
            .push_bind(STATUS_ACTIVE);
    }

    match filter.id_bound {
        Some(IdBound::After(n)) => {
            query.push(" AND ").push(&id).push(" > ").push_bind(n);
        }
        Some(IdBound::AtLeast(n)) => {
            query.push(" AND ").push(&id).push(" >= ").push_bind(n);
        }
        None => {}
    }

    if !filter.exclude_ids.is_empty() {
        query
            .push(" AND NOT (")
            .push(&id)
            .push(" = ANY(")
            .push_bind(filter.exclude_ids.clone())
            .push("))");
    }

    query.push(" ORDER BY ").push(&id).push(" ASC LIMIT 1");
    query
}

fn build_find_by_id(fields: &FieldNames, id: i64) -> QueryBuilder<'static, Postgres> {
    let mut query = select_records(fields);
    query
        .push(" WHERE ")
        .push(quote_ident(&fields.id))
        .push(" = ")
        .push_bind(id);
    query
}

/// SELECT list mapping configured columns onto [`ProxyRecord`] fields.
///
/// Columns are cast so integer widths and boolean status flags all decode;
/// disabled optional columns read as NULL.
fn select_records(fields: &FieldNames) -> QueryBuilder<'static, Postgres> {
    let columns = [
        (Some(&fields.id), "BIGINT", "id"),
        (Some(&fields.ip), "TEXT", "ip"),
        (Some(&fields.port), "INTEGER", "port"),
        (Some(&fields.proxy_type), "TEXT", "type"),
        (optional(&fields.country), "TEXT", "country"),
        (optional(&fields.anonymous), "TEXT", "anonymity"),
        (optional(&fields.login), "TEXT", "login"),
        (optional(&fields.password), "TEXT", "password"),
    ];

    let mut query = QueryBuilder::<Postgres>::new("SELECT ");
    for (column, sql_type, alias) in columns {
        match column {
            Some(column) => query.push(quote_ident(column)),
            None => query.push("NULL"),
        };
        query.push(format!("::{} AS \"{}\", ", sql_type, alias));
    }
    query
        .push("COALESCE(")
        .push(quote_ident(&fields.status))
        .push("::INTEGER, 0) AS \"status\" FROM ")
        .push(quote_ident(&fields.table));
    query
}

fn push_predicate(
    query: &mut QueryBuilder<'static, Postgres>,
    fields: &FieldNames,
    predicate: &FilterPredicate,
) {
    // Type tokens are upper case and anonymity tokens lower case, so the
    // column is folded to match them.
    let clauses = [
        (&fields.country, &predicate.countries, None),
        (&fields.proxy_type, &predicate.types, Some("UPPER")),
        (&fields.anonymous, &predicate.anonymities, Some("LOWER")),
    ];

    for (column, values, fold) in clauses {
        if column.is_empty() || values.is_empty() {
            continue;
        }
        query.push(" AND ");
        match fold {
            Some(function) => query.push(format!("{}({})", function, quote_ident(column))),
            None => query.push(quote_ident(column)),
        };
        query.push(" = ANY(").push_bind(values.clone()).push(")");
    }
}

fn optional(column: &String) -> Option<&String> {
    Some(column).filter(|c| !c.is_empty())
}

/// Quote an identifier that has already passed [`FieldNames::validate`]
fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predicate() -> FilterPredicate {
        FilterPredicate {
            countries: vec!["US".to_string()],
            types: vec!["SOCKS5".to_string()],
            anonymities: Vec::new(),
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("proxies"), "\"proxies\"");
        assert_eq!(quote_ident("net.proxies"), "\"net\".\"proxies\"");
    }

    #[test]
    fn test_select_records_maps_columns() {
        let fields = FieldNames {
            id: "proxy_id".to_string(),
            login: String::new(),
            ..FieldNames::default()
        };
        let query = select_records(&fields);

        assert_eq!(
            query.sql(),
            "SELECT \"proxy_id\"::BIGINT AS \"id\", \"ip\"::TEXT AS \"ip\", \
             \"port\"::INTEGER AS \"port\", \"type\"::TEXT AS \"type\", \
             \"country\"::TEXT AS \"country\", \"anonymous\"::TEXT AS \"anonymity\", \
             NULL::TEXT AS \"login\", \"password\"::TEXT AS \"password\", \
             COALESCE(\"status\"::INTEGER, 0) AS \"status\" FROM \"proxies\""
        );
    }

    #[test]
    fn test_id_range_ignores_status() {
        let query = build_id_range(&FieldNames::default(), &predicate());
        let sql = query.sql();

        assert!(sql.starts_with("SELECT MIN(\"id\")::BIGINT, MAX(\"id\")::BIGINT FROM \"proxies\""));
        assert!(sql.contains(" AND \"country\" = ANY($1) AND UPPER(\"type\") = ANY($2)"));
        assert!(!sql.contains("anonymous"));
        assert!(!sql.contains("status"));
    }

    #[test]
    fn test_first_match_composes_all_clauses() {
        let filter = ProxyQuery::new(predicate())
            .active_only()
            .with_id_bound(IdBound::AtLeast(17))
            .excluding([3, 4]);
        let query = build_first_match(&FieldNames::default(), &filter);
        let sql = query.sql();

        assert!(sql.contains(
            "WHERE 1=1 AND \"country\" = ANY($1) AND UPPER(\"type\") = ANY($2) \
             AND COALESCE(\"status\"::INTEGER, 0) = $3 AND \"id\" >= $4 \
             AND NOT (\"id\" = ANY($5)) ORDER BY \"id\" ASC LIMIT 1"
        ));
    }

    #[test]
    fn test_first_match_without_restrictions() {
        let filter = ProxyQuery::default().with_id_bound(IdBound::After(0));
        let query = build_first_match(&FieldNames::default(), &filter);

        assert!(query
            .sql()
            .ends_with("FROM \"proxies\" WHERE 1=1 AND \"id\" > $1 ORDER BY \"id\" ASC LIMIT 1"));
    }

    #[test]
    fn test_disabled_country_column_skips_filter() {
        let fields = FieldNames {
            country: String::new(),
            ..FieldNames::default()
        };
        let query = build_id_range(&fields, &predicate());

        assert!(query.sql().ends_with("WHERE 1=1 AND UPPER(\"type\") = ANY($1)"));
    }

    #[test]
    fn test_type_and_anonymity_columns_are_case_folded() {
        let predicate = FilterPredicate {
            countries: Vec::new(),
            types: vec!["SOCKS5".to_string()],
            anonymities: vec!["elite".to_string(), "elite proxy".to_string()],
        };
        let query = build_id_range(&FieldNames::default(), &predicate);

        assert!(query
            .sql()
            .ends_with("WHERE 1=1 AND UPPER(\"type\") = ANY($1) AND LOWER(\"anonymous\") = ANY($2)"));
    }

    #[test]
    fn test_find_by_id_has_no_filters() {
        let query = build_find_by_id(&FieldNames::default(), 42);
        assert!(query
            .sql()
            .ends_with("FROM \"proxies\" WHERE \"id\" = $1"));
    }
}
