//! Filter compiler entry point.
//!
//! [`FilterCompiler`] owns a raw filter string and its parsed expression and
//! turns them into a [`SelectQuery`] for a given attribute mapping, table and
//! join list.
//!
//! ```
//! use scim_sql::scim::{AttributeMap, FilterCompiler};
//!
//! let attrs = AttributeMap::new().with("userName", "users.username");
//! let compiler = FilterCompiler::new(r#"userName eq "test""#).unwrap();
//! let query = compiler.to_query(&attrs, "users", &[] as &[&str]).unwrap();
//! let (sql, params) = query.to_sql();
//! assert_eq!(sql, "SELECT * FROM users WHERE users.username = ?");
//! assert_eq!(params, vec!["test".to_string()]);
//! ```

use super::{
    attributes::AttributeMap,
    filter::{Filter, FilterParseError, parse_filter},
    filter_to_sql::{FilterToSqlError, SqlFilter, TranslateOptions, filter_to_sql_with},
    query::SelectQuery,
};

/// A parsed filter ready to be compiled against any attribute mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCompiler {
    raw_filter: String,
    expression: Option<Filter>,
    options: TranslateOptions,
}

impl FilterCompiler {
    /// Parse a raw filter string.
    ///
    /// Leading and trailing whitespace is ignored. An empty filter means
    /// "no filter" and compiles to an unconditional query.
    ///
    /// # Errors
    ///
    /// Returns the parser's [`FilterParseError`] unchanged for malformed input.
    pub fn new(raw_filter: &str) -> Result<Self, FilterParseError> {
        let raw_filter = raw_filter.trim();

        let expression = if raw_filter.is_empty() {
            None
        } else {
            Some(parse_filter(raw_filter)?)
        };

        Ok(Self {
            raw_filter: raw_filter.to_string(),
            expression,
            options: TranslateOptions::default(),
        })
    }

    /// Wrap an already-built expression tree.
    ///
    /// The tree keeps only literal text, so [`raw_filter`](Self::raw_filter)
    /// is its canonical [`Display`](std::fmt::Display) form with every value
    /// quoted: a tree parsed from `age gt 21` reports `age gt "21"`. That
    /// string parses back to an equal tree and compiles to the same SQL.
    pub fn from_expression(expression: Filter) -> Self {
        Self {
            raw_filter: expression.to_string(),
            expression: Some(expression),
            options: TranslateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    /// The trimmed filter string.
    pub fn raw_filter(&self) -> &str {
        &self.raw_filter
    }

    /// The parsed expression, or `None` when no filter was given.
    pub fn expression(&self) -> Option<&Filter> {
        self.expression.as_ref()
    }

    /// Compile only the WHERE fragment.
    ///
    /// An absent filter yields an empty [`SqlFilter`].
    pub fn to_sql_filter(&self, attributes: &AttributeMap) -> Result<SqlFilter, FilterToSqlError> {
        match &self.expression {
            Some(expression) => filter_to_sql_with(expression, attributes, self.options),
            None => Ok(SqlFilter::default()),
        }
    }

    /// Compile to a full `SELECT * FROM <table> ... [WHERE ...]` query.
    ///
    /// # Errors
    ///
    /// Fails if the filter references an attribute path missing from
    /// `attributes`, or if the expression tree is malformed. No partial query
    /// is produced.
    pub fn to_query<S: AsRef<str>>(
        &self,
        attributes: &AttributeMap,
        table: &str,
        joins: &[S],
    ) -> Result<SelectQuery, FilterToSqlError> {
        let sql_filter = self.to_sql_filter(attributes).inspect_err(|e| {
            if !e.is_internal() {
                tracing::warn!(filter = %self.raw_filter, error = %e, "Filter could not be compiled");
            }
        })?;

        tracing::debug!(
            table,
            joins = joins.len(),
            bindings = sql_filter.bindings.len(),
            "Compiled SCIM filter"
        );

        Ok(SelectQuery::new(table)
            .joins(joins.iter().map(|j| j.as_ref()))
            .filter(sql_filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scim::filter::CompareOp;

    const JOINS: [&str; 1] = ["LEFT JOIN emails ON emails.user_id = users.id"];

    fn attrs() -> AttributeMap {
        AttributeMap::from_iter([
            ("userName", "users.username"),
            ("emails", "emails.value"),
            ("emails.value", "emails.value"),
            ("emails.type", "emails.type"),
        ])
    }

    fn compile(filter: &str, joins: &[&str]) -> (String, Vec<String>) {
        FilterCompiler::new(filter)
            .unwrap()
            .to_query(&attrs(), "users", joins)
            .unwrap()
            .to_sql()
    }

    #[test]
    fn test_empty_filter() {
        for raw in ["", "   ", "\t\n "] {
            let compiler = FilterCompiler::new(raw).unwrap();
            assert!(compiler.expression().is_none());
            assert_eq!(compiler.raw_filter(), "");

            let (sql, params) = compiler.to_query(&attrs(), "users", &JOINS).unwrap().to_sql();
            assert_eq!(
                sql,
                "SELECT * FROM users LEFT JOIN emails ON emails.user_id = users.id"
            );
            assert!(params.is_empty());
        }
    }

    #[test]
    fn test_empty_filter_ignores_attribute_map() {
        let compiler = FilterCompiler::new("").unwrap();
        let query = compiler
            .to_query(&AttributeMap::new(), "users", &[] as &[&str])
            .unwrap();
        assert_eq!(query.to_sql().0, "SELECT * FROM users");
    }

    #[test]
    fn test_single_equality() {
        let (sql, params) = compile(r#"userName eq "test""#, &[]);
        assert_eq!(sql, "SELECT * FROM users WHERE users.username = ?");
        assert_eq!(params, vec!["test".to_string()]);
    }

    #[test]
    fn test_single_equality_with_join() {
        let (sql, params) = compile(r#"  userName eq "test"  "#, &JOINS);
        assert_eq!(
            sql,
            "SELECT * FROM users LEFT JOIN emails ON emails.user_id = users.id WHERE users.username = ?"
        );
        assert_eq!(params, vec!["test".to_string()]);
    }

    #[test]
    fn test_advanced_query() {
        let (sql, params) = compile(
            r#"emails co "example.org" and (emails.type eq "work" and emails.value co "example.org")"#,
            &JOINS,
        );
        assert_eq!(
            sql,
            "SELECT * FROM users LEFT JOIN emails ON emails.user_id = users.id WHERE (emails.value LIKE %?% AND (emails.type = ? AND emails.value LIKE %?%))"
        );
        assert_eq!(params, vec!["example.org", "work", "example.org"]);
    }

    #[test]
    fn test_not_without_join() {
        let attrs = AttributeMap::new().with("emails", "users.emails");
        let query = FilterCompiler::new(r#"not emails co "example.com""#)
            .unwrap()
            .to_query(&attrs, "users", &[] as &[&str])
            .unwrap();
        let (sql, params) = query.to_sql();
        assert_eq!(sql, "SELECT * FROM users WHERE (NOT users.emails LIKE %?%)");
        assert_eq!(params, vec!["example.com".to_string()]);
    }

    #[test]
    fn test_parse_error_propagates() {
        let err = FilterCompiler::new(r#"userName eq"#).unwrap_err();
        assert_eq!(err, parse_filter("userName eq").unwrap_err());
    }

    #[test]
    fn test_unresolved_attribute_yields_no_query() {
        let compiler = FilterCompiler::new(r#"userName eq "a" or phoneNumbers pr"#).unwrap();
        let err = compiler.to_query(&attrs(), "users", &JOINS).unwrap_err();
        assert_eq!(
            err,
            FilterToSqlError::UnresolvedAttribute("phoneNumbers".to_string())
        );
    }

    #[test]
    fn test_compiles_identically_twice() {
        let compiler =
            FilterCompiler::new(r#"emails sw "a" or (userName ew "b" and emails.type pr)"#)
                .unwrap();
        let map = attrs();
        let first = compiler.to_query(&map, "users", &JOINS).unwrap();
        let second = compiler.to_query(&map, "users", &JOINS).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_sql(), second.to_sql());
    }

    #[test]
    fn test_from_expression() {
        let compiler = FilterCompiler::from_expression(Filter::and(
            Filter::compare("userName", CompareOp::Sw, "j"),
            Filter::present("emails"),
        ));
        assert_eq!(compiler.raw_filter(), "(userName sw \"j\" and emails pr)");
        let (sql, params) = compiler
            .to_query(&attrs(), "users", &[] as &[&str])
            .unwrap()
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE (users.username LIKE ?% AND emails.value IS NOT NULL)"
        );
        assert_eq!(params, vec!["j".to_string()]);
    }

    #[test]
    fn test_from_expression_raw_filter_is_canonical() {
        let parsed = FilterCompiler::new("userName gt 21").unwrap();
        let tree = parsed.expression().unwrap().clone();
        let rebuilt = FilterCompiler::from_expression(tree);

        assert_eq!(parsed.raw_filter(), "userName gt 21");
        assert_eq!(rebuilt.raw_filter(), "userName gt \"21\"");

        let reparsed = FilterCompiler::new(rebuilt.raw_filter()).unwrap();
        assert_eq!(reparsed.expression(), parsed.expression());
        let (sql, params) = rebuilt
            .to_query(&attrs(), "users", &[] as &[&str])
            .unwrap()
            .to_sql();
        assert_eq!(sql, "SELECT * FROM users WHERE users.username > ?");
        assert_eq!(params, vec!["21".to_string()]);
    }

    #[test]
    fn test_with_escape_like() {
        let compiler = FilterCompiler::new(r#"emails ew "_x""#)
            .unwrap()
            .with_options(TranslateOptions { escape_like: true });
        let sql_filter = compiler.to_sql_filter(&attrs()).unwrap();
        assert_eq!(sql_filter.where_clause, "emails.value LIKE %? ESCAPE '\\'");
        assert_eq!(sql_filter.bindings, vec!["\\_x".to_string()]);
    }

    #[test]
    fn test_compiler_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FilterCompiler>();
        assert_send_sync::<AttributeMap>();
        assert_send_sync::<SelectQuery>();
    }
}
