//! SCIM Filter to SQL Translation
//!
//! This module converts SCIM filter expressions (RFC 7644) to SQL WHERE clause
//! fragments with positional `?` placeholders and an ordered list of bind
//! values.
//!
//! ## Rendering
//!
//! | Filter                 | SQL                       | Bindings     |
//! |------------------------|---------------------------|--------------|
//! | `userName eq "x"`      | `users.username = ?`      | `["x"]`      |
//! | `emails co "x"`        | `emails.value LIKE %?%`   | `["x"]`      |
//! | `emails sw "x"`        | `emails.value LIKE ?%`    | `["x"]`      |
//! | `emails ew "x"`        | `emails.value LIKE %?`    | `["x"]`      |
//! | `title pr`             | `users.title IS NOT NULL` | `[]`         |
//! | `a eq "x" and b eq "y"`| `(a = ? AND b = ?)`       | `["x", "y"]` |
//! | `not a eq "x"`         | `(NOT a = ?)`             | `["x"]`      |
//!
//! Logical nodes are always parenthesized, so operator precedence in the
//! output never depends on the SQL dialect. Bindings follow a depth-first,
//! left-to-right walk of the tree.
//!
//! Substring wildcards are written into the SQL text around the placeholder.
//! The bound value is the raw filter literal. Set
//! [`TranslateOptions::escape_like`] to escape `%`, `_` and `\` inside
//! substring values instead of passing them through as wildcards.
//!
//! ## Errors
//!
//! An attribute path missing from the [`AttributeMap`] is a caller input
//! problem ([`FilterToSqlError::UnresolvedAttribute`]). A logical operator
//! in the wrong node shape (`not` with two operands, `and` with one) can only
//! come from a tree built outside the parser and is reported as
//! [`FilterToSqlError::UnsupportedExpression`]. Both abort the translation;
//! no partial clause is returned.

use super::{
    attributes::AttributeMap,
    filter::{AttributeExpr, Filter, LogicalOp},
    operators::PLACEHOLDER,
};

/// Result of converting a SCIM filter to SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlFilter {
    /// SQL WHERE clause fragment (e.g., "(users.username = ? AND emails.value LIKE %?%)")
    pub where_clause: String,
    /// Bind values in placeholder order
    pub bindings: Vec<String>,
}

impl SqlFilter {
    pub fn is_empty(&self) -> bool {
        self.where_clause.is_empty()
    }
}

/// Errors raised while translating a filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterToSqlError {
    /// The attribute path has no column mapping.
    #[error("Unsupported filter attribute: '{0}'")]
    UnresolvedAttribute(String),

    /// The tree violates the filter grammar contract.
    #[error("Unsupported filter expression: {0}")]
    UnsupportedExpression(String),
}

impl FilterToSqlError {
    /// Whether this error reflects a defect rather than bad caller input.
    pub fn is_internal(&self) -> bool {
        matches!(self, FilterToSqlError::UnsupportedExpression(_))
    }
}

/// Translation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Escape LIKE metacharacters in `co`/`sw`/`ew` values and add an
    /// `ESCAPE '\'` clause.
    pub escape_like: bool,
}

/// Convert a SCIM filter to a SQL WHERE clause fragment.
///
/// # Example
///
/// ```
/// use scim_sql::scim::{AttributeMap, filter_to_sql, parse_filter};
///
/// let attrs = AttributeMap::new().with("userName", "users.username");
/// let filter = parse_filter(r#"userName eq "john""#).unwrap();
/// let sql = filter_to_sql(&filter, &attrs).unwrap();
/// assert_eq!(sql.where_clause, "users.username = ?");
/// assert_eq!(sql.bindings, vec!["john".to_string()]);
/// ```
pub fn filter_to_sql(
    filter: &Filter,
    attributes: &AttributeMap,
) -> Result<SqlFilter, FilterToSqlError> {
    filter_to_sql_with(filter, attributes, TranslateOptions::default())
}

/// [`filter_to_sql`] with explicit [`TranslateOptions`].
pub fn filter_to_sql_with(
    filter: &Filter,
    attributes: &AttributeMap,
    options: TranslateOptions,
) -> Result<SqlFilter, FilterToSqlError> {
    let mut ctx = TranslationContext::new(attributes, options);
    let where_clause = ctx.translate_filter(filter)?;
    Ok(SqlFilter {
        where_clause,
        bindings: ctx.bindings,
    })
}

/// Per-call translation state. Never shared between calls.
struct TranslationContext<'a> {
    attributes: &'a AttributeMap,
    options: TranslateOptions,
    bindings: Vec<String>,
}

impl<'a> TranslationContext<'a> {
    fn new(attributes: &'a AttributeMap, options: TranslateOptions) -> Self {
        Self {
            attributes,
            options,
            bindings: Vec::new(),
        }
    }

    /// Add a binding and return the placeholder.
    fn add_binding(&mut self, value: String) -> &'static str {
        self.bindings.push(value);
        PLACEHOLDER
    }

    fn translate_filter(&mut self, filter: &Filter) -> Result<String, FilterToSqlError> {
        match filter {
            Filter::Attribute(attr) => self.translate_attribute(attr),
            Filter::Binary { op, left, right } => {
                if !op.is_binary() {
                    return Err(unsupported(format!("'{}' used as a binary operator", op)));
                }
                let left_sql = self.translate_filter(left)?;
                let right_sql = self.translate_filter(right)?;
                Ok(format!("({} {} {})", left_sql, op.sql_operator(), right_sql))
            }
            Filter::Unary { op, operand } => {
                if *op != LogicalOp::Not {
                    return Err(unsupported(format!("'{}' used as a unary operator", op)));
                }
                let operand_sql = self.translate_filter(operand)?;
                Ok(format!("({} {})", op.sql_operator(), operand_sql))
            }
        }
    }

    fn translate_attribute(&mut self, attr: &AttributeExpr) -> Result<String, FilterToSqlError> {
        let attributes = self.attributes;
        let column = attributes.resolve(&attr.path)?;
        let op = attr.op;

        if !op.takes_value() {
            return Ok(format!("{} {}", column, op.sql_operator()));
        }

        let sql = match op.like_pattern() {
            Some(pattern) if self.options.escape_like => {
                let placeholder = self.add_binding(escape_like_pattern(&attr.value));
                format!(
                    "{} {} {} ESCAPE '\\'",
                    column,
                    op.sql_operator(),
                    pattern.wrap(placeholder)
                )
            }
            Some(pattern) => {
                let placeholder = self.add_binding(attr.value.clone());
                format!("{} {} {}", column, op.sql_operator(), pattern.wrap(placeholder))
            }
            None => {
                let placeholder = self.add_binding(attr.value.clone());
                format!("{} {} {}", column, op.sql_operator(), placeholder)
            }
        };

        Ok(sql)
    }
}

fn unsupported(detail: String) -> FilterToSqlError {
    tracing::error!(detail = %detail, "Filter tree violates grammar contract");
    FilterToSqlError::UnsupportedExpression(detail)
}

/// Escape special characters in LIKE patterns.
/// Escapes: %, _, and \
fn escape_like_pattern(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::scim::filter::{CompareOp, parse_filter};

    fn attrs() -> AttributeMap {
        AttributeMap::from_iter([
            ("userName", "users.username"),
            ("title", "users.title"),
            ("emails", "emails.value"),
            ("emails.value", "emails.value"),
            ("emails.type", "emails.type"),
            ("a", "t.a"),
            ("b", "t.b"),
            ("c", "t.c"),
        ])
    }

    fn translate(filter_str: &str) -> Result<SqlFilter, FilterToSqlError> {
        let filter = parse_filter(filter_str).expect("Failed to parse filter");
        filter_to_sql(&filter, &attrs())
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_equality() {
        let result = translate(r#"userName eq "test""#).unwrap();
        assert_eq!(result.where_clause, "users.username = ?");
        assert_eq!(result.bindings, strings(&["test"]));
    }

    #[rstest]
    #[case::eq(r#"userName eq "x""#, "users.username = ?")]
    #[case::ne(r#"userName ne "x""#, "users.username != ?")]
    #[case::gt(r#"userName gt "x""#, "users.username > ?")]
    #[case::ge(r#"userName ge "x""#, "users.username >= ?")]
    #[case::lt(r#"userName lt "x""#, "users.username < ?")]
    #[case::le(r#"userName le "x""#, "users.username <= ?")]
    fn test_scalar_comparators(#[case] filter: &str, #[case] expected: &str) {
        let result = translate(filter).unwrap();
        assert_eq!(result.where_clause, expected);
        assert_eq!(result.bindings, strings(&["x"]));
    }

    #[rstest]
    #[case::contains(r#"emails co "example.org""#, "emails.value LIKE %?%")]
    #[case::starts_with(r#"emails sw "example.org""#, "emails.value LIKE ?%")]
    #[case::ends_with(r#"emails ew "example.org""#, "emails.value LIKE %?")]
    fn test_substring_wildcards_surround_placeholder(
        #[case] filter: &str,
        #[case] expected: &str,
    ) {
        let result = translate(filter).unwrap();
        assert_eq!(result.where_clause, expected);
        // Wildcards never leak into the bound value
        assert_eq!(result.bindings, strings(&["example.org"]));
    }

    #[test]
    fn test_presence_binds_nothing() {
        let result = translate("title pr").unwrap();
        assert_eq!(result.where_clause, "users.title IS NOT NULL");
        assert!(result.bindings.is_empty());
    }

    #[test]
    fn test_nested_composition() {
        let result = translate(r#"a co "x" and (b eq "y" and c co "z")"#).unwrap();
        assert_eq!(
            result.where_clause,
            "(t.a LIKE %?% AND (t.b = ? AND t.c LIKE %?%))"
        );
        assert_eq!(result.bindings, strings(&["x", "y", "z"]));
    }

    #[test]
    fn test_advanced_email_query() {
        let result = translate(
            r#"emails co "example.org" and (emails.type eq "work" and emails.value co "example.org")"#,
        )
        .unwrap();
        assert_eq!(
            result.where_clause,
            "(emails.value LIKE %?% AND (emails.type = ? AND emails.value LIKE %?%))"
        );
        assert_eq!(
            result.bindings,
            strings(&["example.org", "work", "example.org"])
        );
    }

    #[test]
    fn test_left_nested_order() {
        let result = translate(r#"(a eq "1" or b eq "2") and c eq "3""#).unwrap();
        assert_eq!(result.where_clause, "((t.a = ? OR t.b = ?) AND t.c = ?)");
        assert_eq!(result.bindings, strings(&["1", "2", "3"]));
    }

    #[test]
    fn test_unary_negation() {
        let result = translate(r#"not a co "x""#).unwrap();
        assert_eq!(result.where_clause, "(NOT t.a LIKE %?%)");
        assert_eq!(result.bindings, strings(&["x"]));
    }

    #[test]
    fn test_negated_group() {
        let result = translate(r#"not (a eq "x" or title pr)"#).unwrap();
        assert_eq!(result.where_clause, "(NOT (t.a = ? OR users.title IS NOT NULL))");
        assert_eq!(result.bindings, strings(&["x"]));
    }

    #[test]
    fn test_binding_count_matches_placeholders() {
        let filter =
            parse_filter(r#"a eq "1" and (title pr or not (b sw "2" and c ew "3"))"#).unwrap();
        let result = filter_to_sql(&filter, &attrs()).unwrap();
        assert_eq!(result.where_clause.matches('?').count(), result.bindings.len());
        assert_eq!(filter.binding_count(), result.bindings.len());
    }

    #[test]
    fn test_unresolved_attribute() {
        let err = translate(r#"unknownAttr eq "value""#).unwrap_err();
        assert_eq!(
            err,
            FilterToSqlError::UnresolvedAttribute("unknownAttr".to_string())
        );
        assert!(!err.is_internal());
    }

    #[test]
    fn test_unresolved_attribute_aborts_whole_filter() {
        let err = translate(r#"userName eq "john" and members eq "user-123""#).unwrap_err();
        assert_eq!(
            err,
            FilterToSqlError::UnresolvedAttribute("members".to_string())
        );
    }

    #[test]
    fn test_attribute_lookup_is_case_sensitive() {
        assert!(translate(r#"USERNAME eq "john""#).is_err());
    }

    #[test]
    fn test_value_passed_through_verbatim() {
        let result = translate(r#"a co "100%_off""#).unwrap();
        assert_eq!(result.bindings, strings(&["100%_off"]));

        let result = translate(r#"a eq "x' OR '1'='1""#).unwrap();
        assert_eq!(result.where_clause, "t.a = ?");
        assert_eq!(result.bindings, strings(&["x' OR '1'='1"]));
    }

    #[test]
    fn test_escape_like_option() {
        let filter = parse_filter(r#"a co "100%_off" and b eq "50%""#).unwrap();
        let options = TranslateOptions { escape_like: true };
        let result = filter_to_sql_with(&filter, &attrs(), options).unwrap();
        assert_eq!(
            result.where_clause,
            "(t.a LIKE %?% ESCAPE '\\' AND t.b = ?)"
        );
        // Only substring comparisons are escaped
        assert_eq!(result.bindings, strings(&["100\\%\\_off", "50%"]));
    }

    #[test]
    fn test_not_as_binary_operator_is_internal_error() {
        let filter = Filter::Binary {
            op: LogicalOp::Not,
            left: Box::new(Filter::compare("a", CompareOp::Eq, "x")),
            right: Box::new(Filter::compare("b", CompareOp::Eq, "y")),
        };
        let err = filter_to_sql(&filter, &attrs()).unwrap_err();
        assert!(matches!(err, FilterToSqlError::UnsupportedExpression(_)));
        assert!(err.is_internal());
    }

    #[test]
    fn test_and_as_unary_operator_is_internal_error() {
        let filter = Filter::Unary {
            op: LogicalOp::And,
            operand: Box::new(Filter::present("title")),
        };
        let err = filter_to_sql(&filter, &attrs()).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_long_flat_chain_compiles() {
        // Flat and/or chains are not bounded by the nesting depth limit
        let input = vec!["a pr"; 400].join(" or ");
        let result = translate(&input).unwrap();
        assert_eq!(result.where_clause.matches("IS NOT NULL").count(), 400);
        assert_eq!(result.where_clause.matches(" OR ").count(), 399);
        assert!(result.bindings.is_empty());
    }

    #[test]
    fn test_translation_is_deterministic() {
        let filter = parse_filter(r#"a co "x" or (b eq "y" and not c sw "z")"#).unwrap();
        let map = attrs();
        let first = filter_to_sql(&filter, &map).unwrap();
        let second = filter_to_sql(&filter, &map).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_escape_like_pattern() {
        assert_eq!(escape_like_pattern("hello"), "hello");
        assert_eq!(escape_like_pattern("100%"), "100\\%");
        assert_eq!(escape_like_pattern("foo_bar"), "foo\\_bar");
        assert_eq!(escape_like_pattern("a\\b"), "a\\\\b");
        assert_eq!(escape_like_pattern("a%_\\b"), "a\\%\\_\\\\b");
    }
}
