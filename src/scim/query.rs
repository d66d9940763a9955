//! SELECT query assembly.
//!
//! A [`SelectQuery`] combines a base table, caller-supplied JOIN clauses and
//! an optional [`SqlFilter`] into `SELECT * FROM <table> [<join> ...] [WHERE
//! <clause>]`. Join clauses are trusted, pre-validated SQL and are emitted
//! verbatim in the order they were added.

use serde::{Deserialize, Serialize};

use super::filter_to_sql::SqlFilter;

/// How bind placeholders are written in the final SQL text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// Positional `?` (SQLite, MySQL).
    #[default]
    Question,
    /// Numbered `$1`, `$2`, ... (PostgreSQL).
    Dollar,
}

/// Rewrite `?` placeholders as `$N`, numbering from `first_index`.
///
/// Every `?` in `clause` is treated as a placeholder, so the column references
/// inside it must not contain a literal `?`.
pub fn number_placeholders(clause: &str, first_index: usize) -> String {
    let mut numbered = String::with_capacity(clause.len() + 8);
    let mut param_idx = first_index;
    for ch in clause.chars() {
        if ch == '?' {
            numbered.push('$');
            numbered.push_str(&param_idx.to_string());
            param_idx += 1;
        } else {
            numbered.push(ch);
        }
    }
    numbered
}

/// A compiled `SELECT` over one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectQuery {
    table: String,
    joins: Vec<String>,
    where_clause: String,
    bindings: Vec<String>,
}

impl SelectQuery {
    /// Start an unconditional `SELECT * FROM <table>`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            joins: Vec::new(),
            where_clause: String::new(),
            bindings: Vec::new(),
        }
    }

    /// Append a JOIN clause.
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    /// Append JOIN clauses in iteration order.
    pub fn joins<I, S>(mut self, clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.joins.extend(clauses.into_iter().map(Into::into));
        self
    }

    /// Set the WHERE fragment. An empty fragment leaves the query unconditional.
    pub fn filter(mut self, filter: SqlFilter) -> Self {
        self.where_clause = filter.where_clause;
        self.bindings = filter.bindings;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn join_clauses(&self) -> &[String] {
        &self.joins
    }

    pub fn where_clause(&self) -> &str {
        &self.where_clause
    }

    pub fn bindings(&self) -> &[String] {
        &self.bindings
    }

    /// Render with `?` placeholders.
    pub fn to_sql(&self) -> (String, Vec<String>) {
        self.to_sql_with(PlaceholderStyle::Question, 1)
    }

    /// Render with the given placeholder style. `first_index` is the number of
    /// the first `$N` placeholder and is ignored for `?`.
    pub fn to_sql_with(&self, style: PlaceholderStyle, first_index: usize) -> (String, Vec<String>) {
        let mut sql = format!("SELECT * FROM {}", self.table);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            match style {
                PlaceholderStyle::Question => sql.push_str(&self.where_clause),
                PlaceholderStyle::Dollar => {
                    sql.push_str(&number_placeholders(&self.where_clause, first_index))
                }
            }
        }

        (sql, self.bindings.clone())
    }
}
