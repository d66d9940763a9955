//! SCIM 2.0 filter compilation
//!
//! This module turns SCIM filter expressions (as sent by identity providers on
//! `GET /Users?filter=...`) into parameterized SQL `SELECT` queries.
//!
//! ## RFC References
//!
//! - RFC 7644 Section 3.4.2.2: Filtering
//! - RFC 7644 Section 3.12: HTTP Status and Error Response Handling
//!
//! ## Module Structure
//!
//! - [`filter`]: Expression tree and filter string parser
//! - [`attributes`]: Attribute path → column mapping
//! - [`operators`]: SQL operator and LIKE wildcard tables
//! - [`filter_to_sql`]: Recursive WHERE clause translation
//! - [`query`]: SELECT assembly and placeholder styles
//! - [`compiler`]: Entry point tying the above together
//! - [`error`]: SCIM error responses per RFC 7644

pub mod attributes;
pub mod compiler;
pub mod error;
pub mod filter;
pub mod filter_to_sql;
pub mod operators;
pub mod query;

pub use attributes::AttributeMap;
pub use compiler::FilterCompiler;
pub use error::*;
pub use filter::{AttributeExpr, CompareOp, Filter, FilterParseError, LogicalOp, parse_filter};
pub use filter_to_sql::{
    FilterToSqlError, SqlFilter, TranslateOptions, filter_to_sql, filter_to_sql_with,
};
pub use operators::LikePattern;
pub use query::{PlaceholderStyle, SelectQuery, number_placeholders};
