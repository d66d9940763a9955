//! Compile SCIM filter expressions into parameterized SQL.
//!
//! ```
//! use scim_sql::scim::{AttributeMap, FilterCompiler};
//!
//! let attrs = AttributeMap::new()
//!     .with("userName", "users.username")
//!     .with("emails.value", "emails.value");
//!
//! let query = FilterCompiler::new(r#"userName sw "j" and emails.value co "example.org""#)
//!     .unwrap()
//!     .to_query(&attrs, "users", &["LEFT JOIN emails ON emails.user_id = users.id"])
//!     .unwrap();
//!
//! let (sql, params) = query.to_sql();
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM users LEFT JOIN emails ON emails.user_id = users.id \
//!      WHERE (users.username LIKE ?% AND emails.value LIKE %?%)"
//! );
//! assert_eq!(params, vec!["j", "example.org"]);
//! ```

pub mod config;
#[cfg(feature = "cli")]
pub mod observability;
pub mod scim;
