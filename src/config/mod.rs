//! Configuration for the filter compiler.
//!
//! Resources are described in a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [observability.logging]
//! level = "debug"
//!
//! [resources.users]
//! table = "${SCIM_SCHEMA}.users"
//! joins = ["LEFT JOIN emails ON emails.user_id = users.id"]
//! placeholder = "dollar"
//!
//! [resources.users.attributes]
//! userName = "users.username"
//! "emails.value" = "emails.value"
//! ```

mod observability;

use std::{collections::BTreeMap, path::Path, sync::LazyLock};

pub use observability::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scim::{
    AttributeMap, FilterCompiler, FilterParseError, FilterToSqlError, PlaceholderStyle,
    ScimErrorResponse, SelectQuery, TranslateOptions,
};

/// Root configuration.
///
/// Only `resources` is required; every other section has defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Queryable resources keyed by name (e.g. "users", "groups").
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl CompilerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: CompilerConfig = toml::from_str(&expanded)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.resources.is_empty() {
            return Err(ConfigError::Validation(
                "At least one [resources.<name>] section is required".to_string(),
            ));
        }

        for (name, resource) in &self.resources {
            resource
                .validate()
                .map_err(|msg| ConfigError::Validation(format!("resources.{}: {}", name, msg)))?;
        }

        Ok(())
    }

    /// Look up a resource by name.
    pub fn resource(&self, name: &str) -> Result<&ResourceConfig, ConfigError> {
        self.resources
            .get(name)
            .ok_or_else(|| ConfigError::UnknownResource(name.to_string()))
    }

    #[cfg(feature = "json-schema")]
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(CompilerConfig)
    }
}

/// A single queryable resource: base table, joins and attribute mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Base table for `SELECT * FROM <table>`.
    pub table: String,

    /// JOIN clauses appended verbatim, in order.
    #[serde(default)]
    pub joins: Vec<String>,

    /// SCIM attribute path → SQL column.
    #[serde(default)]
    pub attributes: AttributeMap,

    /// Placeholder style for the rendered SQL.
    #[serde(default)]
    pub placeholder: PlaceholderStyle,

    /// Escape `%`, `_` and `\` in `co`/`sw`/`ew` values.
    #[serde(default)]
    pub escape_like: bool,
}

impl ResourceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.table.trim().is_empty() {
            return Err("table must not be empty".to_string());
        }
        if self.attributes.is_empty() {
            return Err("at least one attribute mapping is required".to_string());
        }
        for (path, column) in self.attributes.iter() {
            if path.trim().is_empty() {
                return Err("attribute paths must not be empty".to_string());
            }
            if column.trim().is_empty() {
                return Err(format!("attribute '{}' maps to an empty column", path));
            }
            // Dollar numbering rewrites every '?' in the WHERE text
            if self.placeholder == PlaceholderStyle::Dollar && column.contains('?') {
                return Err(format!(
                    "attribute '{}' maps to a column containing '?', which cannot be used with dollar placeholders",
                    path
                ));
            }
        }
        if let Some(pos) = self.joins.iter().position(|j| j.trim().is_empty()) {
            return Err(format!("joins[{}] must not be empty", pos));
        }
        Ok(())
    }

    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            escape_like: self.escape_like,
        }
    }

    /// Parse and compile a raw filter against this resource.
    pub fn compile(&self, raw_filter: &str) -> Result<SelectQuery, CompileError> {
        let compiler = FilterCompiler::new(raw_filter)?.with_options(self.translate_options());
        Ok(compiler.to_query(&self.attributes, &self.table, &self.joins)?)
    }

    /// Parse, compile and render a raw filter with this resource's placeholder style.
    pub fn render(&self, raw_filter: &str) -> Result<(String, Vec<String>), CompileError> {
        Ok(self.compile(raw_filter)?.to_sql_with(self.placeholder, 1))
    }
}

/// Failure to compile a filter for a configured resource.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Invalid filter: {0}")]
    Parse(#[from] FilterParseError),

    #[error(transparent)]
    Translate(#[from] FilterToSqlError),
}

impl From<CompileError> for ScimErrorResponse {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::Parse(e) => e.into(),
            CompileError::Translate(e) => e.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Unknown resource: '{0}'")]
    UnknownResource(String),
}

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"));

/// Expand `${VAR}` references. References after a `#` on the same line are
/// left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut last_end = 0;
        for cap in ENV_VAR_RE.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
