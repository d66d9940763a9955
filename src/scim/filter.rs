//! SCIM 2.0 Filter Expressions
//!
//! This module defines the filter expression tree consumed by the SQL
//! compiler, together with a parser for SCIM filter strings per RFC 7644
//! Section 3.4.2.2.
//!
//! ## Grammar (simplified)
//!
//! ```text
//! filter     = orExpr
//! orExpr     = andExpr { "or" andExpr }
//! andExpr    = notExpr { "and" notExpr }
//! notExpr    = "not" notExpr | "(" filter ")" | attrExpr
//! attrExpr   = attrPath "pr" | attrPath compareOp compValue
//! attrPath   = ATTRNAME { "." ATTRNAME }
//! compareOp  = "eq" | "ne" | "co" | "sw" | "ew" | "gt" | "ge" | "lt" | "le"
//! compValue  = "true" | "false" | "null" | NUMBER | STRING
//! ```
//!
//! ## Examples
//!
//! ```text
//! userName eq "john"
//! emails.value co "example.org"
//! userName eq "john" and (emails.type eq "work" or active eq true)
//! not emails co "example.com"
//! not (title pr)
//! ```
//!
//! ## Security Limits
//!
//! To prevent DoS attacks from malicious filter expressions:
//! - Maximum filter length: 4096 bytes
//! - Maximum nesting depth: 32 levels

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum allowed length of a SCIM filter expression (bytes).
pub const MAX_FILTER_LENGTH: usize = 4096;

/// Maximum allowed nesting depth of a SCIM filter expression.
///
/// Counts parentheses and `not` only. Flat `and`/`or` chains build a
/// left-leaning tree whose height is bounded by [`MAX_FILTER_LENGTH`]
/// instead.
pub const MAX_FILTER_DEPTH: usize = 32;

/// A parsed SCIM filter expression.
///
/// The tree is immutable once built. Leaves always carry a [`CompareOp`],
/// internal nodes always carry a [`LogicalOp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Attribute comparison (e.g., `userName eq "john"` or `title pr`)
    Attribute(AttributeExpr),
    /// Two sub-expressions joined by `and` / `or`
    Binary {
        op: LogicalOp,
        left: Box<Filter>,
        right: Box<Filter>,
    },
    /// A single negated sub-expression
    Unary { op: LogicalOp, operand: Box<Filter> },
}

impl Filter {
    /// Build an attribute comparison leaf.
    pub fn compare(path: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Filter::Attribute(AttributeExpr {
            path: path.into(),
            op,
            value: value.into(),
        })
    }

    /// Build a presence check leaf (`<path> pr`).
    pub fn present(path: impl Into<String>) -> Self {
        Filter::Attribute(AttributeExpr {
            path: path.into(),
            op: CompareOp::Pr,
            value: String::new(),
        })
    }

    pub fn and(left: Filter, right: Filter) -> Self {
        Filter::Binary {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Filter, right: Filter) -> Self {
        Filter::Binary {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Filter) -> Self {
        Filter::Unary {
            op: LogicalOp::Not,
            operand: Box::new(operand),
        }
    }

    /// Number of attribute leaves that bind a value (every leaf except `pr`).
    pub fn binding_count(&self) -> usize {
        match self {
            Filter::Attribute(attr) => usize::from(attr.op != CompareOp::Pr),
            Filter::Binary { left, right, .. } => left.binding_count() + right.binding_count(),
            Filter::Unary { operand, .. } => operand.binding_count(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Attribute(attr) => write!(f, "{}", attr),
            Filter::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Filter::Unary { op, operand } => write!(f, "{} ({})", op, operand),
        }
    }
}

/// A single attribute comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeExpr {
    /// Dotted attribute path as written in the filter (e.g., "emails.value")
    pub path: String,
    /// Comparison operator
    pub op: CompareOp,
    /// Literal comparison value. Empty for `pr`.
    pub value: String,
}

impl fmt::Display for AttributeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op == CompareOp::Pr {
            write!(f, "{} pr", self.path)
        } else {
            write!(
                f,
                "{} {} \"{}\"",
                self.path,
                self.op,
                self.value.replace('\\', "\\\\").replace('"', "\\\"")
            )
        }
    }
}

/// Comparison operators per RFC 7644.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Contains
    Co,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    /// Present (has value)
    Pr,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
}

impl CompareOp {
    pub const ALL: [CompareOp; 10] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Co,
        CompareOp::Sw,
        CompareOp::Ew,
        CompareOp::Pr,
        CompareOp::Gt,
        CompareOp::Ge,
        CompareOp::Lt,
        CompareOp::Le,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Co => "co",
            CompareOp::Sw => "sw",
            CompareOp::Ew => "ew",
            CompareOp::Pr => "pr",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        }
    }

    fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical operators combining sub-expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Not => "not",
        }
    }

    /// Whether the operator joins two operands (`and`, `or`).
    pub const fn is_binary(self) -> bool {
        matches!(self, LogicalOp::And | LogicalOp::Or)
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter parsing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct FilterParseError {
    pub message: String,
    pub position: usize,
}

impl FilterParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Parse a SCIM filter expression.
///
/// # Errors
///
/// Returns an error if:
/// - The filter exceeds [`MAX_FILTER_LENGTH`] bytes
/// - The filter exceeds [`MAX_FILTER_DEPTH`] nesting levels
/// - The filter has invalid syntax
///
/// # Examples
///
/// ```
/// use scim_sql::scim::filter::parse_filter;
///
/// let filter = parse_filter("userName eq \"john\"").unwrap();
/// let filter = parse_filter("active eq true and emails pr").unwrap();
/// ```
pub fn parse_filter(input: &str) -> Result<Filter, FilterParseError> {
    if input.len() > MAX_FILTER_LENGTH {
        return Err(FilterParseError::new(
            format!(
                "Filter exceeds maximum length ({} bytes, max {})",
                input.len(),
                MAX_FILTER_LENGTH
            ),
            0,
        ));
    }

    let mut parser = Parser::new(input);
    let filter = parser.parse_filter()?;

    // Ensure we consumed all input
    parser.skip_whitespace();
    if parser.position < parser.input.len() {
        return Err(FilterParseError::new(
            format!("Unexpected input: '{}'", &parser.input[parser.position..]),
            parser.position,
        ));
    }

    Ok(filter)
}

// =============================================================================
// Parser Implementation
// =============================================================================

struct Parser<'a> {
    input: &'a str,
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            depth: 0,
        }
    }

    /// Enter a nested scope (parentheses or `not`).
    fn enter_scope(&mut self) -> Result<(), FilterParseError> {
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(FilterParseError::new(
                format!(
                    "Filter exceeds maximum nesting depth ({})",
                    MAX_FILTER_DEPTH
                ),
                self.position,
            ));
        }
        Ok(())
    }

    fn exit_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterParseError> {
        self.parse_or_expr()
    }

    // orExpr = andExpr { "or" andExpr }
    fn parse_or_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_and_expr()?;

        while self.try_keyword("or") {
            let right = self.parse_and_expr()?;
            left = Filter::or(left, right);
        }

        Ok(left)
    }

    // andExpr = notExpr { "and" notExpr }
    fn parse_and_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_not_expr()?;

        while self.try_keyword("and") {
            let right = self.parse_not_expr()?;
            left = Filter::and(left, right);
        }

        Ok(left)
    }

    // notExpr = "not" notExpr | "(" filter ")" | attrExpr
    fn parse_not_expr(&mut self) -> Result<Filter, FilterParseError> {
        self.skip_whitespace();

        if self.try_keyword("not") {
            self.enter_scope()?;
            let operand = self.parse_not_expr()?;
            self.exit_scope();
            return Ok(Filter::not(operand));
        }

        if self.try_char('(') {
            self.enter_scope()?;
            let inner = self.parse_filter()?;
            self.exit_scope();
            self.skip_whitespace();
            if !self.try_char(')') {
                return Err(FilterParseError::new(
                    "Expected ')' to close grouped expression",
                    self.position,
                ));
            }
            return Ok(inner);
        }

        self.parse_attr_expr()
    }

    // attrExpr = attrPath "pr" | attrPath compareOp compValue
    fn parse_attr_expr(&mut self) -> Result<Filter, FilterParseError> {
        let path = self.parse_attr_path()?;

        let op = self.parse_compare_op()?;
        if op == CompareOp::Pr {
            return Ok(Filter::present(path));
        }

        let value = self.parse_value()?;

        Ok(Filter::compare(path, op, value))
    }

    // attrPath = ATTRNAME { "." ATTRNAME }
    fn parse_attr_path(&mut self) -> Result<String, FilterParseError> {
        self.skip_whitespace();

        let start = self.position;
        self.parse_attr_name(true)?;
        while self.try_char('.') {
            self.parse_attr_name(false)?;
        }

        if self.peek() == Some('[') {
            return Err(FilterParseError::new(
                "Value filters are not supported",
                self.position,
            ));
        }

        Ok(self.input[start..self.position].to_string())
    }

    /// Leading names must start with a letter; later segments may start with a
    /// digit (the "2.0" in `urn:...:core:2.0:User:userName`).
    fn parse_attr_name(&mut self, leading: bool) -> Result<(), FilterParseError> {
        let valid_start = |c: char| c.is_ascii_alphabetic() || (!leading && c.is_ascii_digit());
        if !self.peek().is_some_and(valid_start) {
            return Err(FilterParseError::new(
                "Expected attribute name",
                self.position,
            ));
        }

        while self.peek().is_some_and(is_attr_name_char) {
            self.advance();
        }

        Ok(())
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, FilterParseError> {
        self.skip_whitespace();

        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }

        let op_str = &self.input[start..self.position];
        if op_str.is_empty() {
            return Err(FilterParseError::new("Expected operator", start));
        }

        CompareOp::from_keyword(op_str)
            .ok_or_else(|| FilterParseError::new(format!("Unknown operator: '{}'", op_str), start))
    }

    fn parse_value(&mut self) -> Result<String, FilterParseError> {
        self.skip_whitespace();

        if self.peek() == Some('"') {
            return self.parse_string_value();
        }

        for keyword in ["true", "false", "null"] {
            if self.try_keyword(keyword) {
                return Ok(keyword.to_string());
            }
        }

        if self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
        {
            return self.parse_number_value();
        }

        Err(FilterParseError::new(
            "Expected value (string, boolean, number, or null)",
            self.position,
        ))
    }

    fn parse_string_value(&mut self) -> Result<String, FilterParseError> {
        if !self.try_char('"') {
            return Err(FilterParseError::new(
                "Expected '\"' to start string",
                self.position,
            ));
        }

        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    return Err(FilterParseError::new("Unterminated string", self.position));
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        _ => {
                            return Err(FilterParseError::new(
                                "Invalid escape sequence",
                                self.position,
                            ));
                        }
                    };
                    value.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(value)
    }

    /// Numbers are validated but kept as written; the bound parameter is text.
    fn parse_number_value(&mut self) -> Result<String, FilterParseError> {
        let start = self.position;

        if self.peek() == Some('-') || self.peek() == Some('+') {
            self.advance();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek() == Some('-') || self.peek() == Some('+') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.position];
        match num_str.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(num_str.to_string()),
            _ => Err(FilterParseError::new(
                format!("Invalid number: '{}'", num_str),
                start,
            )),
        }
    }

    // Helper methods

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn try_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();

        let remaining = &self.input[self.position..];

        if remaining
            .get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
        {
            // Make sure keyword is not part of a larger identifier
            let after_keyword = remaining[keyword.len()..].chars().next();
            if after_keyword.is_none_or(|c| !(is_attr_name_char(c) || c == '.')) {
                self.position += keyword.len();
                return true;
            }
        }

        false
    }
}

/// Characters allowed after the first one in an attribute name segment.
/// URN-qualified names carry ':' segments and version digits.
fn is_attr_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '$')
}

// =============================================================================
// Tests
// =============================================================================
