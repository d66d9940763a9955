//! SQL operator tables for SCIM filter tokens.
//!
//! Both tables are `const` match arms over closed enums, so they are shared
//! by every compile call without synchronization and cannot be extended at
//! runtime.

use super::filter::{CompareOp, LogicalOp};

/// Positional placeholder emitted for every bound value.
pub const PLACEHOLDER: &str = "?";

/// Wildcards placed around the placeholder of a `LIKE` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikePattern {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl LikePattern {
    /// Render the placeholder wrapped in this pattern's wildcards (e.g. `%?%`).
    pub fn wrap(&self, placeholder: &str) -> String {
        format!("{}{}{}", self.prefix, placeholder, self.suffix)
    }
}

impl CompareOp {
    /// SQL operator text for this comparator.
    pub const fn sql_operator(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Co | CompareOp::Sw | CompareOp::Ew => "LIKE",
            CompareOp::Pr => "IS NOT NULL",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    /// Wildcard placement for substring comparators; `None` for the rest.
    pub const fn like_pattern(self) -> Option<LikePattern> {
        match self {
            CompareOp::Co => Some(LikePattern {
                prefix: "%",
                suffix: "%",
            }),
            CompareOp::Sw => Some(LikePattern {
                prefix: "",
                suffix: "%",
            }),
            CompareOp::Ew => Some(LikePattern {
                prefix: "%",
                suffix: "",
            }),
            _ => None,
        }
    }

    /// Whether a comparison with this operator binds a value.
    pub const fn takes_value(self) -> bool {
        !matches!(self, CompareOp::Pr)
    }
}

impl LogicalOp {
    /// SQL operator text for this connective.
    pub const fn sql_operator(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::eq(CompareOp::Eq, "=")]
    #[case::ne(CompareOp::Ne, "!=")]
    #[case::co(CompareOp::Co, "LIKE")]
    #[case::sw(CompareOp::Sw, "LIKE")]
    #[case::ew(CompareOp::Ew, "LIKE")]
    #[case::pr(CompareOp::Pr, "IS NOT NULL")]
    #[case::gt(CompareOp::Gt, ">")]
    #[case::ge(CompareOp::Ge, ">=")]
    #[case::lt(CompareOp::Lt, "<")]
    #[case::le(CompareOp::Le, "<=")]
    fn test_compare_operator_text(#[case] op: CompareOp, #[case] expected: &str) {
        assert_eq!(op.sql_operator(), expected);
    }

    #[rstest]
    #[case::and(LogicalOp::And, "AND")]
    #[case::or(LogicalOp::Or, "OR")]
    #[case::not(LogicalOp::Not, "NOT")]
    fn test_logical_operator_text(#[case] op: LogicalOp, #[case] expected: &str) {
        assert_eq!(op.sql_operator(), expected);
    }

    #[rstest]
    #[case::co(CompareOp::Co, "%?%")]
    #[case::sw(CompareOp::Sw, "?%")]
    #[case::ew(CompareOp::Ew, "%?")]
    fn test_like_pattern_wrap(#[case] op: CompareOp, #[case] expected: &str) {
        let pattern = op.like_pattern().unwrap();
        assert_eq!(pattern.wrap(PLACEHOLDER), expected);
    }

    #[test]
    fn test_non_substring_operators_have_no_wildcards() {
        let with_pattern: Vec<_> = CompareOp::ALL
            .into_iter()
            .filter(|op| op.like_pattern().is_some())
            .collect();
        assert_eq!(with_pattern, vec![CompareOp::Co, CompareOp::Sw, CompareOp::Ew]);
    }

    #[test]
    fn test_only_presence_takes_no_value() {
        for op in CompareOp::ALL {
            assert_eq!(op.takes_value(), op != CompareOp::Pr, "{op}");
        }
    }
}
