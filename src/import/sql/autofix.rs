//! Repairs for common copy-paste damage in DDL
//!
//! Each repair only touches code outside literals and comments. Repairs are applied
//! until nothing changes, so the result does not depend on the order they run in
//! and running the whole pass again is a no-op.

use super::lexical::{segments, SegmentKind};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A kind of repair the pass can make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// `DECIMAL(15,\n 2)` rejoined to `DECIMAL(15,2)`
    SplitDecimal,
    /// `: :` rejoined to the `::` cast operator
    CastOperator,
    /// `,` directly before a closing parenthesis removed
    TrailingComma,
}

impl Repair {
    pub fn warning(&self) -> &'static str {
        match self {
            Repair::SplitDecimal => "Auto-fixed split DECIMAL: precision and scale rejoined onto one line",
            Repair::CastOperator => "Auto-fixed cast operator: ': :' replaced by '::'",
            Repair::TrailingComma => "Auto-fixed trailing comma before ')'",
        }
    }
}

static SPLIT_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(DECIMAL|NUMERIC|NUMBER|DEC)\s*\(\s*(\d+)\s*,\s*(\d+)\s*\)").expect("valid decimal regex")
});

static SPLIT_CAST: Lazy<Regex> = Lazy::new(|| Regex::new(r":[ \t]+:").expect("valid cast regex"));

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*)\)").expect("valid trailing comma regex"));

const MAX_PASSES: usize = 8;

/// Apply every repair until the text is stable. Returns the repaired text and the
/// distinct repairs that fired, in first-seen order.
pub fn auto_fix(sql: &str) -> (String, Vec<Repair>) {
    let mut text = sql.to_string();
    let mut applied: Vec<Repair> = Vec::new();

    for _ in 0..MAX_PASSES {
        let mut changed = false;
        for repair in [Repair::SplitDecimal, Repair::CastOperator, Repair::TrailingComma] {
            if let Some(next) = apply(&text, repair) {
                text = next;
                changed = true;
                if !applied.contains(&repair) {
                    applied.push(repair);
                }
            }
        }
        if !changed {
            break;
        }
    }
    (text, applied)
}

/// `Some(new_text)` when the repair changed anything
fn apply(sql: &str, repair: Repair) -> Option<String> {
    let mut out = String::with_capacity(sql.len());
    let mut changed = false;

    for segment in segments(sql) {
        if segment.kind != SegmentKind::Code {
            out.push_str(segment.text);
            continue;
        }
        let fixed = match repair {
            Repair::SplitDecimal => SPLIT_DECIMAL.replace_all(segment.text, |caps: &Captures| {
                if caps[0].contains('\n') {
                    format!("{}({},{})", &caps[1], &caps[2], &caps[3])
                } else {
                    caps[0].to_string()
                }
            }),
            Repair::CastOperator => SPLIT_CAST.replace_all(segment.text, "::"),
            Repair::TrailingComma => TRAILING_COMMA.replace_all(segment.text, "$1)"),
        };
        if fixed != segment.text {
            changed = true;
        }
        out.push_str(&fixed);
    }

    changed.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_decimal_is_rejoined() {
        let sql = "CREATE TABLE t (amount DECIMAL(15,\n    2) NOT NULL);";
        let (fixed, repairs) = auto_fix(sql);
        assert_eq!(fixed, "CREATE TABLE t (amount DECIMAL(15,2) NOT NULL);");
        assert_eq!(repairs, vec![Repair::SplitDecimal]);
        assert!(Repair::SplitDecimal.warning().starts_with("Auto-fixed split DECIMAL"));
    }

    #[test]
    fn test_single_line_decimal_untouched() {
        let sql = "CREATE TABLE t (amount numeric(10, 2));";
        let (fixed, repairs) = auto_fix(sql);
        assert_eq!(fixed, sql);
        assert!(repairs.is_empty());
    }

    #[test]
    fn test_cast_and_trailing_comma() {
        let sql = "CREATE TABLE t (\n  id int,\n  d text DEFAULT 'x': :text,\n);";
        let (fixed, repairs) = auto_fix(sql);
        assert_eq!(fixed, "CREATE TABLE t (\n  id int,\n  d text DEFAULT 'x'::text\n);");
        assert_eq!(repairs, vec![Repair::CastOperator, Repair::TrailingComma]);
    }

    #[test]
    fn test_literals_are_not_repaired() {
        let sql = "CREATE TABLE t (note text DEFAULT 'a,)' CHECK (note <> ': :'));";
        let (fixed, repairs) = auto_fix(sql);
        assert_eq!(fixed, sql);
        assert!(repairs.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let sql = "CREATE TABLE t (\n  a DECIMAL(10,\n2,\n),\n  b int,\n);";
        let (once, _) = auto_fix(sql);
        let (twice, repairs) = auto_fix(&once);
        assert_eq!(once, twice);
        assert!(repairs.is_empty());
        assert!(once.contains("DECIMAL(10,2)"));
    }
}
