//! Engine-neutral column type

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static TYPE_PARTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>[^()]+?)\s*(?:\((?P<args>[^()]*)\))?(?P<suffix>(?:\s+[^()]*)?)$")
        .expect("valid type regex")
});

static ARRAY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s*\[\s*\d*\s*\])+\s*$").expect("valid array regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Column type: a lower-case type id plus the numeric arguments the engine accepts.
///
/// Ids are folded through a small alias table (`integer` and `int4` become `int`,
/// `character varying` becomes `varchar`, ...) so that identical types coming from
/// different front-ends compare equal. Anything not in the alias table is kept as
/// written, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataType {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

/// Result of [`DataType::parse_detailed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    pub data_type: DataType,
    /// The raw type carried a trailing `[]`, which the canonical model cannot express
    pub is_array: bool,
}

impl DataType {
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self {
            id: canonical_id(&normalize_spaces(&id.to_lowercase())),
            length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    /// Parse a raw engine type such as `DECIMAL(15, 2)` or `character varying(255)`
    pub fn parse(raw: &str) -> Self {
        Self::parse_detailed(raw).data_type
    }

    pub fn parse_detailed(raw: &str) -> ParsedType {
        let trimmed = raw.trim();
        let is_array = ARRAY_SUFFIX.is_match(trimmed);
        let without_array = ARRAY_SUFFIX.replace(trimmed, "");
        let text = normalize_spaces(&without_array);

        let Some(caps) = TYPE_PARTS.captures(&text) else {
            return ParsedType {
                data_type: DataType::new(text.as_str()),
                is_array,
            };
        };

        let base = caps.name("base").map(|m| m.as_str()).unwrap_or_default();
        let suffix = caps.name("suffix").map(|m| m.as_str().trim()).unwrap_or_default();
        let args = caps.name("args").map(|m| m.as_str().trim());

        let name = if suffix.is_empty() {
            base.to_string()
        } else {
            format!("{} {}", base, suffix)
        };

        let mut data_type = DataType::new(name.as_str());
        if let Some(args) = args {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            let numbers: Option<Vec<u32>> = parts
                .iter()
                .filter(|p| !p.eq_ignore_ascii_case("max"))
                .map(|p| p.parse::<u32>().ok())
                .collect();
            match numbers {
                Some(numbers) => data_type.apply_arguments(&numbers),
                // Non-numeric arguments (enum('a','b'), Nullable(String), ...) stay part of the id
                None => data_type = DataType::new(text.as_str()),
            }
        }

        ParsedType {
            data_type,
            is_array,
        }
    }

    fn apply_arguments(&mut self, numbers: &[u32]) {
        match numbers {
            [] => {}
            [first] if self.takes_precision() => self.precision = Some(*first),
            [first] => self.length = Some(*first),
            [precision, scale, ..] => {
                self.precision = Some(*precision);
                self.scale = Some(*scale);
            }
        }
    }

    fn takes_precision(&self) -> bool {
        is_exact_numeric(&self.id)
            || matches!(
                self.id.as_str(),
                "float" | "real" | "double" | "datetime" | "datetime2" | "datetimeoffset" | "interval"
            )
            || self.id.starts_with("time")
    }

    pub fn is_exact_numeric(&self) -> bool {
        is_exact_numeric(&self.id)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        match (self.length, self.precision, self.scale) {
            (Some(length), _, _) => write!(f, "({})", length),
            (None, Some(p), Some(s)) => write!(f, "({},{})", p, s),
            (None, Some(p), None) => write!(f, "({})", p),
            _ => Ok(()),
        }
    }
}

fn is_exact_numeric(id: &str) -> bool {
    matches!(id, "decimal" | "numeric" | "number")
}

fn normalize_spaces(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

fn canonical_id(id: &str) -> String {
    let folded = match id {
        "integer" | "int4" => "int",
        "int8" => "bigint",
        "int2" => "smallint",
        "dec" => "decimal",
        "character varying" | "varchar2" => "varchar",
        "nvarchar2" => "nvarchar",
        "character" => "char",
        "bool" => "boolean",
        "float8" | "double precision" => "double",
        "float4" => "real",
        "timestamptz" => "timestamp with time zone",
        "timetz" => "time with time zone",
        "timestamp without time zone" => "timestamp",
        "time without time zone" => "time",
        other => other,
    };
    folded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_with_precision_and_scale() {
        let dt = DataType::parse("DECIMAL(15, 2)");
        assert_eq!(dt.id, "decimal");
        assert_eq!(dt.precision, Some(15));
        assert_eq!(dt.scale, Some(2));
        assert_eq!(dt.length, None);
        assert_eq!(dt.to_string(), "decimal(15,2)");
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(DataType::parse("INTEGER").id, "int");
        assert_eq!(DataType::parse("int4").id, "int");
        assert_eq!(DataType::parse("NUMERIC(10,0)").id, "numeric");

        let dt = DataType::parse("character varying(255)");
        assert_eq!(dt.id, "varchar");
        assert_eq!(dt.length, Some(255));
    }

    #[test]
    fn test_parse_suffix_after_arguments() {
        let dt = DataType::parse("timestamp(3) with time zone");
        assert_eq!(dt.id, "timestamp with time zone");
        assert_eq!(dt.precision, Some(3));

        let dt = DataType::parse("int(11) unsigned");
        assert_eq!(dt.id, "int unsigned");
        assert_eq!(dt.length, Some(11));
    }

    #[test]
    fn test_parse_max_length() {
        let dt = DataType::parse("NVARCHAR(MAX)");
        assert_eq!(dt.id, "nvarchar");
        assert_eq!(dt.length, None);
    }

    #[test]
    fn test_parse_array_is_reported() {
        let parsed = DataType::parse_detailed("text[]");
        assert!(parsed.is_array);
        assert_eq!(parsed.data_type.id, "text");

        let parsed = DataType::parse_detailed("int");
        assert!(!parsed.is_array);
    }

    #[test]
    fn test_parse_non_numeric_arguments_kept_in_id() {
        let dt = DataType::parse("enum('a','b')");
        assert_eq!(dt.id, "enum('a','b')");
        assert_eq!(dt.length, None);
    }
}
