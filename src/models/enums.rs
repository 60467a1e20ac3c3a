//! Enumerations shared by the canonical model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Database engine a diagram targets
///
/// The set is closed: every importer dispatches on it with a `match`, so adding an
/// engine means touching each front-end explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Generic,
    PostgreSql,
    MySql,
    MariaDb,
    Sqlite,
    SqlServer,
    Oracle,
    ClickHouse,
    CockroachDb,
}

impl DatabaseType {
    pub const ALL: [DatabaseType; 9] = [
        DatabaseType::Generic,
        DatabaseType::PostgreSql,
        DatabaseType::MySql,
        DatabaseType::MariaDb,
        DatabaseType::Sqlite,
        DatabaseType::SqlServer,
        DatabaseType::Oracle,
        DatabaseType::ClickHouse,
        DatabaseType::CockroachDb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::Generic => "generic",
            DatabaseType::PostgreSql => "postgresql",
            DatabaseType::MySql => "mysql",
            DatabaseType::MariaDb => "mariadb",
            DatabaseType::Sqlite => "sqlite",
            DatabaseType::SqlServer => "sqlserver",
            DatabaseType::Oracle => "oracle",
            DatabaseType::ClickHouse => "clickhouse",
            DatabaseType::CockroachDb => "cockroachdb",
        }
    }

    /// Schema an unqualified object lands in, when the engine has one
    pub fn default_schema(&self) -> Option<&'static str> {
        match self {
            DatabaseType::PostgreSql | DatabaseType::CockroachDb => Some("public"),
            DatabaseType::SqlServer => Some("dbo"),
            DatabaseType::Sqlite => Some("main"),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generic" | "" => Ok(DatabaseType::Generic),
            "postgres" | "postgresql" | "pg" => Ok(DatabaseType::PostgreSql),
            "mysql" => Ok(DatabaseType::MySql),
            "mariadb" => Ok(DatabaseType::MariaDb),
            "sqlite" => Ok(DatabaseType::Sqlite),
            "sqlserver" | "mssql" | "sql_server" => Ok(DatabaseType::SqlServer),
            "oracle" => Ok(DatabaseType::Oracle),
            "clickhouse" => Ok(DatabaseType::ClickHouse),
            "cockroachdb" | "cockroach" => Ok(DatabaseType::CockroachDb),
            other => Err(format!("Unknown database type: {}", other)),
        }
    }
}

/// Whether one or many rows take part on one side of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse `ASC`/`DESC` (any case); anything else is ascending
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomTypeKind {
    Enum,
    Composite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_aliases() {
        assert_eq!("postgres".parse::<DatabaseType>(), Ok(DatabaseType::PostgreSql));
        assert_eq!("MSSQL".parse::<DatabaseType>(), Ok(DatabaseType::SqlServer));
        assert!("db2".parse::<DatabaseType>().is_err());
    }

    #[test]
    fn test_database_type_round_trips_through_display() {
        for db in DatabaseType::ALL {
            assert_eq!(db.to_string().parse::<DatabaseType>(), Ok(db));
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DatabaseType::SqlServer).unwrap();
        assert_eq!(json, "\"sqlserver\"");
        let json = serde_json::to_string(&Cardinality::Many).unwrap();
        assert_eq!(json, "\"many\"");
    }
}
