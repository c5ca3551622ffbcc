//! Database client driver discovery and selection.

use std::fmt;
use std::str::FromStr;

/// A `major.minor` driver version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriverVersion {
    pub major: u32,
    pub minor: u32,
}

impl DriverVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Error parsing a [`DriverVersion`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid driver version '{0}', expected MAJOR[.MINOR]")]
pub struct DriverVersionError(String);

impl FromStr for DriverVersion {
    type Err = DriverVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (major, minor) = trimmed.split_once('.').unwrap_or((trimmed, "0"));
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| DriverVersionError(s.to_owned()))
        };
        Ok(Self::new(parse(major)?, parse(minor)?))
    }
}

/// A database client driver available to this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    /// Driver family, e.g. `postgres`.
    pub family: String,
    /// Human-readable driver name.
    pub name: String,
    pub version: DriverVersion,
}

/// Source of the locally available database drivers.
pub trait DriverCatalog: Send + Sync {
    fn installed(&self) -> Vec<DriverInfo>;
}

/// Drivers compiled into this binary.
///
/// Only the sqlx Postgres driver is linked in, which speaks protocol 3.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDrivers;

impl DriverCatalog for BuiltinDrivers {
    fn installed(&self) -> Vec<DriverInfo> {
        vec![DriverInfo {
            family: "postgres".to_owned(),
            name: "sqlx-postgres".to_owned(),
            version: DriverVersion::new(3, 0),
        }]
    }
}

/// Pick the newest installed driver of `family` at or above `min_version`.
///
/// Family matching is case-insensitive. Returns `None` when nothing qualifies.
#[must_use]
pub fn select_driver(
    catalog: &dyn DriverCatalog,
    family: &str,
    min_version: DriverVersion,
) -> Option<DriverInfo> {
    catalog
        .installed()
        .into_iter()
        .filter(|d| d.family.eq_ignore_ascii_case(family) && d.version >= min_version)
        .max_by_key(|d| d.version)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Installed(Vec<DriverInfo>);

    impl DriverCatalog for Installed {
        fn installed(&self) -> Vec<DriverInfo> {
            self.0.clone()
        }
    }

    fn driver(family: &str, name: &str, major: u32, minor: u32) -> DriverInfo {
        DriverInfo {
            family: family.to_owned(),
            name: name.to_owned(),
            version: DriverVersion::new(major, minor),
        }
    }

    #[test]
    fn test_parse_version() {
        assert_eq!("3.0".parse(), Ok(DriverVersion::new(3, 0)));
        assert_eq!(" 18 ".parse(), Ok(DriverVersion::new(18, 0)));
        assert!("v3".parse::<DriverVersion>().is_err());
        assert!("3.x".parse::<DriverVersion>().is_err());
    }

    #[test]
    fn test_selects_newest_compatible() {
        let catalog = Installed(vec![
            driver("postgres", "old", 2, 9),
            driver("postgres", "current", 3, 0),
            driver("POSTGRES", "newest", 3, 2),
            driver("mssql", "other", 18, 0),
        ]);

        let chosen = select_driver(&catalog, "postgres", DriverVersion::new(3, 0)).unwrap();
        assert_eq!(chosen.name, "newest");
    }

    #[test]
    fn test_none_when_too_old_or_wrong_family() {
        let catalog = Installed(vec![driver("postgres", "old", 2, 9)]);
        assert!(select_driver(&catalog, "postgres", DriverVersion::new(3, 0)).is_none());
        assert!(select_driver(&catalog, "mssql", DriverVersion::new(1, 0)).is_none());
    }

    #[test]
    fn test_builtin_satisfies_defaults() {
        let chosen = select_driver(&BuiltinDrivers, "postgres", DriverVersion::new(3, 0));
        assert_eq!(chosen.map(|d| d.name), Some("sqlx-postgres".to_owned()));
    }
}
