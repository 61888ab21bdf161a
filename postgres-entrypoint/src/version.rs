//! PostgreSQL server version and the settings that depend on it

use crate::error::EntrypointError;
use std::fmt;
use std::str::FromStr;

/// Server version as (major, minor). Since PostgreSQL 10 the major version
/// is a single number and minor is always 0 here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PgVersion {
    pub major: u32,
    pub minor: u32,
}

impl PgVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the version out of `pg_ctl --version` output,
    /// e.g. `pg_ctl (PostgreSQL) 11.5 (Debian 11.5-1.pgdg90+1)`.
    pub fn from_version_output(output: &str) -> Result<Self, EntrypointError> {
        let token = output
            .split_whitespace()
            .find(|t| t.starts_with(|c: char| c.is_ascii_digit()))
            .ok_or_else(|| EntrypointError::InvalidVersion(output.to_string()))?;

        let mut parts = token.split(|c: char| !c.is_ascii_digit());
        let major: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| EntrypointError::InvalidVersion(output.to_string()))?;

        if major >= 10 {
            return Ok(Self::new(major, 0));
        }

        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        Ok(Self::new(major, minor))
    }

    /// `wal_level` value for a primary that serves hot standbys.
    pub fn wal_level(&self) -> &'static str {
        if *self >= Self::new(9, 6) {
            "replica"
        } else {
            "hot_standby"
        }
    }

    /// `checkpoint_segments` was removed in 9.5.
    pub fn has_checkpoint_segments(&self) -> bool {
        *self < Self::new(9, 5)
    }

    /// `wal_keep_segments` was replaced by `wal_keep_size` in 13.
    pub fn has_wal_keep_size(&self) -> bool {
        self.major >= 13
    }

    /// From 12 a standby is marked by `standby.signal` instead of `recovery.conf`.
    pub fn uses_standby_signal(&self) -> bool {
        self.major >= 12
    }
}

impl FromStr for PgVersion {
    type Err = EntrypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EntrypointError::InvalidVersion(s.to_string());
        let mut parts = s.trim().splitn(2, '.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };

        if major >= 10 {
            Ok(Self::new(major, 0))
        } else {
            Ok(Self::new(major, minor))
        }
    }
}

impl fmt::Display for PgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.major >= 10 {
            write!(f, "{}", self.major)
        } else {
            write!(f, "{}.{}", self.major, self.minor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pg_major() {
        assert_eq!("9.6".parse::<PgVersion>().unwrap(), PgVersion::new(9, 6));
        assert_eq!("11".parse::<PgVersion>().unwrap(), PgVersion::new(11, 0));
        assert_eq!("16.2".parse::<PgVersion>().unwrap(), PgVersion::new(16, 0));
        assert!("eleven".parse::<PgVersion>().is_err());
        assert!("9.x".parse::<PgVersion>().is_err());
    }

    #[test]
    fn test_parse_version_output() {
        let v = PgVersion::from_version_output("pg_ctl (PostgreSQL) 11.5 (Debian 11.5-1.pgdg90+1)")
            .unwrap();
        assert_eq!(v, PgVersion::new(11, 0));

        let v = PgVersion::from_version_output("pg_ctl (PostgreSQL) 9.4.26").unwrap();
        assert_eq!(v, PgVersion::new(9, 4));

        assert!(PgVersion::from_version_output("pg_ctl (PostgreSQL)").is_err());
    }

    #[test]
    fn test_display_round_trips_pg_major() {
        assert_eq!(PgVersion::new(9, 6).to_string(), "9.6");
        assert_eq!(PgVersion::new(15, 0).to_string(), "15");
    }

    #[test]
    fn test_version_dependent_settings() {
        let v94 = PgVersion::new(9, 4);
        let v96 = PgVersion::new(9, 6);
        let v12 = PgVersion::new(12, 0);
        let v13 = PgVersion::new(13, 0);

        assert_eq!(v94.wal_level(), "hot_standby");
        assert_eq!(v96.wal_level(), "replica");
        assert!(v94.has_checkpoint_segments());
        assert!(!v96.has_checkpoint_segments());
        assert!(!v12.has_wal_keep_size());
        assert!(v13.has_wal_keep_size());
        assert!(!PgVersion::new(11, 0).uses_standby_signal());
        assert!(v12.uses_standby_signal());
    }
}
