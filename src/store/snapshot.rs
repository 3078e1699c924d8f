use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::errors::ConfigError;

//------------ SnapshotDate --------------------------------------------------

/// The calendar day a run works on. Each day gets its own pair of
/// collections, `{date}-routes` and `{date}-vrp`; a new day is a new
/// snapshot.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotDate(NaiveDate);

impl SnapshotDate {
    /// The date of today in local time, like the daily cron job sees it.
    pub fn today() -> Self {
        Self(chrono::Local::now().date_naive())
    }

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn routes_collection(&self) -> String {
        format!("{}-routes", self)
    }

    pub fn vrp_collection(&self) -> String {
        format!("{}-vrp", self)
    }
}

impl fmt::Display for SnapshotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for SnapshotDate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| ConfigError::InvalidDate(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn collection_names() {
        let date = SnapshotDate::from_str("2014-03-07").unwrap();
        assert_eq!(date.routes_collection(), "2014-03-07-routes");
        assert_eq!(date.vrp_collection(), "2014-03-07-vrp");
    }

    #[test]
    fn invalid_dates() {
        assert!(SnapshotDate::from_str("2014-13-01").is_err());
        assert!(SnapshotDate::from_str("07-03-2014").is_err());
    }
}
