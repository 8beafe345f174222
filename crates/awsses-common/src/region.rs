use std::{collections::HashSet, fmt};

use crate::error::{ExporterError, Result};

/// Name of an upstream deployment zone, e.g. `us-east-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(String);

impl Region {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(ExporterError::InvalidArgument(
                "region name must not be empty".to_string(),
            ));
        }
        if !name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
        {
            return Err(ExporterError::InvalidArgument(format!(
                "invalid region name: {name}"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Parses a comma separated region list, keeping the given order.
    pub fn parse_list(value: &str) -> Result<Vec<Self>> {
        let mut seen = HashSet::new();
        let mut regions = Vec::new();
        for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let region = Self::new(part)?;
            if !seen.insert(region.clone()) {
                return Err(ExporterError::InvalidArgument(format!(
                    "duplicate region: {region}"
                )));
            }
            regions.push(region);
        }

        if regions.is_empty() {
            return Err(ExporterError::InvalidArgument(
                "at least one region is required".to_string(),
            ));
        }
        Ok(regions)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Region;

    #[test]
    fn parses_list_in_order() {
        let regions = Region::parse_list(" us-east-1, ,us-west-2,").unwrap();
        let names: Vec<&str> = regions.iter().map(Region::as_str).collect();
        assert_eq!(names, ["us-east-1", "us-west-2"]);
    }

    #[test]
    fn rejects_empty_and_duplicate_lists() {
        assert!(Region::parse_list(" , ").is_err());
        assert!(Region::parse_list("us-east-1,us-east-1").is_err());
        assert!(Region::new("us east 1").is_err());
    }
}
