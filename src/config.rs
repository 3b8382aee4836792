use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Highest value the 3-byte timestamp field can hold.
pub const MAX_TIMESTAMP: u32 = 0x00FF_FFFF;
pub const MAX_CATEGORIES: usize = 255;

/// Category ranked by portal count when it declares nothing itself.
const LEAST_PORTALS: &str = "lp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    Time,
    Portals,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub portals: Option<bool>,
}

impl Category {
    pub fn new(id: impl Into<String>) -> Self {
        Category {
            id: id.into(),
            portals: None,
        }
    }

    pub fn ranking(&self) -> Ranking {
        match self.portals {
            Some(true) => Ranking::Portals,
            Some(false) => Ranking::Time,
            None if self.id == LEAST_PORTALS => Ranking::Portals,
            None => Ranking::Time,
        }
    }
}

/// Ordered categories of one week. A category's position is its on-disk index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    pub fn new(categories: Vec<Category>) -> Result<Self, AppError> {
        if categories.len() > MAX_CATEGORIES {
            return Err(AppError::Config(format!(
                "{} categories, at most {} fit the log format",
                categories.len(),
                MAX_CATEGORIES
            )));
        }
        let mut seen = HashSet::new();
        for category in &categories {
            if category.id.is_empty() {
                return Err(AppError::Config("empty category id".into()));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate category id: {}",
                    category.id
                )));
            }
        }
        Ok(CategoryRegistry { categories })
    }

    pub fn from_ids<I, S>(ids: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(Category::new).collect())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn get(&self, index: u8) -> Option<&Category> {
        self.categories.get(index as usize)
    }

    pub fn index_of(&self, id: &str) -> Option<u8> {
        self.categories
            .iter()
            .position(|c| c.id == id)
            .map(|i| i as u8)
    }

    #[cfg(test)]
    pub fn ranking(&self, id: &str) -> Option<Ranking> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(Category::ranking)
    }
}

/// Start of the running week, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekClock {
    pub start: i64,
}

impl WeekClock {
    pub fn new(start: i64) -> Self {
        WeekClock { start }
    }

    /// Whole seconds from the week start to `now`, as stored in a record.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Result<u32, AppError> {
        let secs = now
            .timestamp()
            .checked_sub(self.start)
            .ok_or_else(|| AppError::Encode(format!("week start {} is out of range", self.start)))?;
        if secs < 0 {
            return Err(AppError::Encode(format!(
                "current time is {} seconds before the week start",
                -secs
            )));
        }
        if secs > MAX_TIMESTAMP as i64 {
            return Err(AppError::Encode(format!(
                "{} seconds since week start does not fit 24 bits",
                secs
            )));
        }
        Ok(secs as u32)
    }

    pub fn absolute(&self, timestamp: u32) -> i64 {
        self.start + timestamp as i64
    }
}

#[derive(Debug, Deserialize)]
struct WeekFile {
    date: i64,
    #[serde(default)]
    number: Option<u32>,
    #[serde(default)]
    categories: Vec<Category>,
}

/// Everything a weeklog operation needs to know about the running week.
#[derive(Debug, Clone)]
pub struct WeekConfig {
    pub number: Option<u32>,
    pub clock: WeekClock,
    pub registry: CategoryRegistry,
}

impl WeekConfig {
    #[cfg(test)]
    pub fn new(start: i64, registry: CategoryRegistry) -> Self {
        WeekConfig {
            number: None,
            clock: WeekClock::new(start),
            registry,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let file: WeekFile = serde_json::from_str(json)?;
        // every stored offset must map to a representable absolute date
        if file.date < 0 || file.date.checked_add(MAX_TIMESTAMP as i64).is_none() {
            return Err(AppError::Config(format!(
                "week start {} is out of range",
                file.date
            )));
        }
        Ok(WeekConfig {
            number: file.number,
            clock: WeekClock::new(file.date),
            registry: CategoryRegistry::new(file.categories)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_lp_defaults_to_portal_ranking() {
        let registry = CategoryRegistry::from_ids(["main", "lp", "inbounds"]).unwrap();
        assert_eq!(registry.ranking("main"), Some(Ranking::Time));
        assert_eq!(registry.ranking("lp"), Some(Ranking::Portals));
        assert_eq!(registry.ranking("missing"), None);
    }

    #[test]
    fn test_declared_ranking_overrides_default() {
        let config = WeekConfig::from_json(
            r#"{"date": 1700000000, "number": 7, "categories": [
                {"id": "lp", "portals": false},
                {"id": "glitchless-lp", "portals": true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(config.number, Some(7));
        assert_eq!(config.clock.start, 1_700_000_000);
        assert_eq!(config.registry.ranking("lp"), Some(Ranking::Time));
        assert_eq!(config.registry.ranking("glitchless-lp"), Some(Ranking::Portals));
        assert_eq!(config.registry.index_of("glitchless-lp"), Some(1));
    }

    #[test]
    fn test_registry_rejects_duplicates_and_overflow() {
        let err = CategoryRegistry::from_ids(["main", "main"]).unwrap_err();
        assert_eq!(err.code(), "ERR_CONFIG");

        let ids: Vec<String> = (0..256).map(|i| format!("c{}", i)).collect();
        let err = CategoryRegistry::from_ids(ids).unwrap_err();
        assert_eq!(err.code(), "ERR_CONFIG");

        let ids: Vec<String> = (0..255).map(|i| format!("c{}", i)).collect();
        let registry = CategoryRegistry::from_ids(ids).unwrap();
        assert_eq!(registry.index_of("c254"), Some(254));
    }

    #[test]
    fn test_malformed_week_file() {
        let err = WeekConfig::from_json(r#"{"categories": []}"#).unwrap_err();
        assert_eq!(err.code(), "ERR_CONFIG");
    }

    #[test]
    fn test_week_start_out_of_range() {
        for date in [i64::MAX, i64::MAX - MAX_TIMESTAMP as i64 + 1, -1, i64::MIN] {
            let json = format!(r#"{{"date": {}, "categories": [{{"id": "main"}}]}}"#, date);
            let err = WeekConfig::from_json(&json).unwrap_err();
            assert_eq!(err.code(), "ERR_CONFIG");
        }

        let edge = i64::MAX - MAX_TIMESTAMP as i64;
        let json = format!(r#"{{"date": {}, "categories": [{{"id": "main"}}]}}"#, edge);
        let config = WeekConfig::from_json(&json).unwrap();
        assert_eq!(config.clock.absolute(MAX_TIMESTAMP), i64::MAX);
    }

    #[test]
    fn test_week_clock_elapsed() {
        let clock = WeekClock::new(1_700_000_000);
        let now = Utc.timestamp_opt(1_700_000_090, 0).unwrap();
        assert_eq!(clock.elapsed(now).unwrap(), 90);
        assert_eq!(clock.absolute(90), 1_700_000_090);

        let before = Utc.timestamp_opt(1_699_999_999, 0).unwrap();
        assert_eq!(clock.elapsed(before).unwrap_err().code(), "ERR_ENCODE");

        let far = Utc.timestamp_opt(1_700_000_000 + (1 << 24), 0).unwrap();
        assert_eq!(clock.elapsed(far).unwrap_err().code(), "ERR_ENCODE");
    }
}
