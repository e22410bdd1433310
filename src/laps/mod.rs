// Lap table construction: raw provider lap records into cleaned, accurate laps

pub mod duration;

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use duration::RawDuration;

use crate::errors::SectorScopeError;

pub const SECTOR_NAMES: [&str; 3] = ["Sector 1", "Sector 2", "Sector 3"];
pub const SPEED_TRAP_NAMES: [&str; 4] =
    ["Intermediate 1", "Intermediate 2", "Finish Line", "Speed Trap"];

/// A lap record as exported by the timing provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLapRecord {
    pub driver: String,
    pub team: String,
    pub lap_number: u32,
    #[serde(default)]
    pub lap_time: Option<RawDuration>,
    #[serde(default)]
    pub sector1: Option<RawDuration>,
    #[serde(default)]
    pub sector2: Option<RawDuration>,
    #[serde(default)]
    pub sector3: Option<RawDuration>,
    #[serde(default, rename = "speedI1")]
    pub speed_i1: Option<f64>,
    #[serde(default, rename = "speedI2")]
    pub speed_i2: Option<f64>,
    #[serde(default, rename = "speedFL")]
    pub speed_fl: Option<f64>,
    #[serde(default, rename = "speedST")]
    pub speed_st: Option<f64>,
    /// Exports that only contain accurate laps may omit the flag
    #[serde(default = "default_accurate")]
    pub accurate: bool,
    #[serde(default)]
    pub team_color: Option<String>,
}

fn default_accurate() -> bool {
    true
}

/// One accurate lap with every duration expressed in seconds.
///
/// Missing values stay `None` so that aggregations skip them instead of
/// counting them as zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapRecord {
    pub driver: String,
    pub team: String,
    pub lap_number: u32,
    pub lap_time: Option<f64>,
    pub sector1: Option<f64>,
    pub sector2: Option<f64>,
    pub sector3: Option<f64>,
    #[serde(rename = "speedI1")]
    pub speed_i1: Option<f64>,
    #[serde(rename = "speedI2")]
    pub speed_i2: Option<f64>,
    #[serde(rename = "speedFL")]
    pub speed_fl: Option<f64>,
    #[serde(rename = "speedST")]
    pub speed_st: Option<f64>,
    pub accurate: bool,
}

impl LapRecord {
    pub fn sectors(&self) -> [Option<f64>; 3] {
        [self.sector1, self.sector2, self.sector3]
    }

    pub fn speed_traps(&self) -> [Option<f64>; 4] {
        [self.speed_i1, self.speed_i2, self.speed_fl, self.speed_st]
    }

    fn from_raw(raw: &RawLapRecord) -> Result<Self, SectorScopeError> {
        if raw.lap_number == 0 {
            return Err(SectorScopeError::validation(format!(
                "lap numbers start at 1 (driver {})",
                raw.driver
            )));
        }
        let seconds = |field: &str, value: &Option<RawDuration>| match value {
            Some(duration) => duration.to_seconds().map_err(|reason| {
                SectorScopeError::validation(format!(
                    "{} of {} lap {}: {}",
                    field, raw.driver, raw.lap_number, reason
                ))
            }),
            None => Ok(None),
        };
        Ok(Self {
            driver: raw.driver.trim().to_uppercase(),
            team: raw.team.clone(),
            lap_number: raw.lap_number,
            lap_time: seconds("lap time", &raw.lap_time)?,
            sector1: seconds("sector 1", &raw.sector1)?,
            sector2: seconds("sector 2", &raw.sector2)?,
            sector3: seconds("sector 3", &raw.sector3)?,
            speed_i1: finite(raw.speed_i1),
            speed_i2: finite(raw.speed_i2),
            speed_fl: finite(raw.speed_fl),
            speed_st: finite(raw.speed_st),
            accurate: raw.accurate,
        })
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// The cleaned lap table of one session. Only accurate laps are kept.
#[derive(Clone, Debug, Default)]
pub struct LapTable {
    laps: Vec<LapRecord>,
    provider_colors: HashMap<String, String>,
}

impl LapTable {
    /// Build the table from provider records, dropping inaccurate laps.
    pub fn from_raw<'a>(
        raw: impl IntoIterator<Item = &'a RawLapRecord>,
    ) -> Result<Self, SectorScopeError> {
        let mut laps = Vec::new();
        let mut provider_colors = HashMap::new();
        for record in raw {
            if let Some(color) = &record.team_color {
                provider_colors
                    .entry(record.driver.trim().to_uppercase())
                    .or_insert_with(|| color.clone());
            }
            if !record.accurate {
                continue;
            }
            laps.push(LapRecord::from_raw(record)?);
        }
        Ok(Self {
            laps,
            provider_colors,
        })
    }

    /// Build the table from already converted records, dropping inaccurate laps.
    pub fn from_records(records: impl IntoIterator<Item = LapRecord>) -> Self {
        Self {
            laps: records.into_iter().filter(|lap| lap.accurate).collect(),
            provider_colors: HashMap::new(),
        }
    }

    pub fn with_provider_colors(mut self, colors: HashMap<String, String>) -> Self {
        self.provider_colors = colors;
        self
    }

    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Fails for callers that cannot work on an empty session.
    pub fn require_non_empty(&self) -> Result<&Self, SectorScopeError> {
        if self.laps.is_empty() {
            return Err(SectorScopeError::validation(
                "session has no accurate laps",
            ));
        }
        Ok(self)
    }

    /// Driver codes in the order they first appear.
    pub fn drivers(&self) -> Vec<&str> {
        self.laps
            .iter()
            .map(|lap| lap.driver.as_str())
            .unique()
            .collect()
    }

    pub fn driver_laps<'a>(&'a self, driver: &str) -> impl Iterator<Item = &'a LapRecord> {
        self.laps
            .iter()
            .filter(move |lap| lap.driver.eq_ignore_ascii_case(driver))
    }

    pub fn provider_color(&self, driver: &str) -> Option<&str> {
        self.provider_colors
            .get(&driver.to_uppercase())
            .map(String::as_str)
    }

    pub fn provider_colors(&self) -> &HashMap<String, String> {
        &self.provider_colors
    }
}
