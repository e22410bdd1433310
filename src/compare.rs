// Head-to-head comparison of one lap per driver

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    errors::SectorScopeError,
    laps::{LapRecord, LapTable, SECTOR_NAMES, SPEED_TRAP_NAMES},
};

/// Which side of a comparison wins an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faster {
    DriverA,
    DriverB,
    Tie,
    /// One of the two values is missing
    NotApplicable,
}

impl Faster {
    /// Lower value wins (durations).
    fn lower_wins(delta: Option<f64>) -> Self {
        match delta {
            Some(d) if d < 0. => Faster::DriverA,
            Some(d) if d > 0. => Faster::DriverB,
            Some(_) => Faster::Tie,
            None => Faster::NotApplicable,
        }
    }

    /// Higher value wins (speeds).
    fn higher_wins(delta: Option<f64>) -> Self {
        Self::lower_wins(delta.map(|d| -d))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub name: String,
    pub value1: Option<f64>,
    pub value2: Option<f64>,
    /// `value1 - value2`, absent when either value is missing
    pub delta: Option<f64>,
    pub faster: Faster,
}

impl ComparisonEntry {
    fn new(name: &str, value1: Option<f64>, value2: Option<f64>, higher_wins: bool) -> Self {
        let delta = value1.zip(value2).map(|(a, b)| a - b);
        Self {
            name: name.to_string(),
            value1,
            value2,
            delta,
            faster: if higher_wins {
                Faster::higher_wins(delta)
            } else {
                Faster::lower_wins(delta)
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub driver1: String,
    pub driver2: String,
    pub team1: String,
    pub team2: String,
    pub lap1_number: u32,
    pub lap2_number: u32,
    pub sectors: Vec<ComparisonEntry>,
    pub speed_traps: Vec<ComparisonEntry>,
    pub overall: ComparisonEntry,
}

impl ComparisonResult {
    /// Number of sectors won by one side.
    pub fn sectors_won(&self, side: Faster) -> usize {
        self.sectors.iter().filter(|s| s.faster == side).count()
    }

    /// Driver code for a side, `None` for ties and missing data.
    pub fn driver_for(&self, side: Faster) -> Option<&str> {
        match side {
            Faster::DriverA => Some(&self.driver1),
            Faster::DriverB => Some(&self.driver2),
            Faster::Tie | Faster::NotApplicable => None,
        }
    }
}

/// Compare two drivers sector by sector. Without a lap number the driver's
/// personal best lap is used.
pub fn compare(
    laps: &LapTable,
    driver_a: &str,
    driver_b: &str,
    lap_a: Option<u32>,
    lap_b: Option<u32>,
) -> Result<ComparisonResult, SectorScopeError> {
    let row1 = select_lap(laps, driver_a, lap_a)?;
    let row2 = select_lap(laps, driver_b, lap_b)?;

    let sectors = SECTOR_NAMES
        .iter()
        .zip(row1.sectors().into_iter().zip(row2.sectors()))
        .map(|(name, (t1, t2))| ComparisonEntry::new(name, t1, t2, false))
        .collect_vec();

    let speed_traps = SPEED_TRAP_NAMES
        .iter()
        .zip(row1.speed_traps().into_iter().zip(row2.speed_traps()))
        .map(|(name, (s1, s2))| ComparisonEntry::new(name, s1, s2, true))
        .collect_vec();

    Ok(ComparisonResult {
        driver1: row1.driver.clone(),
        driver2: row2.driver.clone(),
        team1: row1.team.clone(),
        team2: row2.team.clone(),
        lap1_number: row1.lap_number,
        lap2_number: row2.lap_number,
        sectors,
        speed_traps,
        overall: ComparisonEntry::new("Lap", row1.lap_time, row2.lap_time, false),
    })
}

/// Resolve the lap a comparison uses for one driver.
pub fn select_lap<'a>(
    laps: &'a LapTable,
    driver: &str,
    lap_number: Option<u32>,
) -> Result<&'a LapRecord, SectorScopeError> {
    let driver = driver.trim().to_uppercase();
    let driver_laps = laps.driver_laps(&driver).collect_vec();
    if driver_laps.is_empty() {
        return Err(SectorScopeError::not_found(format!(
            "driver '{}' has no accurate laps in this session",
            driver
        )));
    }

    match lap_number {
        Some(lap_number) => driver_laps
            .iter()
            .find(|lap| lap.lap_number == lap_number)
            .copied()
            .ok_or_else(|| {
                let available = driver_laps.iter().map(|lap| lap.lap_number).sorted().join(", ");
                SectorScopeError::not_found(format!(
                    "lap {} not found for {}, available accurate laps: [{}]",
                    lap_number, driver, available
                ))
            }),
        None => driver_laps
            .iter()
            .filter_map(|lap| lap.lap_time.map(|time| (time, *lap)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, lap)| lap)
            .ok_or_else(|| {
                SectorScopeError::not_found(format!("driver '{}' has no timed lap", driver))
            }),
    }
}
