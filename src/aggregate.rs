// Per-driver aggregations over the accurate lap table

use std::cmp::Ordering;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    colors::ColorPalette,
    errors::SectorScopeError,
    laps::{LapRecord, LapTable},
};

/// One row of a sector time ranking (best or average, depending on the producer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRanking {
    pub driver: String,
    pub team: String,
    pub sectors: [Option<f64>; 3],
    /// Sum of the three sectors, absent when any sector is absent
    pub total: Option<f64>,
}

/// One row of the speed-trap ranking, in km/h.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTrapRanking {
    pub driver: String,
    pub team: String,
    /// Mean per trap: intermediate 1, intermediate 2, finish line, speed trap
    pub speeds: [Option<f64>; 4],
    /// Mean of the available per-trap means
    pub average: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub driver: String,
    pub team: String,
    pub color: String,
    pub total_laps: usize,
    pub best_lap: Option<f64>,
    pub best_lap_number: Option<u32>,
    pub lap_numbers: Vec<u32>,
}

/// Best (minimum) time per sector for every driver, fastest total first.
pub fn best_sector_times(laps: &LapTable) -> Vec<SectorRanking> {
    sector_ranking(laps, min_of)
}

/// Mean time per sector for every driver, fastest total first.
pub fn average_sector_times(laps: &LapTable) -> Vec<SectorRanking> {
    sector_ranking(laps, mean_of)
}

/// Mean speed-trap readings per driver, highest average first.
pub fn speed_trap_averages(laps: &LapTable) -> Vec<SpeedTrapRanking> {
    let mut rows = by_driver(laps)
        .into_iter()
        .map(|(driver, driver_laps)| {
            let speeds: [Option<f64>; 4] = std::array::from_fn(|trap| {
                mean_of(&present(&driver_laps, |lap| lap.speed_traps()[trap]))
            });
            SpeedTrapRanking {
                driver: driver.to_string(),
                team: driver_laps[0].team.clone(),
                average: mean_of(&speeds.iter().flatten().copied().collect_vec()),
                speeds,
            }
        })
        .collect_vec();
    rows.sort_by(|a, b| {
        descending_absent_last(a.average, b.average).then_with(|| a.driver.cmp(&b.driver))
    });
    rows
}

/// Summary of every (driver, team) pair with its accurate laps, best lap first.
pub fn list_drivers(
    laps: &LapTable,
    palette: &ColorPalette,
) -> Result<Vec<DriverSummary>, SectorScopeError> {
    let laps = laps.require_non_empty()?;
    let mut rows = laps
        .laps()
        .iter()
        .into_group_map_by(|lap| (lap.driver.as_str(), lap.team.as_str()))
        .into_iter()
        .map(|((driver, team), driver_laps)| {
            let best = driver_laps
                .iter()
                .filter_map(|lap| lap.lap_time.map(|time| (time, lap.lap_number)))
                .min_by(|a, b| a.0.total_cmp(&b.0));
            DriverSummary {
                driver: driver.to_string(),
                team: team.to_string(),
                color: palette.color_for(driver, team),
                total_laps: driver_laps.len(),
                best_lap: best.map(|(time, _)| time),
                best_lap_number: best.map(|(_, lap_number)| lap_number),
                lap_numbers: driver_laps.iter().map(|lap| lap.lap_number).sorted().collect(),
            }
        })
        .collect_vec();
    rows.sort_by(|a, b| {
        ascending_absent_last(a.best_lap, b.best_lap)
            .then_with(|| a.driver.cmp(&b.driver))
            .then_with(|| a.team.cmp(&b.team))
    });
    Ok(rows)
}

fn sector_ranking(
    laps: &LapTable,
    reduce: fn(&[f64]) -> Option<f64>,
) -> Vec<SectorRanking> {
    let mut rows = by_driver(laps)
        .into_iter()
        .map(|(driver, driver_laps)| {
            let sectors: [Option<f64>; 3] = std::array::from_fn(|sector| {
                reduce(&present(&driver_laps, |lap| lap.sectors()[sector]))
            });
            SectorRanking {
                driver: driver.to_string(),
                // teams do not change within a session
                team: driver_laps[0].team.clone(),
                total: sectors.iter().copied().sum(),
                sectors,
            }
        })
        .collect_vec();
    rows.sort_by(|a, b| {
        ascending_absent_last(a.total, b.total).then_with(|| a.driver.cmp(&b.driver))
    });
    rows
}

fn by_driver(laps: &LapTable) -> Vec<(&str, Vec<&LapRecord>)> {
    laps.laps()
        .iter()
        .into_group_map_by(|lap| lap.driver.as_str())
        .into_iter()
        .collect()
}

/// Values of one channel across laps with absent readings skipped.
fn present(laps: &[&LapRecord], channel: impl Fn(&LapRecord) -> Option<f64>) -> Vec<f64> {
    laps.iter().filter_map(|lap| channel(lap)).collect()
}

fn min_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().min_by(f64::total_cmp)
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn ascending_absent_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn descending_absent_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        _ => ascending_absent_last(a, b),
    }
}
