// Import of provider exports into the session artifact store

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::aggregate::{DriverSummary, list_drivers};
use crate::colors::ColorPalette;
use crate::dominance::{self, MIN_LAP_DISTANCE_M, TelemetrySample, TelemetryTrace};
use crate::errors::SectorScopeError;
use crate::laps::{LapRecord, LapTable, RawLapRecord};
use crate::storage::{Corner, SessionArtifact, SessionStore, TelemetryArtifact};

const EXPORT_LAPS_FILE_NAME: &str = "laps.json";
const EXPORT_CORNERS_FILE_NAME: &str = "corners.json";
const EXPORT_TELEMETRY_DIR_NAME: &str = "telemetry";

/// What to import from an export tree.
#[derive(Clone, Debug)]
pub struct ImportOptions {
    /// Only import this season
    pub year: Option<u16>,
    /// Only import events whose name contains this text (case-insensitive)
    pub event_filter: Option<String>,
    /// Points per stored telemetry lap
    pub resolution: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            year: None,
            event_filter: None,
            resolution: dominance::DEFAULT_RESOLUTION,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub processed: usize,
    /// Sessions already present in the store
    pub skipped: usize,
    pub failed: usize,
    pub telemetry_written: usize,
    /// Telemetry laps that were missing or too short
    pub telemetry_skipped: usize,
    /// The batch was stopped before every session was visited
    pub interrupted: bool,
}

/// Import every session under `export_root` into `store`.
///
/// Sessions already stored are skipped. `stop` is checked between sessions
/// so that a batch can be ended cleanly.
pub fn import_export(
    export_root: &Path,
    store: &impl SessionStore,
    options: &ImportOptions,
    stop: &AtomicBool,
) -> Result<ImportStats, SectorScopeError> {
    let mut stats = ImportStats::default();
    let filter = options.event_filter.as_ref().map(|f| f.to_lowercase());

    for (year, year_dir) in export_years(export_root)? {
        if options.year.is_some_and(|wanted| wanted != year) {
            continue;
        }

        let events = subdirectories(&year_dir)?;
        store.merge_schedule(year, &events)?;
        info!("Importing {} ({} events)", year, events.len());

        for event in events {
            if filter
                .as_ref()
                .is_some_and(|filter| !event.to_lowercase().contains(filter))
            {
                continue;
            }
            if stop.load(Ordering::SeqCst) {
                info!("Import stopped before {} {}", year, event);
                stats.interrupted = true;
                return Ok(stats);
            }
            if store.is_processed(year, &event) {
                debug!("Already processed {} {}, skipping", year, event);
                stats.skipped += 1;
                continue;
            }

            match import_session(&year_dir.join(&event), year, &event, store, options, &mut stats) {
                Ok(drivers) => {
                    info!("Imported {} {} ({} drivers)", year, event, drivers);
                    stats.processed += 1;
                }
                Err(e) => {
                    warn!("Failed to import {} {}: {}", year, event, e);
                    stats.failed += 1;
                }
            }
        }
    }

    Ok(stats)
}

/// Read one raw telemetry lap from a JSON Lines file.
pub fn load_telemetry_jsonl(source_file: &Path) -> Result<TelemetryTrace, SectorScopeError> {
    let path = source_file.display().to_string();
    let samples = serde_jsonlines::json_lines(source_file)
        .map_err(|e| SectorScopeError::TelemetryLoader {
            path: path.clone(),
            source: e,
        })?
        .collect::<Result<Vec<TelemetrySample>, std::io::Error>>()
        .map_err(|e| SectorScopeError::TelemetryLoader { path, source: e })?;
    Ok(TelemetryTrace::from_samples(&samples))
}

/// Round to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn import_session(
    event_dir: &Path,
    year: u16,
    event: &str,
    store: &impl SessionStore,
    options: &ImportOptions,
    stats: &mut ImportStats,
) -> Result<usize, SectorScopeError> {
    let laps_path = event_dir.join(EXPORT_LAPS_FILE_NAME);
    let raw: Vec<RawLapRecord> = read_export_json(&laps_path)?;
    let table = LapTable::from_raw(&raw)?;
    let palette = ColorPalette::new(table.provider_colors().clone());
    let drivers = list_drivers(&table, &palette)?;

    let laps: Vec<LapRecord> = table.laps().iter().map(rounded_lap).collect();
    store.save_laps(year, event, &laps)?;

    let corners_path = event_dir.join(EXPORT_CORNERS_FILE_NAME);
    let corners: Vec<Corner> = if corners_path.exists() {
        read_export_json(&corners_path)?
    } else {
        Vec::new()
    };
    store.save_corners(year, event, &corners)?;

    for driver in &drivers {
        import_best_lap_telemetry(event_dir, year, event, driver, store, options, stats);
    }

    // written last: a session counts as processed once session.json exists
    store.save_session(&SessionArtifact {
        year,
        event: event.to_string(),
        drivers: drivers.iter().map(rounded_summary).collect(),
    })?;
    Ok(drivers.len())
}

fn import_best_lap_telemetry(
    event_dir: &Path,
    year: u16,
    event: &str,
    driver: &DriverSummary,
    store: &impl SessionStore,
    options: &ImportOptions,
    stats: &mut ImportStats,
) {
    let Some(lap_number) = driver.best_lap_number else {
        debug!("{} has no timed lap in {} {}", driver.driver, year, event);
        return;
    };
    if store.telemetry_exists(year, event, &driver.driver, lap_number) {
        return;
    }

    let source = event_dir
        .join(EXPORT_TELEMETRY_DIR_NAME)
        .join(format!("{}_{}.jsonl", driver.driver, lap_number));
    if !source.exists() {
        warn!("No telemetry for {} lap {} at {:?}", driver.driver, lap_number, source);
        stats.telemetry_skipped += 1;
        return;
    }

    let result = load_telemetry_jsonl(&source).and_then(|trace| {
        if trace.total_distance().is_none_or(|total| total < MIN_LAP_DISTANCE_M) {
            return Ok(None);
        }
        let resampled = dominance::resample(&trace, options.resolution)?;
        let telemetry = TelemetryArtifact {
            driver: driver.driver.clone(),
            lap_number,
            trace: rounded_trace(resampled),
        };
        store.save_telemetry(year, event, &telemetry)?;
        Ok(Some(()))
    });

    match result {
        Ok(Some(())) => stats.telemetry_written += 1,
        Ok(None) => {
            warn!(
                "Telemetry for {} lap {} is shorter than {}m, skipping",
                driver.driver, lap_number, MIN_LAP_DISTANCE_M
            );
            stats.telemetry_skipped += 1;
        }
        Err(e) => {
            warn!("Telemetry failed for {} lap {}: {}", driver.driver, lap_number, e);
            stats.telemetry_skipped += 1;
        }
    }
}

fn read_export_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SectorScopeError> {
    let content = fs::read_to_string(path).map_err(|e| SectorScopeError::ArtifactIo {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| SectorScopeError::ArtifactParse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Season directories of an export tree, oldest first.
fn export_years(export_root: &Path) -> Result<Vec<(u16, PathBuf)>, SectorScopeError> {
    let mut years: Vec<(u16, PathBuf)> = subdirectories(export_root)?
        .into_iter()
        .filter_map(|name| match name.parse::<u16>() {
            Ok(year) => Some((year, export_root.join(&name))),
            Err(_) => {
                debug!("Ignoring non-season directory {:?}", name);
                None
            }
        })
        .collect();
    years.sort();
    Ok(years)
}

fn subdirectories(dir: &Path) -> Result<Vec<String>, SectorScopeError> {
    let entries = fs::read_dir(dir).map_err(|e| SectorScopeError::ArtifactIo {
        path: dir.display().to_string(),
        source: e,
    })?;
    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(String::from))
        .collect();
    names.sort();
    Ok(names)
}

fn rounded_lap(lap: &LapRecord) -> LapRecord {
    let round = |value: Option<f64>| value.map(|v| round_to(v, 3));
    LapRecord {
        lap_time: round(lap.lap_time),
        sector1: round(lap.sector1),
        sector2: round(lap.sector2),
        sector3: round(lap.sector3),
        speed_i1: round(lap.speed_i1),
        speed_i2: round(lap.speed_i2),
        speed_fl: round(lap.speed_fl),
        speed_st: round(lap.speed_st),
        ..lap.clone()
    }
}

fn rounded_summary(driver: &DriverSummary) -> DriverSummary {
    DriverSummary {
        best_lap: driver.best_lap.map(|v| round_to(v, 3)),
        ..driver.clone()
    }
}

fn rounded_trace(trace: TelemetryTrace) -> TelemetryTrace {
    let round = |values: Vec<f64>| values.into_iter().map(|v| round_to(v, 1)).collect();
    TelemetryTrace {
        distance: round(trace.distance),
        x: round(trace.x),
        y: round(trace.y),
        speed: round(trace.speed),
        extras: trace
            .extras
            .into_iter()
            .map(|(channel, values)| (channel, round(values)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(90.12345, 3), 90.123);
        assert_eq!(round_to(301.26, 1), 301.3);
        assert_eq!(round_to(-0.04, 1), -0.0);
    }

    #[test]
    fn test_rounded_trace_keeps_extras() {
        let mut trace = TelemetryTrace {
            distance: vec![0., 123.456],
            x: vec![1.04, 2.06],
            y: vec![0., 0.],
            speed: vec![99.95, 250.],
            ..Default::default()
        };
        trace
            .extras
            .insert(dominance::Channel::Throttle, vec![99.99, 0.01]);

        let rounded = rounded_trace(trace);
        assert_eq!(rounded.distance, vec![0., 123.5]);
        assert_eq!(rounded.x, vec![1., 2.1]);
        assert_eq!(rounded.speed, vec![100., 250.]);
        assert_eq!(rounded.extras[&dominance::Channel::Throttle], vec![100., 0.]);
    }
}
