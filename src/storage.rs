// Storage of pre-processed session artifacts

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::aggregate::DriverSummary;
use crate::dominance::TelemetryTrace;
use crate::errors::SectorScopeError;
use crate::laps::{LapRecord, LapTable, RawLapRecord};

const SCHEDULE_FILE_NAME: &str = "schedule.json";
const SESSION_FILE_NAME: &str = "session.json";
const LAPS_FILE_NAME: &str = "laps.json";
const CORNERS_FILE_NAME: &str = "corners.json";
const TELEMETRY_DIR_NAME: &str = "telemetry";

/// Event names per season, as stored in `schedule.json`.
pub type Schedule = BTreeMap<u16, Vec<String>>;

/// Circuit corner marker drawn next to the dominance map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub x: f64,
    pub y: f64,
    pub number: u32,
    #[serde(default)]
    pub letter: String,
    #[serde(default)]
    pub angle: f64,
}

impl Corner {
    /// Corner label as printed on track maps, e.g. `9` or `9a`.
    pub fn label(&self) -> String {
        format!("{}{}", self.number, self.letter)
    }
}

/// Summary of one processed session, stored as `session.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionArtifact {
    pub year: u16,
    pub event: String,
    pub drivers: Vec<DriverSummary>,
}

/// One stored telemetry lap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryArtifact {
    pub driver: String,
    pub lap_number: u32,
    #[serde(flatten)]
    pub trace: TelemetryTrace,
}

/// Turn an event name into its directory name: spaces become underscores,
/// apostrophes and dots are dropped.
pub fn sanitize_event_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '\'' && *c != '.')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Trait defining the interface for session artifact storage
pub trait SessionStore {
    /// Season schedule, empty when nothing was imported yet
    fn load_schedule(&self) -> Result<Schedule, SectorScopeError>;

    /// Merge the events of one season into the stored schedule
    fn merge_schedule(&self, year: u16, events: &[String]) -> Result<Schedule, SectorScopeError>;

    /// Session directory names stored for a season
    fn list_events(&self, year: u16) -> Result<Vec<String>, SectorScopeError>;

    /// Resolve a user supplied event name to a stored session directory
    fn resolve(&self, year: u16, query: &str) -> Result<String, SectorScopeError>;

    /// True when both the session summary and the laps are stored
    fn is_processed(&self, year: u16, event: &str) -> bool;

    fn save_session(&self, session: &SessionArtifact) -> Result<(), SectorScopeError>;
    fn load_session(&self, year: u16, event: &str) -> Result<SessionArtifact, SectorScopeError>;

    fn save_laps(&self, year: u16, event: &str, laps: &[LapRecord]) -> Result<(), SectorScopeError>;
    fn load_laps(&self, year: u16, event: &str) -> Result<LapTable, SectorScopeError>;

    fn save_corners(&self, year: u16, event: &str, corners: &[Corner]) -> Result<(), SectorScopeError>;
    /// Corners of a session, empty when the circuit has none on record
    fn load_corners(&self, year: u16, event: &str) -> Result<Vec<Corner>, SectorScopeError>;

    fn telemetry_exists(&self, year: u16, event: &str, driver: &str, lap_number: u32) -> bool;
    fn save_telemetry(
        &self,
        year: u16,
        event: &str,
        telemetry: &TelemetryArtifact,
    ) -> Result<(), SectorScopeError>;
    fn load_telemetry(
        &self,
        year: u16,
        event: &str,
        driver: &str,
        lap_number: u32,
    ) -> Result<TelemetryArtifact, SectorScopeError>;
}

/// File-based implementation of the session store
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn new(root: PathBuf) -> Result<Self, SectorScopeError> {
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| SectorScopeError::ArtifactIo {
                path: root.display().to_string(),
                source: e,
            })?;
        }
        Ok(Self { root })
    }

    /// Default location of the artifact tree
    pub fn default_storage_path() -> Result<PathBuf, SectorScopeError> {
        let app_data_dir = dirs::data_dir().ok_or(SectorScopeError::NoDataDir)?;
        Ok(app_data_dir.join("sectorscope"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn year_dir(&self, year: u16) -> PathBuf {
        self.root.join(year.to_string())
    }

    fn event_dir(&self, year: u16, event: &str) -> PathBuf {
        self.year_dir(year).join(sanitize_event_name(event))
    }

    fn telemetry_path(&self, year: u16, event: &str, driver: &str, lap_number: u32) -> PathBuf {
        self.event_dir(year, event)
            .join(TELEMETRY_DIR_NAME)
            .join(format!("{}_{}.json", driver.to_uppercase(), lap_number))
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SectorScopeError> {
        let file = fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SectorScopeError::not_found(format!("no artifact at {}", path.display()))
            } else {
                SectorScopeError::ArtifactIo {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
            SectorScopeError::ArtifactParse {
                path: path.display().to_string(),
                source: e,
            }
        })
    }

    /// Serialize to a temporary sibling file and move it into place
    fn write_json<T: Serialize + ?Sized>(
        path: &Path,
        value: &T,
        pretty: bool,
    ) -> Result<(), SectorScopeError> {
        let io_error = |e: std::io::Error| SectorScopeError::ArtifactIo {
            path: path.display().to_string(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let content = if pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
        .map_err(|e| SectorScopeError::ArtifactParse {
            path: path.display().to_string(),
            source: e,
        })?;

        let temp_path = path.with_extension("json.tmp");
        {
            let mut temp_file = fs::File::create(&temp_path).map_err(io_error)?;
            temp_file.write_all(&content).map_err(io_error)?;
            temp_file.sync_all().map_err(io_error)?;
        }

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            io_error(e)
        })?;

        debug!("Wrote {:?} ({} bytes)", path, content.len());
        Ok(())
    }

    /// Match a query against the `event` field of every stored session
    fn match_session_metadata(&self, year: u16, events: &[String], query: &str) -> Vec<String> {
        let query = query.trim().to_lowercase();
        events
            .iter()
            .filter(|event| match self.load_session(year, event) {
                Ok(session) => session.event.to_lowercase().contains(&query),
                Err(e) => {
                    warn!("Skipping unreadable session {} {}: {}", year, event, e);
                    false
                }
            })
            .cloned()
            .collect()
    }
}

/// One match wins, several matches at the same level are ambiguous.
fn single_match(query: &str, matches: Vec<String>) -> Option<Result<String, SectorScopeError>> {
    match matches.len() {
        0 => None,
        1 => matches.into_iter().next().map(Ok),
        _ => Some(Err(SectorScopeError::AmbiguousInput {
            query: query.to_string(),
            candidates: matches.join(", "),
        })),
    }
}

impl SessionStore for FileSessionStore {
    fn load_schedule(&self) -> Result<Schedule, SectorScopeError> {
        let path = self.root.join(SCHEDULE_FILE_NAME);
        if !path.exists() {
            return Ok(Schedule::new());
        }
        Self::read_json(&path)
    }

    fn merge_schedule(&self, year: u16, events: &[String]) -> Result<Schedule, SectorScopeError> {
        let mut schedule = match self.load_schedule() {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!("Replacing unreadable schedule: {}", e);
                Schedule::new()
            }
        };

        let known = schedule.entry(year).or_default();
        for event in events {
            if !known.contains(event) {
                known.push(event.clone());
            }
        }
        known.sort();

        Self::write_json(&self.root.join(SCHEDULE_FILE_NAME), &schedule, true)?;
        info!("Schedule for {} now lists {} events", year, schedule[&year].len());
        Ok(schedule)
    }

    fn list_events(&self, year: u16) -> Result<Vec<String>, SectorScopeError> {
        let year_dir = self.year_dir(year);
        if !year_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&year_dir).map_err(|e| SectorScopeError::ArtifactIo {
            path: year_dir.display().to_string(),
            source: e,
        })?;

        let mut events = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    events.push(name.to_string());
                }
            }
        }
        events.sort();
        Ok(events)
    }

    fn resolve(&self, year: u16, query: &str) -> Result<String, SectorScopeError> {
        let events = self.list_events(year)?;
        if events.is_empty() {
            return Err(SectorScopeError::not_found(format!(
                "no sessions stored for {}",
                year
            )));
        }

        let wanted = sanitize_event_name(query).to_lowercase();
        if wanted.is_empty() {
            return Err(SectorScopeError::validation("event name is empty"));
        }

        let exact = events
            .iter()
            .filter(|event| event.to_lowercase() == wanted)
            .cloned()
            .collect_vec();
        if let Some(found) = single_match(query, exact) {
            return found;
        }

        let partial = events
            .iter()
            .filter(|event| event.to_lowercase().contains(&wanted))
            .cloned()
            .collect_vec();
        if let Some(found) = single_match(query, partial) {
            return found;
        }

        if let Some(found) = single_match(query, self.match_session_metadata(year, &events, query)) {
            return found;
        }

        Err(SectorScopeError::not_found(format!(
            "no session matching '{}' in {}, available: {}",
            query,
            year,
            events.join(", ")
        )))
    }

    fn is_processed(&self, year: u16, event: &str) -> bool {
        let dir = self.event_dir(year, event);
        dir.join(SESSION_FILE_NAME).exists() && dir.join(LAPS_FILE_NAME).exists()
    }

    fn save_session(&self, session: &SessionArtifact) -> Result<(), SectorScopeError> {
        let path = self
            .event_dir(session.year, &session.event)
            .join(SESSION_FILE_NAME);
        Self::write_json(&path, session, true)
    }

    fn load_session(&self, year: u16, event: &str) -> Result<SessionArtifact, SectorScopeError> {
        Self::read_json(&self.event_dir(year, event).join(SESSION_FILE_NAME))
    }

    fn save_laps(&self, year: u16, event: &str, laps: &[LapRecord]) -> Result<(), SectorScopeError> {
        Self::write_json(&self.event_dir(year, event).join(LAPS_FILE_NAME), laps, true)
    }

    fn load_laps(&self, year: u16, event: &str) -> Result<LapTable, SectorScopeError> {
        let raw: Vec<RawLapRecord> =
            Self::read_json(&self.event_dir(year, event).join(LAPS_FILE_NAME))?;
        LapTable::from_raw(&raw)
    }

    fn save_corners(&self, year: u16, event: &str, corners: &[Corner]) -> Result<(), SectorScopeError> {
        Self::write_json(&self.event_dir(year, event).join(CORNERS_FILE_NAME), corners, true)
    }

    fn load_corners(&self, year: u16, event: &str) -> Result<Vec<Corner>, SectorScopeError> {
        let path = self.event_dir(year, event).join(CORNERS_FILE_NAME);
        if !path.exists() {
            debug!("No corners stored for {} {}", year, event);
            return Ok(Vec::new());
        }
        Self::read_json(&path)
    }

    fn telemetry_exists(&self, year: u16, event: &str, driver: &str, lap_number: u32) -> bool {
        self.telemetry_path(year, event, driver, lap_number).exists()
    }

    fn save_telemetry(
        &self,
        year: u16,
        event: &str,
        telemetry: &TelemetryArtifact,
    ) -> Result<(), SectorScopeError> {
        let path = self.telemetry_path(year, event, &telemetry.driver, telemetry.lap_number);
        Self::write_json(&path, telemetry, false)
    }

    fn load_telemetry(
        &self,
        year: u16,
        event: &str,
        driver: &str,
        lap_number: u32,
    ) -> Result<TelemetryArtifact, SectorScopeError> {
        let path = self.telemetry_path(year, event, driver, lap_number);
        if !path.exists() {
            return Err(SectorScopeError::not_found(format!(
                "no telemetry for {} lap {} in {} {}",
                driver.to_uppercase(),
                lap_number,
                year,
                event
            )));
        }
        Self::read_json(&path)
    }
}
