// Session cache: loads each session at most once, in the background or on demand

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::aggregate::DriverSummary;
use crate::colors::ColorPalette;
use crate::errors::SectorScopeError;
use crate::laps::LapTable;
use crate::storage::{Corner, FileSessionStore, SessionStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    #[default]
    Qualifying,
    SprintQualifying,
    Race,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Qualifying => write!(f, "Q"),
            SessionKind::SprintQualifying => write!(f, "SQ"),
            SessionKind::Race => write!(f, "R"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub year: u16,
    pub event: String,
    pub kind: SessionKind,
}

impl SessionKey {
    pub fn qualifying(year: u16, event: impl Into<String>) -> Self {
        Self {
            year,
            event: event.into(),
            kind: SessionKind::Qualifying,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.year, self.event, self.kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// Everything the serving commands need from one loaded session.
#[derive(Clone, Debug)]
pub struct SessionData {
    pub year: u16,
    /// Stored event name the key resolved to
    pub event: String,
    pub laps: LapTable,
    pub palette: ColorPalette,
    pub drivers: Vec<DriverSummary>,
    pub corners: Vec<Corner>,
}

/// Produces session data for a key. Called outside the cache lock.
pub trait SessionLoader: Send + Sync + 'static {
    fn load(&self, key: &SessionKey) -> Result<SessionData, SectorScopeError>;
}

impl SessionLoader for FileSessionStore {
    fn load(&self, key: &SessionKey) -> Result<SessionData, SectorScopeError> {
        if key.kind != SessionKind::Qualifying {
            return Err(SectorScopeError::not_found(format!(
                "only qualifying sessions are imported, got {}",
                key.kind
            )));
        }

        let event = self.resolve(key.year, &key.event)?;
        let session = self.load_session(key.year, &event)?;
        let laps = self.load_laps(key.year, &event)?;
        let corners = self.load_corners(key.year, &event)?;
        let palette = ColorPalette::new(
            session
                .drivers
                .iter()
                .map(|d| (d.driver.clone(), d.color.clone()))
                .collect(),
        );

        Ok(SessionData {
            year: key.year,
            event,
            laps,
            palette,
            drivers: session.drivers,
            corners,
        })
    }
}

enum Entry {
    Loading,
    Ready(Arc<SessionData>),
    Failed(String),
}

struct Shared {
    entries: Mutex<HashMap<SessionKey, Entry>>,
    loaded: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<SessionKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, key: SessionKey, result: Result<SessionData, SectorScopeError>) {
        let entry = match result {
            Ok(data) => Entry::Ready(Arc::new(data)),
            Err(e) => {
                warn!("Failed to load {}: {}", key, e);
                Entry::Failed(e.to_string())
            }
        };
        self.lock().insert(key, entry);
        self.loaded.notify_all();
    }
}

/// Cache of loaded sessions with at most one load in flight per key.
pub struct SessionCache<L: SessionLoader> {
    loader: Arc<L>,
    shared: Arc<Shared>,
}

impl<L: SessionLoader> Clone for SessionCache<L> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<L: SessionLoader> SessionCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                loaded: Condvar::new(),
            }),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn status(&self, key: &SessionKey) -> SessionStatus {
        match self.shared.lock().get(key) {
            None => SessionStatus::Idle,
            Some(Entry::Loading) => SessionStatus::Loading,
            Some(Entry::Ready(_)) => SessionStatus::Ready,
            Some(Entry::Failed(reason)) => SessionStatus::Error(reason.clone()),
        }
    }

    /// Return the session if it is loaded, otherwise start loading it on a
    /// background thread and return `None`. Never waits for a load.
    pub fn get_or_load(&self, key: &SessionKey) -> Option<Arc<SessionData>> {
        {
            let mut entries = self.shared.lock();
            match entries.get(key) {
                Some(Entry::Ready(data)) => return Some(Arc::clone(data)),
                Some(Entry::Loading) => return None,
                // idle or failed: (re)start the load
                None | Some(Entry::Failed(_)) => {
                    entries.insert(key.clone(), Entry::Loading);
                }
            }
        }

        let loader = Arc::clone(&self.loader);
        let shared = Arc::clone(&self.shared);
        let key = key.clone();
        thread::spawn(move || {
            let result = timed_load(loader.as_ref(), &key);
            shared.finish(key, result);
        });
        None
    }

    /// Return the session, loading it on this thread or waiting for the load
    /// already in flight.
    pub fn load_blocking(&self, key: &SessionKey) -> Result<Arc<SessionData>, SectorScopeError> {
        let mut entries = self.shared.lock();
        let mut waited = false;
        loop {
            match entries.get(key) {
                Some(Entry::Ready(data)) => return Ok(Arc::clone(data)),
                Some(Entry::Loading) => {
                    debug!("Waiting for {} to finish loading", key);
                    waited = true;
                    entries = self
                        .shared
                        .loaded
                        .wait(entries)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(Entry::Failed(reason)) if waited => {
                    return Err(SectorScopeError::SessionLoad {
                        key: key.to_string(),
                        reason: reason.clone(),
                    });
                }
                None | Some(Entry::Failed(_)) => {
                    entries.insert(key.clone(), Entry::Loading);
                    break;
                }
            }
        }
        drop(entries);

        let result = timed_load(self.loader.as_ref(), key);
        let outcome = match &result {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
        self.shared.finish(key.clone(), result);

        match outcome {
            None => match self.shared.lock().get(key) {
                Some(Entry::Ready(data)) => Ok(Arc::clone(data)),
                _ => Err(SectorScopeError::SessionLoad {
                    key: key.to_string(),
                    reason: "session was evicted while loading".to_string(),
                }),
            },
            Some(reason) => Err(SectorScopeError::SessionLoad {
                key: key.to_string(),
                reason,
            }),
        }
    }

    /// Drop a loaded or failed session so the next access reloads it.
    pub fn evict(&self, key: &SessionKey) -> bool {
        let mut entries = self.shared.lock();
        match entries.get(key) {
            Some(Entry::Loading) | None => false,
            Some(_) => {
                entries.remove(key);
                true
            }
        }
    }
}

fn timed_load<L: SessionLoader>(
    loader: &L,
    key: &SessionKey,
) -> Result<SessionData, SectorScopeError> {
    let start = Instant::now();
    // a panicking loader must still leave the entry in a terminal state
    let result = panic::catch_unwind(AssertUnwindSafe(|| loader.load(key))).unwrap_or_else(
        |payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SectorScopeError::SessionLoad {
                key: key.to_string(),
                reason: format!("loader panicked: {}", reason),
            })
        },
    );
    if result.is_ok() {
        info!("Loaded {} in {:.1}s", key, start.elapsed().as_secs_f64());
    }
    result
}
