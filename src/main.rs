use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use sectorscope::{
    SectorScopeError,
    aggregate::{average_sector_times, best_sector_times, list_drivers, speed_trap_averages},
    cache::{SessionCache, SessionData, SessionKey},
    compare::{compare, select_lap},
    config::AppConfig,
    dominance::dominance,
    preprocess::{ImportOptions, import_export},
    report::{
        ComparisonReport, ComparisonText, DominanceReport, DominanceText, DriversTable,
        SectorTable, SpeedTrapTable,
    },
    storage::{FileSessionStore, SessionStore},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Artifact directory, overrides the configured one
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Season, defaults to the configured one
    #[arg(short, long)]
    year: Option<u16>,

    /// Event name, matched loosely against the stored sessions
    #[arg(short, long)]
    event: String,
}

#[derive(Args, Debug)]
struct PairArgs {
    #[arg(long)]
    d1: String,
    #[arg(long)]
    d2: String,
    /// Lap of the first driver, personal best when omitted
    #[arg(long)]
    lap1: Option<u32>,
    /// Lap of the second driver, personal best when omitted
    #[arg(long)]
    lap2: Option<u32>,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the drivers of a session with their accurate laps
    Drivers {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Best and average sector times plus speed-trap averages
    Sectors {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Head-to-head comparison of two laps
    Compare {
        #[command(flatten)]
        session: SessionArgs,
        #[command(flatten)]
        pair: PairArgs,
    },
    /// Track dominance between two laps
    Dominance {
        #[command(flatten)]
        session: SessionArgs,
        #[command(flatten)]
        pair: PairArgs,
        #[arg(short, long)]
        resolution: Option<usize>,
    },
    /// List the sessions imported for a season
    Events {
        #[arg(short, long)]
        year: Option<u16>,
    },
    /// Import a provider export tree into the artifact directory
    Import {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        year: Option<u16>,
        /// Only import events containing this text
        #[arg(short, long)]
        event: Option<String>,
    },
}

struct App {
    config: AppConfig,
    cache: SessionCache<FileSessionStore>,
}

impl App {
    fn new(data_dir: Option<PathBuf>) -> Result<Self, SectorScopeError> {
        let config = match AppConfig::from_local_file() {
            Ok(Some(config)) => config,
            Ok(None) => AppConfig::default(),
            Err(e) => {
                warn!("Ignoring unreadable config file: {}", e);
                AppConfig::default()
            }
        };
        let config = AppConfig {
            data_dir: data_dir.or(config.data_dir),
            ..config
        };
        let store = FileSessionStore::new(config.data_dir()?)?;
        info!("Using artifacts in {:?}", store.root());
        Ok(Self {
            config,
            cache: SessionCache::new(store),
        })
    }

    fn store(&self) -> &FileSessionStore {
        self.cache.loader()
    }

    fn session(&self, args: &SessionArgs) -> Result<Arc<SessionData>, SectorScopeError> {
        let year = args.year.unwrap_or(self.config.default_year);
        self.cache
            .load_blocking(&SessionKey::qualifying(year, args.event.as_str()))
    }
}

fn drivers(app: &App, args: &SessionArgs) -> Result<(), SectorScopeError> {
    let session = app.session(args)?;
    let drivers = list_drivers(&session.laps, &session.palette)?;
    print!("{}", DriversTable(&drivers));
    Ok(())
}

fn sectors(app: &App, args: &SessionArgs) -> Result<(), SectorScopeError> {
    let session = app.session(args)?;
    let laps = session.laps.require_non_empty()?;
    print!(
        "{}",
        SectorTable {
            title: "Best Sector Times",
            rows: &best_sector_times(laps),
        }
    );
    print!(
        "{}",
        SectorTable {
            title: "Average Sector Times",
            rows: &average_sector_times(laps),
        }
    );
    print!("{}", SpeedTrapTable(&speed_trap_averages(laps)));
    Ok(())
}

fn compare_laps(app: &App, args: &SessionArgs, pair: &PairArgs) -> Result<(), SectorScopeError> {
    let session = app.session(args)?;
    let comparison = compare(&session.laps, &pair.d1, &pair.d2, pair.lap1, pair.lap2)?;

    if pair.json {
        let (color1, color2) = session.palette.pair_for(
            (comparison.driver1.as_str(), comparison.team1.as_str()),
            (comparison.driver2.as_str(), comparison.team2.as_str()),
        );
        print_json(&ComparisonReport {
            comparison,
            color1,
            color2,
        })
    } else {
        print!("{}", ComparisonText(&comparison));
        Ok(())
    }
}

fn track_dominance(
    app: &App,
    args: &SessionArgs,
    pair: &PairArgs,
    resolution: Option<usize>,
) -> Result<(), SectorScopeError> {
    let session = app.session(args)?;
    let lap1 = select_lap(&session.laps, &pair.d1, pair.lap1)?;
    let lap2 = select_lap(&session.laps, &pair.d2, pair.lap2)?;

    let store = app.store();
    let trace1 = store.load_telemetry(session.year, &session.event, &lap1.driver, lap1.lap_number)?;
    let trace2 = store.load_telemetry(session.year, &session.event, &lap2.driver, lap2.lap_number)?;
    let frame = dominance(
        &trace1.trace,
        &trace2.trace,
        resolution.unwrap_or(app.config.resolution),
    )?;

    let (color1, color2) = session
        .palette
        .pair_for(
            (lap1.driver.as_str(), lap1.team.as_str()),
            (lap2.driver.as_str(), lap2.team.as_str()),
        );
    let report = DominanceReport {
        driver1: lap1.driver.clone(),
        driver2: lap2.driver.clone(),
        team1: lap1.team.clone(),
        team2: lap2.team.clone(),
        lap1_number: lap1.lap_number,
        lap2_number: lap2.lap_number,
        color1,
        color2,
        frame,
        corners: session.corners.clone(),
    };

    if pair.json {
        print_json(&report)
    } else {
        print!("{}", DominanceText(&report));
        Ok(())
    }
}

fn events(app: &App, year: Option<u16>) -> Result<(), SectorScopeError> {
    let year = year.unwrap_or(app.config.default_year);
    let events = app.store().list_events(year)?;
    if events.is_empty() {
        println!("No sessions imported for {}", year);
    }
    for event in events {
        println!("{}", event);
    }
    Ok(())
}

fn import(
    app: &App,
    input: &Path,
    year: Option<u16>,
    event: Option<String>,
) -> Result<(), SectorScopeError> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Stopping after the current session...");
        handler_stop.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    let options = ImportOptions {
        year,
        event_filter: event,
        resolution: app.config.resolution,
    };
    let stats = import_export(input, app.store(), &options, &stop)?;
    println!(
        "Done: {} sessions processed, {} already present, {} failed, {} telemetry laps written ({} skipped){}",
        stats.processed,
        stats.skipped,
        stats.failed,
        stats.telemetry_written,
        stats.telemetry_skipped,
        if stats.interrupted { ", interrupted" } else { "" }
    );
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), SectorScopeError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SectorScopeError::ArtifactParse {
        path: "<stdout>".to_string(),
        source: e,
    })?;
    println!("{}", json);
    Ok(())
}

fn run(cli: Cli) -> Result<(), SectorScopeError> {
    let app = App::new(cli.data_dir)?;
    match &cli.command {
        Commands::Drivers { session } => drivers(&app, session),
        Commands::Sectors { session } => sectors(&app, session),
        Commands::Compare { session, pair } => compare_laps(&app, session, pair),
        Commands::Dominance {
            session,
            pair,
            resolution,
        } => track_dominance(&app, session, pair, *resolution),
        Commands::Events { year } => events(&app, *year),
        Commands::Import { input, year, event } => import(&app, input, *year, event.clone()),
    }
}

fn main() -> ExitCode {
    colog::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
