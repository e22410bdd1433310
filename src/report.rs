// Plain-text tables and JSON report shapes for the CLI

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::aggregate::{DriverSummary, SectorRanking, SpeedTrapRanking};
use crate::compare::{ComparisonResult, Faster};
use crate::dominance::{Dominance, DominanceFrame};
use crate::storage::Corner;

const WIDTH: usize = 72;

/// Comparison plus the colours a renderer should use for each driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    #[serde(flatten)]
    pub comparison: ComparisonResult,
    pub color1: String,
    pub color2: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominanceReport {
    pub driver1: String,
    pub driver2: String,
    pub team1: String,
    pub team2: String,
    pub lap1_number: u32,
    pub lap2_number: u32,
    pub color1: String,
    pub color2: String,
    #[serde(flatten)]
    pub frame: DominanceFrame,
    pub corners: Vec<Corner>,
}

fn rule(c: char) -> String {
    c.to_string().repeat(WIDTH)
}

fn optional(value: Option<f64>, width: usize, precision: usize) -> String {
    match value {
        Some(v) => format!("{:>width$.precision$}", v),
        None => format!("{:>width$}", "-"),
    }
}

/// Best or average sector ranking.
pub struct SectorTable<'a> {
    pub title: &'a str,
    pub rows: &'a [SectorRanking],
}

impl fmt::Display for SectorTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (title, rows) = (self.title, self.rows);
        writeln!(f, "{}\n  {}\n{}", rule('─'), title, rule('─'))?;
        writeln!(
            f,
            "{:>4}  {:<6}  {:<22}  {:>8}  {:>8}  {:>8}  {:>8}",
            "Pos", "Driver", "Team", "S1", "S2", "S3", "Total"
        )?;
        writeln!(f, "{}", rule('─'))?;
        for (pos, row) in rows.iter().enumerate() {
            let sectors = row.sectors.iter().map(|s| optional(*s, 8, 3)).join("  ");
            writeln!(
                f,
                "{:>4}  {:<6}  {:<22}  {}  {}",
                pos + 1,
                row.driver,
                row.team,
                sectors,
                optional(row.total, 8, 3)
            )?;
        }
        writeln!(f, "{}", rule('─'))?;
        Ok(())
    }
}

pub struct SpeedTrapTable<'a>(pub &'a [SpeedTrapRanking]);

impl fmt::Display for SpeedTrapTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.0;
        writeln!(
            f,
            "{}\n  Speed Trap Averages (km/h)\n{}",
            rule('─'),
            rule('─')
        )?;
        writeln!(
            f,
            "{:>4}  {:<6}  {:<22}  {:>6}  {:>6}  {:>6}  {:>6}  {:>6}",
            "Pos", "Driver", "Team", "I1", "I2", "FL", "ST", "Avg"
        )?;
        writeln!(f, "{}", rule('─'))?;
        for (pos, row) in rows.iter().enumerate() {
            let speeds = row.speeds.iter().map(|s| optional(*s, 6, 1)).join("  ");
            writeln!(
                f,
                "{:>4}  {:<6}  {:<22}  {}  {}",
                pos + 1,
                row.driver,
                row.team,
                speeds,
                optional(row.average, 6, 1)
            )?;
        }
        writeln!(f, "{}", rule('─'))?;
        Ok(())
    }
}

pub struct DriversTable<'a>(pub &'a [DriverSummary]);

impl fmt::Display for DriversTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let drivers = self.0;
        writeln!(
            f,
            "{}\n  Available Drivers (sorted by best lap)\n{}",
            rule('─'),
            rule('─')
        )?;
        writeln!(
            f,
            "  {:>3}  {:<6}  {:<24}  {:>5}  {:>8}  Lap Numbers",
            "#", "Driver", "Team", "Laps", "Best"
        )?;
        writeln!(f, "{}", rule('─'))?;
        for (i, row) in drivers.iter().enumerate() {
            writeln!(
                f,
                "  {:>3}  {:<6}  {:<24}  {:>5}  {}s  [{}]",
                i + 1,
                row.driver,
                row.team,
                row.total_laps,
                optional(row.best_lap, 7, 3),
                row.lap_numbers.iter().join(", ")
            )?;
        }
        writeln!(f, "{}", rule('─'))?;
        Ok(())
    }
}

fn marker(faster: Faster) -> &'static str {
    match faster {
        Faster::DriverA => "◀",
        Faster::DriverB => "▶",
        Faster::Tie => "=",
        Faster::NotApplicable => " ",
    }
}

fn winner(result: &ComparisonResult, faster: Faster) -> &str {
    match faster {
        Faster::Tie => "TIE",
        Faster::NotApplicable => "-",
        side => result.driver_for(side).unwrap_or("-"),
    }
}

/// Head-to-head comparison with the verdict at the bottom.
pub struct ComparisonText<'a>(pub &'a ComparisonResult);

impl fmt::Display for ComparisonText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let (d1, d2) = (&result.driver1, &result.driver2);

        writeln!(f, "{}", rule('═'))?;
        writeln!(
            f,
            "  {} ({})  vs  {} ({})",
            d1, result.team1, d2, result.team2
        )?;
        writeln!(
            f,
            "  Lap {}  vs  Lap {}",
            result.lap1_number, result.lap2_number
        )?;
        writeln!(f, "{}", rule('═'))?;

        writeln!(
            f,
            "\n  {:<10}  {:>10}  {:>10}  {:>10}  {:>8}",
            "Sector", d1, d2, "Delta", "Faster"
        )?;
        writeln!(f, "  {}", "─".repeat(54))?;
        for sector in &result.sectors {
            writeln!(
                f,
                "  {:<10}  {}s  {}s  {} {}s  {:>8}",
                sector.name,
                optional(sector.value1, 9, 3),
                optional(sector.value2, 9, 3),
                marker(sector.faster),
                optional(sector.delta.map(f64::abs), 7, 3),
                winner(result, sector.faster)
            )?;
        }

        writeln!(
            f,
            "\n  {:<16}  {:>8}  {:>8}  {:>8}  {:>8}",
            "Trap", d1, d2, "Delta", "Faster"
        )?;
        writeln!(f, "  {}", "─".repeat(54))?;
        for trap in &result.speed_traps {
            writeln!(
                f,
                "  {:<16}  {}  {}  {}  {:>8}",
                trap.name,
                optional(trap.value1, 8, 0),
                optional(trap.value2, 8, 0),
                optional(trap.delta.map(f64::abs), 8, 0),
                winner(result, trap.faster)
            )?;
        }

        writeln!(f, "\n{}", rule('═'))?;
        let verdict = match (result.overall.faster, result.overall.delta) {
            (Faster::Tie, _) => "DEAD HEAT".to_string(),
            (side @ (Faster::DriverA | Faster::DriverB), Some(delta)) => format!(
                "{} FASTER BY {:.3}s",
                winner(result, side),
                delta.abs()
            ),
            _ => "NO LAP TIME FOR ONE OF THE DRIVERS".to_string(),
        };
        writeln!(f, "  {}", verdict)?;
        writeln!(
            f,
            "  {}: {}s   |   {}: {}s",
            d1,
            optional(result.overall.value1, 0, 3),
            d2,
            optional(result.overall.value2, 0, 3)
        )?;
        writeln!(
            f,
            "  Sectors won:  {} {}  -  {} {}",
            d1,
            result.sectors_won(Faster::DriverA),
            result.sectors_won(Faster::DriverB),
            d2
        )?;
        writeln!(f, "{}", rule('═'))?;
        Ok(())
    }
}

/// Share of the lap each driver leads, plus the longest run of each.
pub struct DominanceText<'a>(pub &'a DominanceReport);

impl fmt::Display for DominanceText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let frame = &report.frame;
        writeln!(f, "{}", rule('═'))?;
        writeln!(
            f,
            "  Track dominance: {} (lap {})  vs  {} (lap {})",
            report.driver1, report.lap1_number, report.driver2, report.lap2_number
        )?;
        writeln!(
            f,
            "  {} mini-sectors over {:.0}m",
            frame.resolution(),
            frame.shared_distance()
        )?;
        writeln!(f, "{}", rule('═'))?;
        writeln!(
            f,
            "  {:<6} {:>3}%  {}",
            report.driver1,
            frame.d1_pct,
            report.color1
        )?;
        writeln!(
            f,
            "  {:<6} {:>3}%  {}",
            report.driver2,
            frame.d2_pct,
            report.color2
        )?;

        for (driver, side) in [
            (&report.driver1, Dominance::DriverA),
            (&report.driver2, Dominance::DriverB),
        ] {
            if let Some((start, end)) = longest_run(frame, side) {
                writeln!(
                    f,
                    "  Longest {} stretch: {:.0}m to {:.0}m",
                    driver, frame.distance[start], frame.distance[end]
                )?;
            }
        }
        if !report.corners.is_empty() {
            writeln!(f, "  Corners on record: {}", report.corners.len())?;
        }
        writeln!(f, "{}", rule('═'))?;
        Ok(())
    }
}

/// Inclusive index range of the longest consecutive run won by one side.
fn longest_run(frame: &DominanceFrame, side: Dominance) -> Option<(usize, usize)> {
    frame
        .dominance
        .iter()
        .enumerate()
        .chunk_by(|(_, d)| **d == side)
        .into_iter()
        .filter(|(won, _)| *won)
        .map(|(_, run)| {
            let indices = run.map(|(i, _)| i).collect_vec();
            (indices[0], indices[indices.len() - 1])
        })
        .max_by(|a, b| (a.1 - a.0).cmp(&(b.1 - b.0)).then_with(|| b.0.cmp(&a.0)))
}
