// Track dominance: which of two drivers is faster at each point of the lap

pub mod interp;
pub mod trace;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use trace::{Channel, MIN_LAP_DISTANCE_M, TelemetrySample, TelemetryTrace};

use crate::errors::SectorScopeError;
use interp::{interp, linspace, pad_or_truncate};

/// Number of mini-sectors a lap is split into by default
pub const DEFAULT_RESOLUTION: usize = 200;

/// Faster driver at one grid point. Serialized as +1, -1 or 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Dominance {
    DriverA,
    DriverB,
    Tie,
}

impl Dominance {
    fn classify(speed_a: f64, speed_b: f64) -> Self {
        if speed_a > speed_b {
            Dominance::DriverA
        } else if speed_b > speed_a {
            Dominance::DriverB
        } else {
            Dominance::Tie
        }
    }
}

impl From<Dominance> for i8 {
    fn from(value: Dominance) -> Self {
        match value {
            Dominance::DriverA => 1,
            Dominance::DriverB => -1,
            Dominance::Tie => 0,
        }
    }
}

impl TryFrom<i8> for Dominance {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Dominance::DriverA),
            -1 => Ok(Dominance::DriverB),
            0 => Ok(Dominance::Tie),
            other => Err(format!("invalid dominance value {}", other)),
        }
    }
}

/// Both laps resampled onto a shared distance grid.
///
/// Every vector, including each extra channel, has exactly `resolution`
/// entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominanceFrame {
    pub distance: Vec<f64>,
    /// Centreline between the two racing lines
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub dominance: Vec<Dominance>,
    pub speed1: Vec<f64>,
    pub speed2: Vec<f64>,
    #[serde(default)]
    pub extras1: BTreeMap<Channel, Vec<f64>>,
    #[serde(default)]
    pub extras2: BTreeMap<Channel, Vec<f64>>,
    #[serde(rename = "d1_pct")]
    pub d1_pct: u32,
    #[serde(rename = "d2_pct")]
    pub d2_pct: u32,
}

impl DominanceFrame {
    pub fn resolution(&self) -> usize {
        self.distance.len()
    }

    /// Length of the shared grid in metres.
    pub fn shared_distance(&self) -> f64 {
        self.distance.last().copied().unwrap_or_default()
    }
}

/// Resample both traces onto a shared grid and classify every point.
pub fn dominance(
    trace_a: &TelemetryTrace,
    trace_b: &TelemetryTrace,
    resolution: usize,
) -> Result<DominanceFrame, SectorScopeError> {
    check_resolution(resolution)?;
    let total_a = trace_a.validate("driver 1")?;
    let total_b = trace_b.validate("driver 2")?;

    let grid = linspace(0., total_a.min(total_b), resolution);
    let speed1 = interp(&grid, &trace_a.distance, &trace_a.speed);
    let speed2 = interp(&grid, &trace_b.distance, &trace_b.speed);

    let x = centreline(
        &interp(&grid, &trace_a.distance, &trace_a.x),
        &interp(&grid, &trace_b.distance, &trace_b.x),
    );
    let y = centreline(
        &interp(&grid, &trace_a.distance, &trace_a.y),
        &interp(&grid, &trace_b.distance, &trace_b.y),
    );

    let dominance: Vec<Dominance> = speed1
        .iter()
        .zip(&speed2)
        .map(|(&a, &b)| Dominance::classify(a, b))
        .collect();
    let (d1_pct, d2_pct) = percentages(&dominance);

    let mut extras1 = BTreeMap::new();
    let mut extras2 = BTreeMap::new();
    for channel in trace_a.extras.keys().chain(trace_b.extras.keys()) {
        if extras1.contains_key(channel) {
            continue;
        }
        extras1.insert(*channel, resample_channel(trace_a, *channel, &grid));
        extras2.insert(*channel, resample_channel(trace_b, *channel, &grid));
    }

    Ok(DominanceFrame {
        distance: grid,
        x,
        y,
        dominance,
        speed1,
        speed2,
        extras1,
        extras2,
        d1_pct,
        d2_pct,
    })
}

/// Resample one trace onto `resolution` points spanning its own lap.
pub fn resample(
    trace: &TelemetryTrace,
    resolution: usize,
) -> Result<TelemetryTrace, SectorScopeError> {
    check_resolution(resolution)?;
    let total = trace.validate("trace")?;

    let grid = linspace(0., total, resolution);
    // partial channels stay partial so they are never read back as aligned
    let extras = trace
        .extras
        .iter()
        .map(|(channel, values)| {
            let values = if trace.is_aligned(*channel) {
                interp(&grid, &trace.distance, values)
            } else {
                values.clone()
            };
            (*channel, values)
        })
        .collect();

    Ok(TelemetryTrace {
        x: interp(&grid, &trace.distance, &trace.x),
        y: interp(&grid, &trace.distance, &trace.y),
        speed: interp(&grid, &trace.distance, &trace.speed),
        distance: grid,
        extras,
    })
}

/// Share of grid points won by each driver, floored to whole percent.
pub fn percentages(dominance: &[Dominance]) -> (u32, u32) {
    if dominance.is_empty() {
        return (0, 0);
    }
    let count = |side: Dominance| dominance.iter().filter(|d| **d == side).count();
    let pct = |n: usize| (n * 100 / dominance.len()) as u32;
    (
        pct(count(Dominance::DriverA)),
        pct(count(Dominance::DriverB)),
    )
}

fn check_resolution(resolution: usize) -> Result<(), SectorScopeError> {
    if resolution < 2 {
        return Err(SectorScopeError::validation(format!(
            "resolution must be at least 2, got {}",
            resolution
        )));
    }
    Ok(())
}

fn centreline(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(a, b)| (a + b) / 2.).collect()
}

fn resample_channel(trace: &TelemetryTrace, channel: Channel, grid: &[f64]) -> Vec<f64> {
    match trace.extras.get(&channel) {
        Some(values) if values.len() == trace.distance.len() => {
            interp(grid, &trace.distance, values)
        }
        // partial channels cannot be placed on the distance axis
        Some(values) => pad_or_truncate(values, grid.len()),
        None => vec![0.; grid.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// A lap at constant speed with samples every `step` metres.
    fn constant_lap(total: f64, step: f64, speed: f64) -> TelemetryTrace {
        let count = (total / step) as usize + 1;
        let samples: Vec<TelemetrySample> = (0..count)
            .map(|i| {
                let distance = (i as f64 * step).min(total);
                TelemetrySample {
                    distance,
                    x: distance,
                    y: -distance,
                    speed,
                    ..Default::default()
                }
            })
            .collect();
        TelemetryTrace::from_samples(&samples)
    }

    #[test]
    fn test_shared_grid_uses_shorter_lap() {
        let a = constant_lap(5000., 10., 250.);
        let b = constant_lap(4800., 10., 240.);
        let frame = dominance(&a, &b, DEFAULT_RESOLUTION).unwrap();

        assert_eq!(frame.resolution(), 200);
        assert_eq!(frame.distance[0], 0.);
        assert_eq!(frame.shared_distance(), 4800.);
        assert!(frame.dominance.iter().all(|d| *d == Dominance::DriverA));
        assert_eq!((frame.d1_pct, frame.d2_pct), (100, 0));
    }

    #[test]
    fn test_centreline_is_the_mean_of_both_lines() {
        let a = constant_lap(1000., 10., 200.);
        let mut b = constant_lap(1000., 10., 200.);
        b.x.iter_mut().for_each(|x| *x += 4.);

        let frame = dominance(&a, &b, 11).unwrap();
        assert_eq!(frame.x[5], 502.);
        assert_eq!(frame.y[5], -500.);
        assert!(frame.dominance.iter().all(|d| *d == Dominance::Tie));
        assert_eq!((frame.d1_pct, frame.d2_pct), (0, 0));
    }

    #[test]
    fn test_partial_extra_channel_is_zero_padded() {
        let mut a = constant_lap(1000., 1., 200.);
        a.extras.insert(Channel::Gear, vec![5.; 150]);
        let b = constant_lap(1000., 1., 210.);

        let frame = dominance(&a, &b, 200).unwrap();
        let gear = &frame.extras1[&Channel::Gear];
        assert_eq!(gear.len(), 200);
        assert!(gear[..150].iter().all(|g| *g == 5.));
        assert!(gear[150..].iter().all(|g| *g == 0.));
        // the other driver has no gear channel at all
        assert_eq!(frame.extras2[&Channel::Gear], vec![0.; 200]);
    }

    #[test]
    fn test_aligned_extra_channel_is_interpolated() {
        let mut a = constant_lap(1000., 10., 200.);
        let throttle: Vec<f64> = a.distance.iter().map(|d| d / 10.).collect();
        a.extras.insert(Channel::Throttle, throttle);
        let b = constant_lap(1000., 10., 200.);

        let frame = dominance(&a, &b, 3).unwrap();
        assert_eq!(frame.extras1[&Channel::Throttle], vec![0., 50., 100.]);
    }

    #[test]
    fn test_percentages_are_floored() {
        use Dominance::*;
        let points = [DriverA, DriverA, DriverB, Tie, DriverA, DriverB];
        assert_eq!(percentages(&points), (50, 33));
        assert_eq!(percentages(&[]), (0, 0));
    }

    #[test]
    fn test_invalid_inputs() {
        let good = constant_lap(1000., 10., 200.);
        let short = constant_lap(50., 10., 200.);

        assert!(matches!(
            dominance(&good, &short, 200),
            Err(SectorScopeError::Validation { .. })
        ));
        assert!(dominance(&good, &good, 1).is_err());
        assert!(dominance(&TelemetryTrace::default(), &good, 200).is_err());
    }

    #[test]
    fn test_resample_spans_own_lap() {
        let mut trace = constant_lap(4320., 3., 180.);
        let gear = vec![4.; trace.len()];
        trace.extras.insert(Channel::Gear, gear);

        let resampled = resample(&trace, 200).unwrap();
        assert_eq!(resampled.len(), 200);
        assert_eq!(resampled.total_distance(), Some(4320.));
        assert!(resampled.is_aligned(Channel::Gear));
        assert!(resampled.speed.iter().all(|s| *s == 180.));
    }

    #[test]
    fn test_single_missing_gear_value_keeps_channel_on_distance() {
        let samples: Vec<TelemetrySample> = (0..=5000)
            .map(|i| {
                let distance = i as f64;
                TelemetrySample {
                    distance,
                    x: distance,
                    y: 0.,
                    speed: 250.,
                    gear: Some(if distance < 2500. { 1. } else { 8. }),
                    ..Default::default()
                }
            })
            .collect();
        let full = TelemetryTrace::from_samples(&samples);

        let mut gapped_samples = samples.clone();
        gapped_samples[10].gear = None;
        let gapped = TelemetryTrace::from_samples(&gapped_samples);
        assert!(gapped.is_aligned(Channel::Gear));

        let frame = dominance(&gapped, &full, DEFAULT_RESOLUTION).unwrap();
        let gear = &frame.extras1[&Channel::Gear];
        assert_eq!(gear[gear.len() - 5..], [8.; 5]);
        assert_eq!(gear[..5], [1.; 5]);
        assert_eq!(frame.extras1[&Channel::Gear], frame.extras2[&Channel::Gear]);
    }

    #[test]
    fn test_resample_keeps_partial_channel_partial() {
        let mut trace = constant_lap(1000., 1., 200.);
        trace.extras.insert(Channel::Rpm, vec![11000.; 150]);

        let resampled = resample(&trace, 200).unwrap();
        assert!(!resampled.is_aligned(Channel::Rpm));
        assert_eq!(resampled.extras[&Channel::Rpm], vec![11000.; 150]);
    }

    #[test]
    fn test_dominance_serializes_as_sign() {
        let json = serde_json::to_string(&vec![Dominance::DriverA, Dominance::DriverB, Dominance::Tie])
            .unwrap();
        assert_eq!(json, "[1,-1,0]");
        let back: Vec<Dominance> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[1], Dominance::DriverB);
        assert!(serde_json::from_str::<Dominance>("2").is_err());
    }

    fn arb_trace() -> impl Strategy<Value = TelemetryTrace> {
        (
            prop::collection::vec(0.0f64..40.0, 10..120),
            prop::collection::vec(80.0f64..330.0, 120),
            prop::option::of(1usize..160),
        )
            .prop_map(|(steps, speeds, gear_len)| {
                let mut distance = vec![0.];
                for step in steps {
                    let next = distance[distance.len() - 1] + step;
                    distance.push(next);
                }
                // make sure the lap is long enough to be valid
                let len = distance.len();
                distance[len - 1] += MIN_LAP_DISTANCE_M;

                let mut extras = BTreeMap::new();
                if let Some(gear_len) = gear_len {
                    extras.insert(Channel::Gear, vec![3.; gear_len]);
                }
                TelemetryTrace {
                    x: distance.clone(),
                    y: distance.iter().map(|d| d * 0.5).collect(),
                    speed: speeds[..len].to_vec(),
                    distance,
                    extras,
                }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_every_column_has_resolution_entries(
            a in arb_trace(),
            b in arb_trace(),
            resolution in 2usize..400,
        ) {
            let frame = dominance(&a, &b, resolution).unwrap();
            prop_assert_eq!(frame.distance.len(), resolution);
            prop_assert_eq!(frame.x.len(), resolution);
            prop_assert_eq!(frame.y.len(), resolution);
            prop_assert_eq!(frame.speed1.len(), resolution);
            prop_assert_eq!(frame.speed2.len(), resolution);
            prop_assert_eq!(frame.dominance.len(), resolution);
            for values in frame.extras1.values().chain(frame.extras2.values()) {
                prop_assert_eq!(values.len(), resolution);
            }
        }

        #[test]
        fn prop_percentages_never_exceed_hundred(a in arb_trace(), b in arb_trace()) {
            let frame = dominance(&a, &b, DEFAULT_RESOLUTION).unwrap();
            prop_assert!(frame.d1_pct + frame.d2_pct <= 100);
            if frame.dominance.contains(&Dominance::Tie) {
                prop_assert!(frame.d1_pct + frame.d2_pct < 100);
            }
        }

        #[test]
        fn prop_dominance_is_deterministic(a in arb_trace(), b in arb_trace()) {
            let first = dominance(&a, &b, DEFAULT_RESOLUTION).unwrap();
            let second = dominance(&a, &b, DEFAULT_RESOLUTION).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
