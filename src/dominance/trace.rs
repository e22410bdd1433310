// Telemetry samples and the columnar trace the dominance engine works on

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::interp::interp;
use crate::errors::SectorScopeError;

/// Laps shorter than this (in metres) are too sparse to resample
pub const MIN_LAP_DISTANCE_M: f64 = 100.;

/// Optional per-sample channels carried next to position and speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Gear,
    Drs,
    Rpm,
    Throttle,
    Brake,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Gear,
        Channel::Drs,
        Channel::Rpm,
        Channel::Throttle,
        Channel::Brake,
    ];

    fn sample_value(&self, sample: &TelemetrySample) -> Option<f64> {
        match self {
            Channel::Gear => sample.gear,
            Channel::Drs => sample.drs,
            Channel::Rpm => sample.rpm,
            Channel::Throttle => sample.throttle,
            Channel::Brake => sample.brake,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Gear => write!(f, "Gear"),
            Channel::Drs => write!(f, "DRS"),
            Channel::Rpm => write!(f, "RPM"),
            Channel::Throttle => write!(f, "Throttle"),
            Channel::Brake => write!(f, "Brake"),
        }
    }
}

/// One recorded telemetry sample, as exported by the provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Metres travelled from the start/finish line this lap
    pub distance: f64,
    pub x: f64,
    pub y: f64,
    /// km/h
    pub speed: f64,
    #[serde(default)]
    pub gear: Option<f64>,
    #[serde(default)]
    pub drs: Option<f64>,
    #[serde(default)]
    pub rpm: Option<f64>,
    /// 0 to 100
    #[serde(default)]
    pub throttle: Option<f64>,
    #[serde(default)]
    pub brake: Option<f64>,
}

/// Columnar form of one lap of telemetry.
///
/// `distance`, `x`, `y` and `speed` always have the same length. An extra
/// channel is aligned with the distance column when it has exactly one
/// value per sample; a channel with any other length is partial.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryTrace {
    pub distance: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub speed: Vec<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<Channel, Vec<f64>>,
}

impl TelemetryTrace {
    /// Build a trace from samples in lap order.
    ///
    /// Every extra channel that appears in at least one sample comes out
    /// aligned with the distance column. Samples missing a value take one
    /// interpolated by distance from the samples that carry it.
    pub fn from_samples(samples: &[TelemetrySample]) -> Self {
        let distance: Vec<f64> = samples.iter().map(|s| s.distance).collect();
        let mut extras = BTreeMap::new();
        for channel in Channel::ALL {
            let (known_distance, values): (Vec<f64>, Vec<f64>) = samples
                .iter()
                .filter_map(|sample| Some((sample.distance, channel.sample_value(sample)?)))
                .unzip();
            if values.is_empty() {
                continue;
            }
            let values = if values.len() == samples.len() {
                values
            } else {
                interp(&distance, &known_distance, &values)
            };
            extras.insert(channel, values);
        }
        Self {
            x: samples.iter().map(|s| s.x).collect(),
            y: samples.iter().map(|s| s.y).collect(),
            speed: samples.iter().map(|s| s.speed).collect(),
            distance,
            extras,
        }
    }

    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    /// Distance covered by the lap, i.e. the last recorded distance.
    pub fn total_distance(&self) -> Option<f64> {
        self.distance.last().copied()
    }

    pub fn is_aligned(&self, channel: Channel) -> bool {
        self.extras
            .get(&channel)
            .is_some_and(|values| values.len() == self.distance.len())
    }

    /// Check that the trace can be resampled and return its total distance.
    pub fn validate(&self, label: &str) -> Result<f64, SectorScopeError> {
        let len = self.distance.len();
        if self.x.len() != len || self.y.len() != len || self.speed.len() != len {
            return Err(SectorScopeError::validation(format!(
                "telemetry for {} has mismatched channel lengths (distance {}, x {}, y {}, speed {})",
                label,
                len,
                self.x.len(),
                self.y.len(),
                self.speed.len()
            )));
        }
        if len < 2 {
            return Err(SectorScopeError::validation(format!(
                "telemetry for {} has {} samples, at least 2 are required",
                label, len
            )));
        }
        if let Some(index) = self.distance.iter().position(|d| !d.is_finite()) {
            return Err(SectorScopeError::validation(format!(
                "telemetry for {} has a non-finite distance at sample {}",
                label, index
            )));
        }
        if let Some(index) = self.distance.windows(2).position(|w| w[1] < w[0]) {
            return Err(SectorScopeError::validation(format!(
                "telemetry for {} goes backwards at sample {}",
                label,
                index + 1
            )));
        }

        let total = self.distance[len - 1];
        if total < MIN_LAP_DISTANCE_M {
            return Err(SectorScopeError::validation(format!(
                "telemetry for {} covers only {:.1}m, at least {}m are required",
                label, total, MIN_LAP_DISTANCE_M
            )));
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(distance: f64, gear: Option<f64>) -> TelemetrySample {
        TelemetrySample {
            distance,
            x: distance,
            y: 0.,
            speed: 200.,
            gear,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_samples_collects_extras() {
        let samples = vec![
            sample(0., Some(3.)),
            sample(100., Some(4.)),
            sample(200., None),
        ];
        let trace = TelemetryTrace::from_samples(&samples);

        assert_eq!(trace.len(), 3);
        // trailing gap holds the last known value
        assert_eq!(trace.extras.get(&Channel::Gear), Some(&vec![3., 4., 4.]));
        assert!(trace.is_aligned(Channel::Gear));
        assert!(!trace.extras.contains_key(&Channel::Rpm));
        assert_eq!(trace.total_distance(), Some(200.));
    }

    #[test]
    fn test_missing_channel_values_keep_their_distance() {
        let samples = vec![
            sample(0., Some(2.)),
            sample(50., None),
            sample(100., Some(4.)),
            sample(150., None),
            sample(200., Some(6.)),
        ];
        let trace = TelemetryTrace::from_samples(&samples);
        assert_eq!(trace.extras[&Channel::Gear], vec![2., 3., 4., 5., 6.]);
    }

    #[test]
    fn test_validate_accepts_duplicate_distances() {
        let trace = TelemetryTrace::from_samples(&[
            sample(0., None),
            sample(50., None),
            sample(50., None),
            sample(150., None),
        ]);
        assert_eq!(trace.validate("VER").unwrap(), 150.);
    }

    #[test]
    fn test_validate_rejects_sparse_traces() {
        let single = TelemetryTrace::from_samples(&[sample(500., None)]);
        assert!(matches!(
            single.validate("VER"),
            Err(SectorScopeError::Validation { .. })
        ));

        let short = TelemetryTrace::from_samples(&[sample(0., None), sample(99.9, None)]);
        assert!(short.validate("VER").is_err());
    }

    #[test]
    fn test_validate_rejects_backwards_distance() {
        let trace = TelemetryTrace::from_samples(&[
            sample(0., None),
            sample(300., None),
            sample(200., None),
        ]);
        assert!(trace.validate("VER").is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_columns() {
        let mut trace = TelemetryTrace::from_samples(&[sample(0., None), sample(300., None)]);
        trace.speed.pop();
        assert!(trace.validate("VER").is_err());
    }

    #[test]
    fn test_sample_json_shape() {
        let sample: TelemetrySample =
            serde_json::from_str(r#"{"distance": 12.5, "x": 1.0, "y": 2.0, "speed": 301.0, "gear": 8}"#)
                .unwrap();
        assert_eq!(sample.gear, Some(8.));
        assert_eq!(sample.drs, None);
    }
}
