// Conversion of provider duration representations into seconds

use serde::{Deserialize, Serialize};
use uom::si::f64::Time;
use uom::si::time::{day, hour, minute, second};

/// A lap or sector duration as delivered by the timing provider.
///
/// Providers export either a plain number of seconds or a textual timedelta
/// such as `"1:23.456"` or `"0 days 00:01:23.456000"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDuration {
    Seconds(f64),
    Text(String),
}

impl RawDuration {
    /// Duration in seconds. `Ok(None)` marks an absent value (null, NaN,
    /// `NaT`), `Err` carries text that is not a duration at all.
    pub fn to_seconds(&self) -> Result<Option<f64>, String> {
        match self {
            RawDuration::Seconds(value) => Ok(value.is_finite().then_some(*value)),
            RawDuration::Text(text) => parse_duration_text(text),
        }
    }
}

impl From<f64> for RawDuration {
    fn from(value: f64) -> Self {
        RawDuration::Seconds(value)
    }
}

fn parse_duration_text(text: &str) -> Result<Option<f64>, String> {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nat")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("none")
    {
        return Ok(None);
    }

    // "0 days 00:01:23.456000"
    let (days, clock) = match trimmed.split_once("days") {
        Some((days, clock)) => (parse_component(days, trimmed)?, clock.trim()),
        None => match trimmed.split_once("day") {
            Some((days, clock)) => (parse_component(days, trimmed)?, clock.trim()),
            None => (0., trimmed),
        },
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let clock_time = match parts.as_slice() {
        [secs] => Time::new::<second>(parse_component(secs, trimmed)?),
        [mins, secs] => {
            Time::new::<minute>(parse_component(mins, trimmed)?)
                + Time::new::<second>(parse_component(secs, trimmed)?)
        }
        [hours, mins, secs] => {
            Time::new::<hour>(parse_component(hours, trimmed)?)
                + Time::new::<minute>(parse_component(mins, trimmed)?)
                + Time::new::<second>(parse_component(secs, trimmed)?)
        }
        _ => return Err(format!("unrecognised duration '{}'", text)),
    };

    let seconds = (clock_time + Time::new::<day>(days)).get::<second>();
    if seconds.is_finite() {
        Ok(Some(seconds))
    } else {
        Ok(None)
    }
}

fn parse_component(component: &str, whole: &str) -> Result<f64, String> {
    let component = component.trim();
    if component.is_empty() {
        return Ok(0.);
    }
    component
        .parse::<f64>()
        .map_err(|_| format!("unrecognised duration '{}'", whole))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seconds(raw: RawDuration) -> Option<f64> {
        raw.to_seconds().unwrap()
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a duration");
        assert!(
            (actual - expected).abs() < 1e-9,
            "{} != {}",
            actual,
            expected
        );
    }

    #[test]
    fn test_numeric_seconds() {
        assert_close(seconds(RawDuration::Seconds(83.456)), 83.456);
        assert_eq!(seconds(RawDuration::Seconds(f64::NAN)), None);
        assert_eq!(seconds(RawDuration::Seconds(f64::INFINITY)), None);
    }

    #[test]
    fn test_clock_text() {
        assert_close(seconds(RawDuration::Text("83.456".into())), 83.456);
        assert_close(seconds(RawDuration::Text("1:23.456".into())), 83.456);
        assert_close(seconds(RawDuration::Text("00:01:23.456".into())), 83.456);
    }

    #[test]
    fn test_timedelta_text() {
        assert_close(
            seconds(RawDuration::Text("0 days 00:01:23.456000".into())),
            83.456,
        );
        assert_close(
            seconds(RawDuration::Text("1 day 00:00:01".into())),
            86_401.,
        );
    }

    #[test]
    fn test_absent_markers() {
        assert_eq!(seconds(RawDuration::Text("NaT".into())), None);
        assert_eq!(seconds(RawDuration::Text("".into())), None);
        assert_eq!(seconds(RawDuration::Text("nan".into())), None);
    }

    #[test]
    fn test_invalid_text() {
        assert!(RawDuration::Text("fast".into()).to_seconds().is_err());
        assert!(RawDuration::Text("1:2:3:4".into()).to_seconds().is_err());
    }

    #[test]
    fn test_untagged_deserialization() {
        let number: RawDuration = serde_json::from_str("90.5").unwrap();
        assert_eq!(number, RawDuration::Seconds(90.5));
        let text: RawDuration = serde_json::from_str("\"1:30.500\"").unwrap();
        assert_close(seconds(text), 90.5);
    }
}
