//! Measurement types: what the sensor transport hands to the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two measurement streams produced by the meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Headshot,
    Coilshot,
}

impl Channel {
    /// Both channels, in display order.
    pub const ALL: [Channel; 2] = [Channel::Headshot, Channel::Coilshot];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Headshot => "headshot",
            Channel::Coilshot => "coilshot",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Headshot => f.write_str("Headshot"),
            Channel::Coilshot => f.write_str("Coilshot"),
        }
    }
}

/// A single reading from a meter.
///
/// Immutable once created. The engine never mutates a measurement; it copies
/// the values it needs into a slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    channel: Channel,
    current: f64,
    duration: f64,
}

impl Measurement {
    pub fn new(channel: Channel, current: f64, duration: f64) -> Self {
        Self {
            channel,
            current,
            duration,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Shot duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Whether the reading carries values the engine can classify.
    ///
    /// The current must be finite; the duration must be finite and non-negative.
    pub fn is_numeric(&self) -> bool {
        self.current.is_finite() && self.duration.is_finite() && self.duration >= 0.0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: current={:.2}, duration={:.3}",
            self.channel, self.current, self.duration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_serializes_camel_case() {
        let json = serde_json::to_string(&Channel::Coilshot).unwrap();
        assert_eq!(json, "\"coilshot\"");
    }

    #[test]
    fn non_finite_current_is_not_numeric() {
        assert!(!Measurement::new(Channel::Headshot, f64::NAN, 0.1).is_numeric());
        assert!(!Measurement::new(Channel::Headshot, f64::INFINITY, 0.1).is_numeric());
    }

    #[test]
    fn negative_duration_is_not_numeric() {
        assert!(!Measurement::new(Channel::Coilshot, 4.0, -0.5).is_numeric());
    }

    #[test]
    fn display_matches_meter_readout() {
        let m = Measurement::new(Channel::Headshot, 5.0, 0.25);
        assert_eq!(m.to_string(), "Headshot: current=5.00, duration=0.250");
    }
}
