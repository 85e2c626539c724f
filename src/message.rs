//! The Kismet meta-GPS wire message and the fix translation rule.

use serde::{Deserialize, Serialize};

use crate::gpsd::{FixMode, LocationFix};

/// One location update in the schema Kismet's meta-GPS endpoint expects.
///
/// Serialized as a single compact JSON object per send. Optional keys are
/// omitted entirely rather than sent as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lon: f64,
    /// Altitude in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    /// Speed in kilometers per hour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spd: Option<f64>,
}

impl LocationUpdate {
    /// Translate one gpsd fix into the Kismet schema.
    ///
    /// `alt` is attached only for 3-D fixes. `spd` carries km/h and is
    /// attached only while the reported speed is non-positive.
    pub fn from_fix(fix: &LocationFix) -> Self {
        Self {
            lat: fix.latitude,
            lon: fix.longitude,
            alt: match fix.mode {
                FixMode::Fix3d => fix.altitude_m,
                _ => None,
            },
            spd: (fix.speed_mps <= 0.0).then(|| fix.speed_mps * (3600.0 / 1000.0)),
        }
    }
}
