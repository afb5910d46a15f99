pub mod driver;

pub mod protocol;

pub use self::driver::{MonotonicClock, Slt5006, Transport};

use core::fmt;

/// (Thermodynamic) Temperature.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Temperature(f64);

impl Temperature {
    pub const fn from_degree_celsius(degree_celsius: f64) -> Self {
        Self(degree_celsius)
    }

    pub const fn to_degree_celsius(self) -> f64 {
        self.0
    }
}

impl From<f64> for Temperature {
    fn from(from: f64) -> Self {
        Temperature(from)
    }
}

impl From<Temperature> for f64 {
    fn from(from: Temperature) -> Self {
        from.0
    }
}

/// Electrical conductivity (EC).
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ElectricalConductivity(f64);

impl ElectricalConductivity {
    pub const fn from_decisiemens_per_meter(decisiemens_per_meter: f64) -> Self {
        Self(decisiemens_per_meter)
    }

    pub const fn to_decisiemens_per_meter(self) -> f64 {
        self.0
    }

    pub const fn min_decisiemens_per_meter() -> f64 {
        0.0
    }

    pub const fn min() -> Self {
        Self::from_decisiemens_per_meter(Self::min_decisiemens_per_meter())
    }

    pub fn is_valid(self) -> bool {
        self >= Self::min()
    }
}

/// Volumetric water content (VWC).
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct VolumetricWaterContent(f64);

impl VolumetricWaterContent {
    pub const fn from_percent(percent: f64) -> Self {
        Self(percent)
    }

    pub const fn to_percent(self) -> f64 {
        self.0
    }

    pub const fn min_percent() -> f64 {
        0.0
    }

    pub const fn max_percent() -> f64 {
        100.0
    }

    pub const fn min() -> Self {
        Self::from_percent(Self::min_percent())
    }

    pub const fn max() -> Self {
        Self::from_percent(Self::max_percent())
    }

    pub fn is_valid(self) -> bool {
        self >= Self::min() && self <= Self::max()
    }
}

/// One decoded sensor state: all six calibrated readings of a single
/// READ_RESULT reply. Zeroed until the first successful decode, afterwards
/// only ever overwritten as a whole.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Measurement {
    pub temperature: Temperature,
    pub bulk_ec: ElectricalConductivity,
    pub rockwool_water_content: VolumetricWaterContent,
    pub water_content: VolumetricWaterContent,
    pub coco_water_content: VolumetricWaterContent,
    pub pore_ec: ElectricalConductivity,
}

/// Outcome of a single receive window, overwritten on every attempt.
///
/// The discriminants are the sensor's own result codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusCode {
    Success = 0,
    MeasurementNotComplete = 2,
    NoResponse = 3,
}

impl StatusCode {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use StatusCode::*;
        match self {
            Success => write!(f, "Success"),
            MeasurementNotComplete => write!(f, "Measurement not complete"),
            NoResponse => write!(f, "No response"),
        }
    }
}
