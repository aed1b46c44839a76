//! Coordinate conversion between degrees/minutes/seconds and decimal degrees.

use std::fmt;

/// Compass hemisphere of a DMS coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// Parse an EXIF-style reference letter (`N`, `S`, `E`, `W`).
    pub fn from_ref(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N" => Some(Self::North),
            "S" => Some(Self::South),
            "E" => Some(Self::East),
            "W" => Some(Self::West),
            _ => None,
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Self::South | Self::West)
    }

    pub fn letter(self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
            Self::East => 'E',
            Self::West => 'W',
        }
    }
}

/// A coordinate in degrees, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    pub seconds: f64,
    pub hemisphere: Hemisphere,
}

impl fmt::Display for Dms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}°{}'{:.2}\"{}",
            self.degrees,
            self.minutes,
            self.seconds,
            self.hemisphere.letter()
        )
    }
}

/// Convert DMS parts to signed decimal degrees.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, hemisphere: Hemisphere) -> f64 {
    let value = degrees.abs() + minutes / 60.0 + seconds / 3600.0;
    if hemisphere.is_negative() { -value } else { value }
}

/// Convert signed decimal degrees to DMS. Seconds are rounded to two decimals;
/// the hemisphere follows the sign.
pub fn decimal_to_dms(decimal: f64, is_latitude: bool) -> Dms {
    let hemisphere = match (is_latitude, decimal < 0.0) {
        (true, false) => Hemisphere::North,
        (true, true) => Hemisphere::South,
        (false, false) => Hemisphere::East,
        (false, true) => Hemisphere::West,
    };

    let abs = decimal.abs();
    let mut degrees = abs.trunc() as u32;
    let minutes_full = (abs - abs.trunc()) * 60.0;
    let mut minutes = minutes_full.trunc() as u32;
    let mut seconds = ((minutes_full - minutes_full.trunc()) * 60.0 * 100.0).round() / 100.0;

    // Rounding can carry into the next unit.
    if seconds >= 60.0 {
        seconds -= 60.0;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        degrees += 1;
    }

    Dms {
        degrees,
        minutes,
        seconds,
        hemisphere,
    }
}

pub fn is_valid_latitude(latitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude)
}

pub fn is_valid_longitude(longitude: f64) -> bool {
    (-180.0..=180.0).contains(&longitude)
}

/// Fixed-precision decimal rendering, e.g. for display fields.
pub fn format_decimal(coordinate: f64, precision: usize) -> String {
    format!("{coordinate:.precision$}")
}
