use crate::{CoreResult, RecorderError};

use std::{fmt, panic::Location, str::FromStr};

use error_location::ErrorLocation;

/// Output resolutions the recorder offers.
pub const SUPPORTED_RESOLUTIONS: &[(u32, u32)] = &[
    (1024, 768),
    (1280, 720),
    (1280, 1024),
    (1360, 768),
    (1440, 900),
    (1600, 900),
    (1680, 1050),
    (1920, 1080),
    (1920, 1200),
    (2560, 1080),
    (2560, 1440),
    (2560, 1600),
    (3440, 1440),
    (3840, 1080),
    (3840, 1600),
    (3840, 2160),
    (5120, 1440),
];

/// A `WIDTHxHEIGHT` output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Whether this resolution is in [`SUPPORTED_RESOLUTIONS`].
    pub fn is_supported(&self) -> bool {
        SUPPORTED_RESOLUTIONS.contains(&(self.width, self.height))
    }
}

impl FromStr for Resolution {
    type Err = RecorderError;

    #[track_caller]
    fn from_str(s: &str) -> CoreResult<Self> {
        let invalid = || RecorderError::InvalidConfig {
            reason: format!("Resolution {:?} is not of the form WIDTHxHEIGHT", s),
            location: ErrorLocation::from(Location::caller()),
        };

        let (w, h) = s.trim().split_once('x').ok_or_else(invalid)?;
        let width = w.parse::<u32>().map_err(|_| invalid())?;
        let height = h.parse::<u32>().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
