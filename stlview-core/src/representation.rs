/// Rendering style applied to every actor
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    Points,
    Wireframe,
    #[default]
    Surface,
}

impl Representation {
    pub const ALL: [Representation; 3] = [
        Representation::Points,
        Representation::Wireframe,
        Representation::Surface,
    ];

    /// Selector code: 0 points, 1 wireframe, 2 surface
    pub fn code(self) -> u8 {
        match self {
            Representation::Points => 0,
            Representation::Wireframe => 1,
            Representation::Surface => 2,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Representation::Points => Representation::Wireframe,
            Representation::Wireframe => Representation::Surface,
            Representation::Surface => Representation::Points,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Representation::Points => "Points",
            Representation::Wireframe => "Wireframe",
            Representation::Surface => "Surface",
        }
    }
}

impl TryFrom<u8> for Representation {
    type Error = ViewerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Representation::Points),
            1 => Ok(Representation::Wireframe),
            2 => Ok(Representation::Surface),
            other => Err(ViewerError::UnknownRepresentation(other)),
        }
    }
}

impl FromStr for Representation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Representation::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown representation '{s}' (points, wireframe, surface)"))
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for r in Representation::ALL {
            assert_eq!(Representation::try_from(r.code()).unwrap(), r);
        }
        assert!(matches!(
            Representation::try_from(3),
            Err(ViewerError::UnknownRepresentation(3))
        ));
    }

    #[test]
    fn cycle_visits_all() {
        let mut r = Representation::Points;
        for _ in 0..3 {
            r = r.next();
        }
        assert_eq!(r, Representation::Points);
    }

    #[test]
    fn parses_case_insensitive() {
        assert_eq!("WireFrame".parse::<Representation>(), Ok(Representation::Wireframe));
        assert!("mesh".parse::<Representation>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Representation::Points).unwrap();
        assert_eq!(json, "\"points\"");
    }
}
