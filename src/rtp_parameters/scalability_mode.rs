use std::fmt;

use regex::Regex;

lazy_static! {
    static ref SCALABILITY_MODE_RE: Regex =
        Regex::new(r"^[LS]([1-9][0-9]?)T([1-9][0-9]?)(_KEY)?").unwrap();
}

/// ScalabilityMode is the parsed form of strings such as `L1T3`, `S3T3` or
/// `L3T3_KEY`. Anything unparsable reads as a single layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScalabilityMode {
    pub spatial_layers: u8,
    pub temporal_layers: u8,
    pub ksvc: bool,
}

impl Default for ScalabilityMode {
    fn default() -> Self {
        ScalabilityMode {
            spatial_layers: 1,
            temporal_layers: 1,
            ksvc: false,
        }
    }
}

impl From<&str> for ScalabilityMode {
    fn from(raw: &str) -> Self {
        let captures = match SCALABILITY_MODE_RE.captures(raw) {
            Some(captures) => captures,
            None => return ScalabilityMode::default(),
        };

        let layers = |i: usize| {
            captures
                .get(i)
                .and_then(|m| m.as_str().parse::<u8>().ok())
                .unwrap_or(1)
        };

        ScalabilityMode {
            spatial_layers: layers(1),
            temporal_layers: layers(2),
            ksvc: captures.get(3).is_some(),
        }
    }
}

impl fmt::Display for ScalabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.spatial_layers > 1 && !self.ksvc {
            "S"
        } else {
            "L"
        };
        write!(f, "{prefix}{}T{}", self.spatial_layers, self.temporal_layers)?;
        if self.ksvc {
            write!(f, "_KEY")?;
        }
        Ok(())
    }
}
