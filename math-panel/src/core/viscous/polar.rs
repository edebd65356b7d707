//! Two-dimensional section polars
//!
//! The solver only talks to [`PolarProvider`]. Two providers ship with the
//! crate:
//!
//! - [`PolarTable`]: tabulated polars per foil at several Reynolds numbers,
//!   interpolated linearly in angle and Reynolds number
//! - [`ThinAirfoilPolar`]: analytic lift slope with a parabolic drag polar,
//!   handy for tests and quick estimates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core::constants::PI2;
use crate::core::error::ConfigError;

/// What a lookup is keyed on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolarQuery {
    /// Angle of attack (deg)
    Alpha(f64),
    /// Lift coefficient
    Cl(f64),
}

/// One point of a section polar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarSample {
    /// Angle of attack (deg)
    pub alpha_deg: f64,
    /// Lift coefficient
    pub cl: f64,
    /// Profile drag coefficient
    pub cd: f64,
    /// Quarter-chord pitching moment coefficient
    #[serde(default)]
    pub cm: f64,
    /// Upper-side transition location (x/c)
    #[serde(default = "default_transition")]
    pub xtr_top: f64,
    /// Lower-side transition location (x/c)
    #[serde(default = "default_transition")]
    pub xtr_bot: f64,
}

fn default_transition() -> f64 {
    1.0
}

impl PolarSample {
    fn lerp(&self, other: &PolarSample, t: f64) -> PolarSample {
        let mix = |a: f64, b: f64| a + t * (b - a);
        PolarSample {
            alpha_deg: mix(self.alpha_deg, other.alpha_deg),
            cl: mix(self.cl, other.cl),
            cd: mix(self.cd, other.cd),
            cm: mix(self.cm, other.cm),
            xtr_top: mix(self.xtr_top, other.xtr_top),
            xtr_bot: mix(self.xtr_bot, other.xtr_bot),
        }
    }
}

/// Polar lookup failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolarError {
    /// No data for the foil
    #[error("no polar data for foil '{0}'")]
    UnknownFoil(String),
    /// Request outside the tabulated range
    #[error("{what} out of range for foil '{foil}' at Re={reynolds:.0}")]
    OutOfRange {
        /// Foil identifier
        foil: String,
        /// Reynolds number of the request
        reynolds: f64,
        /// Which quantity left the data
        what: String,
    },
}

/// Source of 2-D section characteristics
pub trait PolarProvider: Send + Sync {
    /// Section characteristics of `foil` at Reynolds number `reynolds`
    fn lookup(
        &self,
        foil: &str,
        reynolds: f64,
        query: PolarQuery,
    ) -> Result<PolarSample, PolarError>;

    /// Angle of zero lift (deg)
    fn zero_lift_angle(&self, foil: &str, reynolds: f64) -> Result<f64, PolarError> {
        Ok(self.lookup(foil, reynolds, PolarQuery::Cl(0.0))?.alpha_deg)
    }
}

/// Polar of one foil at one Reynolds number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polar {
    /// Reynolds number
    pub reynolds: f64,
    /// Points ordered by increasing angle
    pub points: Vec<PolarSample>,
}

impl Polar {
    /// Polar from unordered points
    pub fn new(reynolds: f64, mut points: Vec<PolarSample>) -> Self {
        points.sort_by(|a, b| a.alpha_deg.total_cmp(&b.alpha_deg));
        Self { reynolds, points }
    }

    fn at_alpha(&self, alpha_deg: f64) -> Option<PolarSample> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if alpha_deg < first.alpha_deg || alpha_deg > last.alpha_deg {
            return None;
        }
        let upper = self
            .points
            .iter()
            .position(|p| p.alpha_deg >= alpha_deg)?;
        if upper == 0 {
            return Some(*first);
        }
        let (a, b) = (&self.points[upper - 1], &self.points[upper]);
        let span = b.alpha_deg - a.alpha_deg;
        let t = if span > 0.0 {
            (alpha_deg - a.alpha_deg) / span
        } else {
            0.0
        };
        Some(a.lerp(b, t))
    }

    /// First crossing of `cl`, scanning up the linear range
    fn at_cl(&self, cl: f64) -> Option<PolarSample> {
        self.points.windows(2).find_map(|w| {
            let (a, b) = (&w[0], &w[1]);
            if b.cl <= a.cl || cl < a.cl || cl > b.cl {
                return None;
            }
            Some(a.lerp(b, (cl - a.cl) / (b.cl - a.cl)))
        })
    }
}

/// Tabulated polars, keyed by foil identifier
///
/// A foil with a single polar is used at any Reynolds number; with several
/// polars the Reynolds number must lie between the lowest and the highest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolarTable {
    /// Polars per foil, each list ordered by Reynolds number
    pub foils: BTreeMap<String, Vec<Polar>>,
}

impl PolarTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a polar, keeping the list ordered by Reynolds number
    ///
    /// A polar already stored at the same Reynolds number is replaced.
    pub fn insert(&mut self, foil: &str, polar: Polar) {
        let polars = self.foils.entry(foil.to_string()).or_default();
        polars.retain(|p| p.reynolds != polar.reynolds);
        polars.push(polar);
        polars.sort_by(|a, b| a.reynolds.total_cmp(&b.reynolds));
    }

    /// Load a table from JSON
    ///
    /// Two polars of one foil at the same Reynolds number are rejected.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut table: PolarTable = serde_json::from_str(json)?;
        for (foil, polars) in table.foils.iter_mut() {
            polars.sort_by(|a, b| a.reynolds.total_cmp(&b.reynolds));
            if let Some(pair) = polars.windows(2).find(|w| w[0].reynolds == w[1].reynolds) {
                return Err(ConfigError::Invalid(format!(
                    "foil '{}' has two polars at Re = {}",
                    foil, pair[0].reynolds
                )));
            }
        }
        Ok(table)
    }

    /// Load a table from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Sample an analytic polar at the given Reynolds numbers
    pub fn from_model(
        foil: &str,
        model: &ThinAirfoilPolar,
        reynolds: &[f64],
        alphas_deg: impl Iterator<Item = f64> + Clone,
    ) -> Self {
        let mut table = Self::new();
        for &re in reynolds {
            let points = alphas_deg
                .clone()
                .filter_map(|a| model.lookup(foil, re, PolarQuery::Alpha(a)).ok())
                .collect();
            table.insert(foil, Polar::new(re, points));
        }
        table
    }
}

impl PolarProvider for PolarTable {
    fn lookup(
        &self,
        foil: &str,
        reynolds: f64,
        query: PolarQuery,
    ) -> Result<PolarSample, PolarError> {
        let polars = self
            .foils
            .get(foil)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PolarError::UnknownFoil(foil.to_string()))?;
        let out_of_range = |what: &str| PolarError::OutOfRange {
            foil: foil.to_string(),
            reynolds,
            what: what.to_string(),
        };
        let sample = |polar: &Polar| match query {
            PolarQuery::Alpha(alpha) => polar.at_alpha(alpha).ok_or_else(|| out_of_range("angle of attack")),
            PolarQuery::Cl(cl) => polar.at_cl(cl).ok_or_else(|| out_of_range("lift coefficient")),
        };

        if polars.len() == 1 {
            return sample(&polars[0]);
        }
        let (lowest, highest) = (polars[0].reynolds, polars[polars.len() - 1].reynolds);
        if !(reynolds >= lowest && reynolds <= highest) {
            return Err(out_of_range("Reynolds number"));
        }
        let upper = polars
            .iter()
            .position(|p| p.reynolds >= reynolds)
            .unwrap_or(polars.len() - 1)
            .max(1);
        let (a, b) = (&polars[upper - 1], &polars[upper]);
        if b.reynolds <= a.reynolds {
            return sample(b);
        }
        let t = (reynolds - a.reynolds) / (b.reynolds - a.reynolds);
        Ok(sample(a)?.lerp(&sample(b)?, t))
    }
}

/// Analytic section model
///
/// `cl = slope · (α - α0)`, `cd = cd0 + k · cl²`, valid between the stall
/// angles and within the Reynolds range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinAirfoilPolar {
    /// Lift slope (per rad)
    pub lift_slope: f64,
    /// Zero-lift angle (deg)
    pub alpha_zero_deg: f64,
    /// Drag at zero lift
    pub cd0: f64,
    /// Drag growth with lift squared
    pub k: f64,
    /// Largest usable |α - α0| (deg)
    pub stall_deg: f64,
    /// Lowest Reynolds number
    pub reynolds_min: f64,
    /// Highest Reynolds number
    pub reynolds_max: f64,
    /// Per-foil Reynolds ranges overriding the global one
    pub foil_ranges: BTreeMap<String, (f64, f64)>,
}

impl Default for ThinAirfoilPolar {
    fn default() -> Self {
        Self {
            lift_slope: PI2,
            alpha_zero_deg: 0.0,
            cd0: 0.008,
            k: 0.005,
            stall_deg: 15.0,
            reynolds_min: 0.0,
            reynolds_max: f64::MAX,
            foil_ranges: BTreeMap::new(),
        }
    }
}

impl ThinAirfoilPolar {
    /// Restrict the Reynolds range of one foil
    pub fn with_foil_range(mut self, foil: &str, min: f64, max: f64) -> Self {
        self.foil_ranges.insert(foil.to_string(), (min, max));
        self
    }

    fn sample(&self, alpha_deg: f64) -> PolarSample {
        let cl = self.lift_slope * (alpha_deg - self.alpha_zero_deg).to_radians();
        PolarSample {
            alpha_deg,
            cl,
            cd: self.cd0 + self.k * cl * cl,
            cm: 0.0,
            xtr_top: 1.0,
            xtr_bot: 1.0,
        }
    }
}

impl PolarProvider for ThinAirfoilPolar {
    fn lookup(
        &self,
        foil: &str,
        reynolds: f64,
        query: PolarQuery,
    ) -> Result<PolarSample, PolarError> {
        let (min, max) = self
            .foil_ranges
            .get(foil)
            .copied()
            .unwrap_or((self.reynolds_min, self.reynolds_max));
        let out_of_range = |what: &str| PolarError::OutOfRange {
            foil: foil.to_string(),
            reynolds,
            what: what.to_string(),
        };
        if !(reynolds >= min && reynolds <= max) {
            return Err(out_of_range("Reynolds number"));
        }
        let alpha_deg = match query {
            PolarQuery::Alpha(alpha) => alpha,
            PolarQuery::Cl(cl) => self.alpha_zero_deg + (cl / self.lift_slope).to_degrees(),
        };
        if (alpha_deg - self.alpha_zero_deg).abs() > self.stall_deg {
            return Err(out_of_range("angle of attack"));
        }
        Ok(self.sample(alpha_deg))
    }

    fn zero_lift_angle(&self, _foil: &str, _reynolds: f64) -> Result<f64, PolarError> {
        Ok(self.alpha_zero_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> PolarTable {
        let model = ThinAirfoilPolar {
            alpha_zero_deg: -2.0,
            ..ThinAirfoilPolar::default()
        };
        let mut table = PolarTable::from_model(
            "naca2412",
            &model,
            &[1e5, 1e6],
            (-10..=10).map(|a| a as f64),
        );
        // Higher Reynolds number: less drag
        if let Some(polars) = table.foils.get_mut("naca2412") {
            for p in &mut polars[1].points {
                p.cd -= 0.002;
            }
        }
        table
    }

    #[test]
    fn test_table_interpolates_alpha_and_reynolds() {
        let table = table();
        let s = table.lookup("naca2412", 5.5e5, PolarQuery::Alpha(3.0)).unwrap();
        assert_relative_eq!(s.cl, PI2 * 5.0_f64.to_radians(), epsilon = 1e-12);
        let cd_low = 0.008 + 0.005 * s.cl * s.cl;
        assert_relative_eq!(s.cd, cd_low - 0.001, epsilon = 1e-12);

        // Between tabulated angles the coefficients are linear
        let mid = table.lookup("naca2412", 1e5, PolarQuery::Alpha(3.5)).unwrap();
        let (a, b) = (
            table.lookup("naca2412", 1e5, PolarQuery::Alpha(3.0)).unwrap(),
            table.lookup("naca2412", 1e5, PolarQuery::Alpha(4.0)).unwrap(),
        );
        assert_relative_eq!(mid.cd, 0.5 * (a.cd + b.cd), epsilon = 1e-12);
    }

    #[test]
    fn test_table_zero_lift_angle() {
        let table = table();
        let alpha0 = table.zero_lift_angle("naca2412", 2e5).unwrap();
        assert_relative_eq!(alpha0, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_table_out_of_range() {
        let table = table();
        let err = table.lookup("naca2412", 5e6, PolarQuery::Alpha(0.0)).unwrap_err();
        assert!(matches!(err, PolarError::OutOfRange { .. }));
        let err = table.lookup("naca2412", 5e5, PolarQuery::Alpha(20.0)).unwrap_err();
        assert!(err.to_string().contains("angle of attack"));
        assert_eq!(
            table.lookup("clarky", 5e5, PolarQuery::Alpha(0.0)).unwrap_err(),
            PolarError::UnknownFoil("clarky".to_string())
        );
    }

    #[test]
    fn test_table_json_round_trip() {
        let json = serde_json::to_string(&table()).unwrap();
        let back = PolarTable::from_json(&json).unwrap();
        assert_eq!(back.foils["naca2412"].len(), 2);
    }

    #[test]
    fn test_duplicate_reynolds_number() {
        let mut table = table();
        let replacement = table.foils["naca2412"][0].clone();
        table.insert("naca2412", replacement);
        assert_eq!(table.foils["naca2412"].len(), 2);

        // Same Reynolds number twice in a file
        let mut doubled = table.clone();
        if let Some(polars) = doubled.foils.get_mut("naca2412") {
            polars[1].reynolds = polars[0].reynolds;
        }
        let json = serde_json::to_string(&doubled).unwrap();
        let err = PolarTable::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("two polars"), "{err}");

        // Built by hand, the lookup still returns finite coefficients
        let s = doubled.lookup("naca2412", 1e5, PolarQuery::Alpha(2.0)).unwrap();
        assert!(s.cl.is_finite() && s.cd.is_finite());
        let expected = table.lookup("naca2412", 1e5, PolarQuery::Alpha(2.0)).unwrap();
        assert_relative_eq!(s.cl, expected.cl, epsilon = 1e-12);
    }

    #[test]
    fn test_thin_airfoil_foil_range() {
        let model = ThinAirfoilPolar::default().with_foil_range("tip", 1e5, 1e6);
        assert!(model.lookup("root", 5e7, PolarQuery::Alpha(2.0)).is_ok());
        assert!(model.lookup("tip", 5e6, PolarQuery::Alpha(2.0)).is_err());
        let s = model.lookup("tip", 5e5, PolarQuery::Cl(0.5)).unwrap();
        assert_relative_eq!(s.cl, 0.5, epsilon = 1e-12);
    }
}
