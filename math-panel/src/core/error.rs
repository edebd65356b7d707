//! Error types
//!
//! Every per-point failure is an [`AnalysisError`]; sweeps record it against
//! the point and carry on with the next one.

use thiserror::Error;

/// Geometry rejected before assembly
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Mesh without panels
    #[error("mesh has no panels")]
    EmptyMesh,
    /// Node with NaN or infinite coordinates
    #[error("node {node} has non-finite coordinates")]
    NonFiniteNode {
        /// Node index
        node: usize,
    },
    /// Panel node index past the node arena
    #[error("panel {panel} references node {node} out of {count}")]
    NodeOutOfRange {
        /// Panel index
        panel: usize,
        /// Offending node index
        node: usize,
        /// Number of nodes
        count: usize,
    },
    /// Short edge or sliver angle
    #[error("panel {panel} is degenerate: {reason}")]
    DegeneratePanel {
        /// Panel index
        panel: usize,
        /// Which edge or angle
        reason: String,
    },
    /// Panel index past the panel arena
    #[error("{what} references panel {panel} out of {count}")]
    PanelOutOfRange {
        /// Referencing entity
        what: String,
        /// Offending panel index
        panel: usize,
        /// Number of panels
        count: usize,
    },
    /// Inconsistent reference dimensions or surface metadata
    #[error("inconsistent reference dimensions: {0}")]
    Reference(String),
}

/// Viscous loop failure context
#[derive(Debug, Clone, PartialEq)]
pub struct ViscousFailure {
    /// Surface name
    pub surface: String,
    /// Station index along the span, when the failure is local
    pub station: Option<usize>,
    /// Foil identifier of the station
    pub foil: Option<String>,
    /// Local Reynolds number
    pub reynolds: Option<f64>,
    /// Effective angle of attack (deg)
    pub alpha_deg: Option<f64>,
    /// What went wrong
    pub reason: String,
}

impl std::fmt::Display for ViscousFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface '{}'", self.surface)?;
        if let Some(station) = self.station {
            write!(f, " station {}", station)?;
        }
        if let Some(foil) = &self.foil {
            write!(f, " foil '{}'", foil)?;
        }
        if let Some(re) = self.reynolds {
            write!(f, " Re={:.0}", re)?;
        }
        if let Some(alpha) = self.alpha_deg {
            write!(f, " alpha={:.3}°", alpha)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Errors of a single operating point
#[derive(Error, Debug, Clone)]
pub enum AnalysisError {
    /// Geometry rejected before assembly
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
    /// Influence matrix could not be factorized
    #[error("singular influence matrix: {0}")]
    SingularMatrix(String),
    /// Viscous loop did not converge or left the polar data
    #[error("viscous loop diverged: {0}")]
    ViscousDivergence(ViscousFailure),
    /// Cancellation requested by the caller
    #[error("analysis cancelled")]
    Cancelled,
    /// Operating point cannot be solved (zero speed, no lift for balance...)
    #[error("invalid operating point: {0}")]
    InvalidOperatingPoint(String),
}

impl AnalysisError {
    /// True when the error comes from a cancellation request
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }
}

impl From<solvers::LuError> for AnalysisError {
    fn from(e: solvers::LuError) -> Self {
        AnalysisError::SingularMatrix(e.to_string())
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Parse error
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Value out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
