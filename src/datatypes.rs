use std::f64::consts::PI;

/// Fill value of the radius field when the radius file could not be read.
/// Every coefficient derived from it is NaN as well.
pub const UNRESOLVED_RADIUS: f64 = f64::NAN;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64, z: f64) -> Vertex {
        Vertex { x, y, z }
    }

    pub fn distance(&self, other: &Vertex) -> f64 {
        f64::sqrt(
            f64::powi(self.x - other.x, 2)
                + f64::powi(self.y - other.y, 2)
                + f64::powi(self.z - other.z, 2),
        )
    }
}

/// VTK cell kinds used by the discretizations
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Line = 3,
    PolyLine = 4,
    Hexahedron = 12,
}

impl CellKind {
    pub fn vtk_type(&self) -> u8 {
        *self as u8
    }

    pub fn from_vtk_type(value: u8) -> Option<CellKind> {
        match value {
            3 => Some(CellKind::Line),
            4 => Some(CellKind::PolyLine),
            12 => Some(CellKind::Hexahedron),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub kind: CellKind,
    pub nodes: Vec<usize>,
}

/// Dimensionless conductivities given directly in the configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectCoefficients {
    /// Tissue conductivity
    pub kt: f64,
    /// Vessel wall conductivity
    pub q: f64,
    /// Vessel bed conductivity
    pub kv: f64,
}

/// Dimensional physical constants (microcirculation applications)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    /// Average interstitial pressure [Pa]
    pub p: f64,
    /// Characteristic flow speed in the capillary bed [m/s]
    pub u: f64,
    /// Characteristic length of the problem [m]
    pub d: f64,
    /// Hydraulic conductivity of the interstitium [m^2]
    pub k: f64,
    /// Viscosity of the fluid [kg/ms]
    pub mu: f64,
    /// Hydraulic conductivity of the capillary walls [m^2 s/kg]
    pub lp: f64,
}

impl PhysicalConstants {
    /// Dimensionless tissue conductivity `k P / (mu U d)`
    pub fn tissue_conductivity(&self) -> f64 {
        self.k / self.mu * self.p / self.u / self.d
    }

    /// Dimensionless bed conductivity of a vessel of (dimensionless) radius `r`
    ///
    /// # Arguments
    /// * `r` - The dimensionless radius
    ///
    /// # Returns
    /// `(pi/8) P d / (mu U) r^4`
    pub fn bed_conductivity(&self, r: f64) -> f64 {
        PI / 8.0 / self.mu * self.p * self.d / self.u * r * r * r * r
    }

    /// Dimensionless wall conductivity of a vessel of (dimensionless) radius `r`
    ///
    /// # Arguments
    /// * `r` - The dimensionless radius
    ///
    /// # Returns
    /// `2 pi Lp P / U r`
    pub fn wall_conductivity(&self, r: f64) -> f64 {
        2.0 * PI * self.lp * self.p / self.u * r
    }
}

/// How the conductivities are obtained. Selected once per build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoefficientScheme {
    Direct(DirectCoefficients),
    Dimensional(PhysicalConstants),
}

/// Non-fatal conditions found during a build
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// The radius file could not be opened; the radius field holds
    /// [`UNRESOLVED_RADIUS`]
    RadiusSourceUnavailable { path: String, reason: String },
    /// `Q = 0`: the 3D and 1D problems are uncoupled
    UncoupledProblem,
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::RadiusSourceUnavailable { path, reason } => {
                write!(f, "impossible to read from file {path}: {reason}")
            }
            Advisory::UncoupledProblem => write!(f, "uncoupled problem (Q=0)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Report each build stage at info level and show progress bars
    pub verbose: bool,
}
