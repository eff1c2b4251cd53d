//! Physical parameters of a coupled 3D (tissue) / 1D (vessel network)
//! flow model.
//!
//! [`Param3d1d::build`] reads a configuration record and derives the
//! dimensionless radius, tissue, wall and bed conductivity fields on the
//! given tissue and vessel discretizations.

pub mod config;
pub mod datatypes;
pub mod discretization;
pub mod error;
pub mod export;
pub mod integration;
pub mod param;
pub mod radius;

pub use config::{JsonParamStore, ParamStore};
pub use datatypes::{
    Advisory, BuildOptions, CoefficientScheme, DirectCoefficients, PhysicalConstants, Vertex,
    UNRESOLVED_RADIUS,
};
pub use discretization::{Discretization, TissueGrid, VesselNetwork};
pub use error::{ParamError, Result};
pub use export::{FieldExporter, VtuExporter};
pub use integration::{compute_radius, LumpedIntegrator, RegionIntegrator, UniformIntegrator};
pub use param::{Collaborators, Param3d1d};
pub use radius::{BranchRadiusImporter, RadiusImporter};
