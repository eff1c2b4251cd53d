//! Dimensionless parameters of the coupled 3D/1D model:
//! - radius `R'(s)`,
//! - tissue permeability `kt`,
//! - vessel wall permeability `Q(s)`,
//! - vessel bed permeability `kv(s)`,
//!
//! `s` being the arc length over the vessel network. `kt` is assumed to be
//! constant.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indicatif::ProgressBar;
use nalgebra::DVector;

use crate::{
    config::{self, ParamStore},
    datatypes::{
        Advisory, BuildOptions, CoefficientScheme, DirectCoefficients, PhysicalConstants,
        UNRESOLVED_RADIUS,
    },
    discretization::Discretization,
    error::{ParamError, Result},
    export::{FieldExporter, VtuExporter},
    integration::{compute_radius, RegionIntegrator},
    radius::{BranchRadiusImporter, RadiusImporter},
};

/// External services used during a build
#[derive(Clone, Copy)]
pub struct Collaborators<'c> {
    pub importer: &'c dyn RadiusImporter,
    pub exporter: &'c dyn FieldExporter,
}

impl Default for Collaborators<'static> {
    fn default() -> Self {
        Collaborators {
            importer: &BranchRadiusImporter,
            exporter: &VtuExporter,
        }
    }
}

/// Physical parameters of the coupled 3D/1D model
pub struct Param3d1d<'a> {
    scheme: CoefficientScheme,
    /// Dimensionless average radius of the vessel network
    rav: f64,
    r: DVector<f64>,
    kt: DVector<f64>,
    q: DVector<f64>,
    kv: DVector<f64>,
    mf_datav: &'a dyn Discretization,
    advisories: Vec<Advisory>,
}

/// Logs a build stage, at info level only when verbose
fn stage(options: &BuildOptions, message: &str) {
    if options.verbose {
        log::info!("{message}");
    } else {
        log::debug!("{message}");
    }
}

impl CoefficientScheme {
    /// Reads the conductivity inputs for the selected mode
    ///
    /// # Arguments
    /// * `store` - The configuration record
    /// * `nondimensional` - Whether the record holds dimensionless conductivities
    pub fn from_store(store: &dyn ParamStore, nondimensional: bool) -> Result<CoefficientScheme> {
        if nondimensional {
            return Ok(CoefficientScheme::Direct(DirectCoefficients {
                kt: store.real_value("Kt", Some("dimensionless tissue conductivity"))?,
                q: store.real_value("Q", Some("dimensionless wall conductivity"))?,
                kv: store.real_value("Kv", Some("dimensionless bed conductivity"))?,
            }));
        }

        Ok(CoefficientScheme::Dimensional(PhysicalConstants {
            p: store.real_value("P", Some("average interstitial pressure [Pa]"))?,
            u: store.real_value(
                "U",
                Some("characteristic flow speed in the capillary bed [m/s]"),
            )?,
            d: store.real_value("d", Some("characteristic length of the problem [m]"))?,
            k: store.real_value("k", Some("permeability of the interstitium [m^2]"))?,
            mu: store.real_value("mu", Some("fluid viscosity [kg/ms]"))?,
            lp: store.real_value("Lp", Some("permeability of the vessel walls [m^2 s/kg]"))?,
        }))
    }
}

impl<'a> Param3d1d<'a> {
    /// Builds the dimensionless parameter fields with the default radius
    /// importer and vtu exporter
    ///
    /// # Arguments
    /// * `store` - The configuration record
    /// * `mf_datat` - The tissue data discretization
    /// * `mf_datav` - The vessel data discretization
    /// * `options` - Build options
    pub fn build(
        store: &dyn ParamStore,
        mf_datat: &dyn Discretization,
        mf_datav: &'a dyn Discretization,
        options: &BuildOptions,
    ) -> Result<Param3d1d<'a>> {
        Param3d1d::build_with(store, mf_datat, mf_datav, Collaborators::default(), options)
    }

    /// Builds the dimensionless parameter fields
    ///
    /// # Arguments
    /// * `store` - The configuration record
    /// * `mf_datat` - The tissue data discretization
    /// * `mf_datav` - The vessel data discretization
    /// * `collaborators` - Radius importer and field exporter
    /// * `options` - Build options
    ///
    /// Keys are read in a fixed order: the three flags, then the radius
    /// inputs (`RADIUS` and `d`, or `RFILE`), then the conductivity inputs,
    /// and `OutputDir` last. When exporting, `OutputDir` names a directory:
    /// `radius.vtu` and `conductivity.vtu` are written inside it, and it is
    /// created if missing. It is never used as a file name prefix.
    ///
    /// # Returns
    /// The built parameters, or the first fatal error. Non-fatal findings are
    /// logged and kept in [`Param3d1d::advisories`].
    pub fn build_with(
        store: &dyn ParamStore,
        mf_datat: &dyn Discretization,
        mf_datav: &'a dyn Discretization,
        collaborators: Collaborators<'_>,
        options: &BuildOptions,
    ) -> Result<Param3d1d<'a>> {
        let dof_datat = mf_datat.nb_dof();
        let dof_datav = mf_datav.nb_dof();

        let import_radius =
            store.bool_value(config::IMPORT_RADIUS, Some("import radius from file"))?;
        let nondim_param =
            store.bool_value(config::TEST_PARAM, Some("dimensionless parameters"))?;
        if import_radius && nondim_param {
            return Err(ParamError::Configuration(
                "try to import non constant (dimensionless) radius: \
                 please insert dimensional parameters"
                    .to_owned(),
            ));
        }
        let export_param = store.bool_value(config::EXPORT_PARAM, Some("export parameters"))?;

        let mut advisories: Vec<Advisory> = Vec::new();

        stage(options, "assembling dimensionless radius R'...");
        let (r, rav) = if !import_radius {
            let radius = store.real_value(config::RADIUS, Some("Vessel average radius"))?;
            let rav = if nondim_param {
                radius
            } else {
                radius
                    / store.real_value("d", Some("characteristic length of the problem [m]"))?
            };
            (DVector::from_element(dof_datav, rav), rav)
        } else {
            let rfile = store.string_value(config::RFILE, Some("radius file"))?;
            log::info!("importing radius values from file {rfile}...");
            let r = match File::open(&rfile) {
                Ok(f) => collaborators
                    .importer
                    .import(&mut BufReader::new(f), mf_datav)?,
                Err(err) => {
                    let advisory = Advisory::RadiusSourceUnavailable {
                        path: rfile,
                        reason: err.to_string(),
                    };
                    log::warn!("{advisory}; radius values are undefined");
                    advisories.push(advisory);
                    DVector::from_element(dof_datav, UNRESOLVED_RADIUS)
                }
            };
            if r.len() != dof_datav {
                return Err(ParamError::Import(format!(
                    "imported {} radius values for {} vessel DOFs",
                    r.len(),
                    dof_datav
                )));
            }
            let rav = if r.is_empty() { UNRESOLVED_RADIUS } else { r.mean() };
            (r, rav)
        };

        let scheme = CoefficientScheme::from_store(store, nondim_param)?;

        stage(options, "assembling dimensionless permeabilities kt, Q, kv...");
        let (kt, q, kv) = match &scheme {
            CoefficientScheme::Direct(c) => (
                DVector::from_element(dof_datat, c.kt),
                DVector::from_element(dof_datav, c.q),
                DVector::from_element(dof_datav, c.kv),
            ),
            CoefficientScheme::Dimensional(c) => {
                let kt = DVector::from_element(dof_datat, c.tissue_conductivity());

                let bar = if options.verbose {
                    ProgressBar::new(r.len() as u64)
                } else {
                    ProgressBar::hidden()
                };
                let mut kv: Vec<f64> = Vec::with_capacity(r.len());
                let mut q: Vec<f64> = Vec::with_capacity(r.len());
                for &radius in r.iter() {
                    kv.push(c.bed_conductivity(radius));
                    q.push(c.wall_conductivity(radius));
                    bar.inc(1);
                }
                bar.finish_and_clear();

                (kt, DVector::from_vec(q), DVector::from_vec(kv))
            }
        };

        validate(&kt, &q, &kv, &mut advisories)?;

        if export_param {
            let odir = store.string_value(config::OUTPUT_DIR, Some("OutputDirectory"))?;
            let odir = Path::new(&odir);
            collaborators
                .exporter
                .export(&odir.join("radius.vtu"), mf_datav, &[("R", &r)])?;
            collaborators
                .exporter
                .export(&odir.join("conductivity.vtu"), mf_datav, &[("Q", &q)])?;
        }

        Ok(Param3d1d {
            scheme,
            rav,
            r,
            kt,
            q,
            kv,
            mf_datav,
            advisories,
        })
    }

    /// Radius at a given dof
    pub fn r(&self, i: usize) -> f64 {
        self.r[i]
    }

    /// Tissue permeability at a given dof
    pub fn kt(&self, i: usize) -> f64 {
        self.kt[i]
    }

    /// Vessel wall permeability at a given dof
    pub fn q(&self, i: usize) -> f64 {
        self.q[i]
    }

    /// Vessel bed permeability at a given dof
    pub fn kv(&self, i: usize) -> f64 {
        self.kv[i]
    }

    /// Average radius over a region of the vessel discretization
    ///
    /// # Arguments
    /// * `mim` - The integration rule
    /// * `region` - The vessel region, i.e. the branch
    pub fn radius_on_region(&self, mim: &dyn RegionIntegrator, region: usize) -> Result<f64> {
        compute_radius(mim, self.mf_datav, &self.r, region)
    }

    /// The scalar average radius. For imported radii this is the
    /// arithmetic mean of the field.
    pub fn average_radius(&self) -> f64 {
        self.rav
    }

    pub fn radius(&self) -> &DVector<f64> {
        &self.r
    }

    /// Mutable radius field. Changes are not validated.
    pub fn radius_mut(&mut self) -> &mut DVector<f64> {
        &mut self.r
    }

    pub fn q_field(&self) -> &DVector<f64> {
        &self.q
    }

    /// Mutable wall permeability field. Changes are not validated.
    pub fn q_mut(&mut self) -> &mut DVector<f64> {
        &mut self.q
    }

    pub fn kt_field(&self) -> &DVector<f64> {
        &self.kt
    }

    pub fn kv_field(&self) -> &DVector<f64> {
        &self.kv
    }

    pub fn scheme(&self) -> &CoefficientScheme {
        &self.scheme
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// First entry of each field, labelled
    pub fn summary(&self) -> String {
        format!(
            "--- PHYSICAL PARAMS ------\n\
             \x20 R'     : {}\n\
             \x20 kappat : {}\n\
             \x20 Q      : {}\n\
             \x20 kappav : {}\n\
             --------------------------\n",
            self.r[0], self.kt[0], self.q[0], self.kv[0]
        )
    }
}

impl std::fmt::Display for Param3d1d<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::fmt::Debug for Param3d1d<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param3d1d")
            .field("scheme", &self.scheme)
            .field("rav", &self.rav)
            .field("dof_datat", &self.kt.len())
            .field("dof_datav", &self.r.len())
            .field("advisories", &self.advisories)
            .finish()
    }
}

/// Checks the physical validity of the derived fields
///
/// `kt` and `kv` must be nonzero; `Q = 0` only means the 3D and 1D problems
/// are uncoupled.
fn validate(
    kt: &DVector<f64>,
    q: &DVector<f64>,
    kv: &DVector<f64>,
    advisories: &mut Vec<Advisory>,
) -> Result<()> {
    match kt.iter().next() {
        None => {
            return Err(ParamError::Configuration(
                "empty tissue conductivity field (no tissue DOFs)".to_owned(),
            ))
        }
        Some(&kt0) if kt0 == 0.0 => {
            return Err(ParamError::Configuration(
                "wrong tissue conductivity (kt>0 required)".to_owned(),
            ))
        }
        Some(_) => {}
    }
    match kv.iter().next() {
        None => {
            return Err(ParamError::Configuration(
                "empty vessel bed conductivity field (no vessel DOFs)".to_owned(),
            ))
        }
        Some(&kv0) if kv0 == 0.0 => {
            return Err(ParamError::Configuration(
                "wrong vessel bed conductivity (kv>0 required)".to_owned(),
            ))
        }
        Some(_) => {}
    }
    if q.iter().next() == Some(&0.0) {
        log::warn!("{}", Advisory::UncoupledProblem);
        advisories.push(Advisory::UncoupledProblem);
    }
    Ok(())
}
