use nalgebra::DVector;

use crate::{
    datatypes::CellKind,
    discretization::Discretization,
    error::{ParamError, Result},
};

/// Integration rule over the regions of a discretization
pub trait RegionIntegrator {
    /// Quadrature weight of every DOF of `region`
    fn weights(&self, mf: &dyn Discretization, region: usize) -> Result<Vec<(usize, f64)>>;
}

/// Every DOF of the region weighs 1
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformIntegrator;

impl RegionIntegrator for UniformIntegrator {
    fn weights(&self, mf: &dyn Discretization, region: usize) -> Result<Vec<(usize, f64)>> {
        Ok(region_dofs(mf, region)?
            .into_iter()
            .map(|dof| (dof, 1.0))
            .collect())
    }
}

/// Lumped mass rule: a polyline segment gives half its length to each
/// endpoint, a hexahedron an eighth of its bounding volume to each node.
/// Only cells lying entirely inside the region contribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct LumpedIntegrator;

impl RegionIntegrator for LumpedIntegrator {
    fn weights(&self, mf: &dyn Discretization, region: usize) -> Result<Vec<(usize, f64)>> {
        let dofs = region_dofs(mf, region)?;
        let mut in_region = vec![false; mf.nb_dof()];
        for &dof in &dofs {
            in_region[dof] = true;
        }

        let points = mf.points();
        let mut weight = vec![0.0; mf.nb_dof()];

        for cell in mf.cells() {
            if !cell.nodes.iter().all(|&n| in_region[n]) {
                continue;
            }
            match cell.kind {
                CellKind::Line | CellKind::PolyLine => {
                    for pair in cell.nodes.windows(2) {
                        let half = 0.5 * points[pair[0]].distance(&points[pair[1]]);
                        weight[pair[0]] += half;
                        weight[pair[1]] += half;
                    }
                }
                CellKind::Hexahedron => {
                    let (lo, hi) = cell.nodes.iter().map(|&n| points[n]).fold(
                        ([f64::MAX; 3], [f64::MIN; 3]),
                        |(lo, hi), p| {
                            (
                                [lo[0].min(p.x), lo[1].min(p.y), lo[2].min(p.z)],
                                [hi[0].max(p.x), hi[1].max(p.y), hi[2].max(p.z)],
                            )
                        },
                    );
                    let volume = (hi[0] - lo[0]) * (hi[1] - lo[1]) * (hi[2] - lo[2]);
                    for &n in &cell.nodes {
                        weight[n] += volume / cell.nodes.len() as f64;
                    }
                }
            }
        }

        Ok(dofs.into_iter().map(|dof| (dof, weight[dof])).collect())
    }
}

fn region_dofs(mf: &dyn Discretization, region: usize) -> Result<Vec<usize>> {
    mf.region_dofs(region).ok_or_else(|| {
        ParamError::Integration(format!(
            "Region {region} does not exist ({} regions)",
            mf.nb_regions()
        ))
    })
}

/// Computes the average of a field over a mesh region
///
/// # Arguments
/// * `mim` - The integration rule
/// * `mf` - The discretization `field` lives on
/// * `field` - One value per DOF of `mf`
/// * `region` - The region to average over
///
/// # Returns
/// `sum(w_i f_i) / sum(w_i)` over the DOFs of the region
pub fn compute_radius(
    mim: &dyn RegionIntegrator,
    mf: &dyn Discretization,
    field: &DVector<f64>,
    region: usize,
) -> Result<f64> {
    if field.len() != mf.nb_dof() {
        return Err(ParamError::Integration(format!(
            "Field has {} entries, discretization has {} DOFs",
            field.len(),
            mf.nb_dof()
        )));
    }

    let (weighted, measure) = mim
        .weights(mf, region)?
        .iter()
        .fold((0.0, 0.0), |(sum, measure), &(dof, w)| {
            (sum + w * field[dof], measure + w)
        });

    if measure == 0.0 {
        return Err(ParamError::Integration(format!(
            "Region {region} has zero measure"
        )));
    }
    Ok(weighted / measure)
}
