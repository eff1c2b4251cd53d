use std::io::BufRead;

use nalgebra::DVector;

use crate::{
    datatypes::UNRESOLVED_RADIUS,
    discretization::Discretization,
    error::{ParamError, Result},
};

/// Fills a radius field from an open data stream
pub trait RadiusImporter {
    /// # Arguments
    /// * `source` - The open radius data stream
    /// * `mf_datav` - The vessel discretization the field is sized to
    ///
    /// # Returns
    /// A field with one radius per DOF of `mf_datav`
    fn import(
        &self,
        source: &mut dyn BufRead,
        mf_datav: &dyn Discretization,
    ) -> Result<DVector<f64>>;
}

/// Reads one radius value per branch, in branch order
///
/// Blank lines and lines starting with `#` are ignored. Values are taken as
/// given. A DOF shared by several branches keeps the value of the last one.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchRadiusImporter;

impl RadiusImporter for BranchRadiusImporter {
    fn import(
        &self,
        source: &mut dyn BufRead,
        mf_datav: &dyn Discretization,
    ) -> Result<DVector<f64>> {
        let mut values: Vec<f64> = Vec::with_capacity(mf_datav.nb_regions());

        for (line_no, line) in source.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let value: f64 = line.parse().map_err(|_| {
                ParamError::Import(format!(
                    "Non-float radius '{line}' on line {}",
                    line_no + 1
                ))
            })?;
            values.push(value);
        }

        if values.len() != mf_datav.nb_regions() {
            return Err(ParamError::Import(format!(
                "Found {} radius values for {} branches",
                values.len(),
                mf_datav.nb_regions()
            )));
        }

        let mut radius = DVector::from_element(mf_datav.nb_dof(), UNRESOLVED_RADIUS);
        for (branch, value) in values.iter().enumerate() {
            let dofs = mf_datav.region_dofs(branch).ok_or_else(|| {
                ParamError::Import(format!("Branch {branch} has no degrees of freedom"))
            })?;
            for dof in dofs {
                radius[dof] = *value;
            }
        }

        let uncovered = radius.iter().filter(|r| r.is_nan()).count();
        if uncovered > 0 {
            log::warn!("{uncovered} vessel nodes belong to no branch and have no radius");
        }

        Ok(radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::VesselNetwork;

    fn network() -> VesselNetwork {
        VesselNetwork::parse_csv("branch,x,y\n0,0,0\n0,1,0\n1,1,0\n1,2,0\n1,3,0\n").unwrap()
    }

    #[test]
    fn assigns_branch_values_to_their_nodes() {
        let mut source = "# radii\n0.01\n\n0.02\n".as_bytes();
        let radius = BranchRadiusImporter.import(&mut source, &network()).unwrap();
        // node 1 is shared and takes the second branch value
        assert_eq!(radius.as_slice(), &[0.01, 0.02, 0.02, 0.02]);
    }

    #[test]
    fn rejects_wrong_count() {
        let mut source = "0.01\n".as_bytes();
        assert!(matches!(
            BranchRadiusImporter.import(&mut source, &network()),
            Err(ParamError::Import(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        let mut source = "0.01\nwide\n".as_bytes();
        assert!(BranchRadiusImporter.import(&mut source, &network()).is_err());
    }
}
