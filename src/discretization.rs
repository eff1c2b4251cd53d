use std::collections::HashMap;

use crate::{
    datatypes::{Cell, CellKind, Vertex},
    error::{ParamError, Result},
};

/// A finite element space on which coefficient fields live
///
/// DOFs coincide with mesh points (P1 data), so `points().len() == nb_dof()`.
pub trait Discretization {
    fn nb_dof(&self) -> usize;

    fn nb_regions(&self) -> usize;

    /// DOF indices of a region, `None` when the region does not exist
    fn region_dofs(&self, region: usize) -> Option<Vec<usize>>;

    fn points(&self) -> &[Vertex];

    fn cells(&self) -> Vec<Cell>;
}

/// 1D vessel network made of polyline branches
///
/// DOFs are the network nodes; a junction node shared by several branches is
/// a single DOF. Region `b` is branch `b`.
#[derive(Debug, Clone)]
pub struct VesselNetwork {
    points: Vec<Vertex>,
    branches: Vec<Vec<usize>>,
}

impl VesselNetwork {
    /// Creates a network from its nodes and branch connectivity
    ///
    /// # Arguments
    /// * `points` - The network nodes
    /// * `branches` - One ordered list of node indices per branch
    pub fn new(points: Vec<Vertex>, branches: Vec<Vec<usize>>) -> Result<VesselNetwork> {
        for (b, branch) in branches.iter().enumerate() {
            if branch.len() < 2 {
                return Err(ParamError::Input(format!(
                    "Branch {b} has {} node(s), at least 2 are required",
                    branch.len()
                )));
            }
            if let Some(bad) = branch.iter().find(|&&n| n >= points.len()) {
                return Err(ParamError::Input(format!(
                    "Branch {b} references node {bad}, network has {} nodes",
                    points.len()
                )));
            }
        }
        Ok(VesselNetwork { points, branches })
    }

    pub fn branches(&self) -> &[Vec<usize>] {
        &self.branches
    }

    /// Loads a network from a csv or vtu file, picked by extension
    pub fn load(path: &str) -> Result<VesselNetwork> {
        let network = if path.ends_with(".csv") {
            VesselNetwork::parse_csv(&read(path)?)?
        } else if path.ends_with(".vtu") {
            VesselNetwork::parse_vtu(&read(path)?)?
        } else {
            return Err(ParamError::Input(format!(
                "Unrecognized network filetype {path}"
            )));
        };

        log::info!(
            "loaded network with {} nodes and {} branches from {}",
            network.points.len(),
            network.branches.len(),
            path
        );
        Ok(network)
    }

    /// Parses csv rows `branch,x,y[,z]` into a network
    ///
    /// All rows sharing a branch label form one branch, whose nodes follow
    /// row order even when the label's rows are interleaved with other
    /// labels. Branches are numbered in the order their labels first appear.
    /// Nodes with identical coordinates are merged, which is how junctions are
    /// expressed.
    pub fn parse_csv(contents: &str) -> Result<VesselNetwork> {
        let mut headers: Vec<&str> = Vec::new();
        let mut branch_index: usize = 0;
        let mut x_index: usize = 0;
        let mut y_index: usize = 0;
        let mut z_index: Option<usize> = None;

        let mut points: Vec<Vertex> = Vec::new();
        let mut point_ids: HashMap<[u64; 3], usize> = HashMap::new();
        let mut branch_ids: HashMap<&str, usize> = HashMap::new();
        let mut branches: Vec<Vec<usize>> = Vec::new();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if headers.is_empty() {
                headers = line.split(',').map(|h| h.trim()).collect();
                let position = |name: &str| headers.iter().position(|h| *h == name);

                match (position("branch"), position("x"), position("y")) {
                    (Some(b), Some(x), Some(y)) => {
                        branch_index = b;
                        x_index = x;
                        y_index = y;
                    }
                    _ => {
                        return Err(ParamError::Input(
                            "Error in network csv: missing branch, x and/or y field".to_owned(),
                        ))
                    }
                }
                z_index = position("z");
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
            if fields.len() != headers.len() {
                return Err(ParamError::Input(format!(
                    "Error in network csv line {}: expected {} fields, found {}",
                    line_no + 1,
                    headers.len(),
                    fields.len()
                )));
            }
            let coordinate = |i: usize| -> Result<f64> {
                fields[i].parse().map_err(|_| {
                    ParamError::Input(format!(
                        "Non-float value '{}' in network csv line {}",
                        fields[i],
                        line_no + 1
                    ))
                })
            };
            let vertex = Vertex {
                x: coordinate(x_index)?,
                y: coordinate(y_index)?,
                z: match z_index {
                    Some(z) => coordinate(z)?,
                    None => 0.0,
                },
            };

            let key = [vertex.x.to_bits(), vertex.y.to_bits(), vertex.z.to_bits()];
            let node = *point_ids.entry(key).or_insert_with(|| {
                points.push(vertex);
                points.len() - 1
            });

            let label = fields[branch_index];
            let b = *branch_ids.entry(label).or_insert_with(|| {
                branches.push(Vec::new());
                branches.len() - 1
            });
            let branch = &mut branches[b];
            if branch.last() == Some(&node) {
                log::warn!(
                    "duplicate point at {:?} in branch {} skipped",
                    vertex,
                    label
                );
                continue;
            }
            branch.push(node);
        }

        if headers.is_empty() {
            return Err(ParamError::Input("Network csv is empty".to_owned()));
        }

        VesselNetwork::new(points, branches)
    }

    /// Parses a VTK unstructured grid holding line and polyline cells.
    /// Each cell becomes a branch.
    pub fn parse_vtu(contents: &str) -> Result<VesselNetwork> {
        let doc = match roxmltree::Document::parse(contents) {
            Ok(d) => d,
            Err(err) => {
                return Err(ParamError::Input(format!("Error in network vtu: {err}")));
            }
        };

        let piece = doc
            .descendants()
            .find(|n| n.has_tag_name("Piece"))
            .ok_or_else(|| ParamError::Input("Network vtu has no Piece element".to_owned()))?;

        let coordinates: Vec<f64> = data_array(&piece, "Points", None)?;
        if coordinates.len() % 3 != 0 {
            return Err(ParamError::Input(
                "Network vtu points are not 3-component".to_owned(),
            ));
        }
        let points: Vec<Vertex> = coordinates
            .chunks_exact(3)
            .map(|c| Vertex::new(c[0], c[1], c[2]))
            .collect();

        let connectivity: Vec<usize> = data_array(&piece, "Cells", Some("connectivity"))?;
        let offsets: Vec<usize> = data_array(&piece, "Cells", Some("offsets"))?;
        let types: Vec<u8> = data_array(&piece, "Cells", Some("types"))?;

        if offsets.len() != types.len() {
            return Err(ParamError::Input(
                "Network vtu has mismatched offsets and types".to_owned(),
            ));
        }

        let mut branches: Vec<Vec<usize>> = Vec::with_capacity(offsets.len());
        let mut start: usize = 0;
        for (cell, (&end, &vtk_type)) in offsets.iter().zip(types.iter()).enumerate() {
            match CellKind::from_vtk_type(vtk_type) {
                Some(CellKind::Line) | Some(CellKind::PolyLine) => {}
                _ => {
                    return Err(ParamError::Input(format!(
                        "Network vtu cell {cell} has unsupported type {vtk_type}"
                    )))
                }
            }
            if end < start || end > connectivity.len() {
                return Err(ParamError::Input(format!(
                    "Network vtu cell {cell} has invalid offset {end}"
                )));
            }
            branches.push(connectivity[start..end].to_vec());
            start = end;
        }

        VesselNetwork::new(points, branches)
    }
}

fn read(path: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|err| ParamError::Input(format!("Unable to open network file {path}: {err}")))
}

/// Reads the whitespace separated values of a `DataArray` under `section`
fn data_array<T: std::str::FromStr>(
    piece: &roxmltree::Node,
    section: &str,
    name: Option<&str>,
) -> Result<Vec<T>> {
    let array = piece
        .children()
        .find(|n| n.has_tag_name(section))
        .and_then(|s| {
            s.children().find(|n| {
                n.has_tag_name("DataArray")
                    && name.map_or(true, |name| n.attribute("Name") == Some(name))
            })
        })
        .ok_or_else(|| {
            ParamError::Input(format!(
                "Network vtu is missing {section} data array {}",
                name.unwrap_or("")
            ))
        })?;

    array
        .text()
        .unwrap_or("")
        .split_whitespace()
        .map(|v| {
            v.parse().map_err(|_| {
                ParamError::Input(format!("Bad value '{v}' in {section} data array"))
            })
        })
        .collect()
}

impl Discretization for VesselNetwork {
    fn nb_dof(&self) -> usize {
        self.points.len()
    }

    fn nb_regions(&self) -> usize {
        self.branches.len()
    }

    fn region_dofs(&self, region: usize) -> Option<Vec<usize>> {
        let mut dofs = self.branches.get(region)?.clone();
        // a closed branch lists its first node twice
        dofs.sort_unstable();
        dofs.dedup();
        Some(dofs)
    }

    fn points(&self) -> &[Vertex] {
        &self.points
    }

    fn cells(&self) -> Vec<Cell> {
        self.branches
            .iter()
            .map(|b| Cell {
                kind: CellKind::PolyLine,
                nodes: b.clone(),
            })
            .collect()
    }
}

/// Structured P1 hexahedral grid of the tissue box `[0, size]`
#[derive(Debug, Clone)]
pub struct TissueGrid {
    subdivisions: usize,
    points: Vec<Vertex>,
}

impl TissueGrid {
    /// # Arguments
    /// * `subdivisions` - Number of cells along each axis
    /// * `size` - Box edge lengths
    pub fn new(subdivisions: usize, size: [f64; 3]) -> Result<TissueGrid> {
        if subdivisions == 0 {
            return Err(ParamError::Input(
                "Tissue grid needs at least one subdivision".to_owned(),
            ));
        }
        if size.iter().any(|s| !(*s > 0.0)) {
            return Err(ParamError::Input(format!(
                "Tissue box size must be positive, got {size:?}"
            )));
        }

        let n = subdivisions + 1;
        let mut points = Vec::with_capacity(n * n * n);
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    points.push(Vertex {
                        x: size[0] * i as f64 / subdivisions as f64,
                        y: size[1] * j as f64 / subdivisions as f64,
                        z: size[2] * k as f64 / subdivisions as f64,
                    });
                }
            }
        }

        Ok(TissueGrid {
            subdivisions,
            points,
        })
    }

    fn node(&self, i: usize, j: usize, k: usize) -> usize {
        let n = self.subdivisions + 1;
        i + n * (j + n * k)
    }
}

impl Discretization for TissueGrid {
    fn nb_dof(&self) -> usize {
        self.points.len()
    }

    fn nb_regions(&self) -> usize {
        1
    }

    fn region_dofs(&self, region: usize) -> Option<Vec<usize>> {
        (region == 0).then(|| (0..self.points.len()).collect())
    }

    fn points(&self) -> &[Vertex] {
        &self.points
    }

    fn cells(&self) -> Vec<Cell> {
        let s = self.subdivisions;
        let mut cells = Vec::with_capacity(s * s * s);
        for k in 0..s {
            for j in 0..s {
                for i in 0..s {
                    cells.push(Cell {
                        kind: CellKind::Hexahedron,
                        nodes: vec![
                            self.node(i, j, k),
                            self.node(i + 1, j, k),
                            self.node(i + 1, j + 1, k),
                            self.node(i, j + 1, k),
                            self.node(i, j, k + 1),
                            self.node(i + 1, j, k + 1),
                            self.node(i + 1, j + 1, k + 1),
                            self.node(i, j + 1, k + 1),
                        ],
                    });
                }
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Y_NETWORK: &str = "\
branch,x,y,z
0,0.0,0.0,0.0
0,0.5,0.0,0.0
0,1.0,0.0,0.0
1,1.0,0.0,0.0
1,1.5,0.5,0.0
2,1.0,0.0,0.0
2,1.5,-0.5,0.0
";

    #[test]
    fn csv_junction_nodes_are_shared() {
        let network = VesselNetwork::parse_csv(Y_NETWORK).unwrap();
        assert_eq!(network.nb_dof(), 5);
        assert_eq!(network.nb_regions(), 3);
        assert_eq!(network.region_dofs(0).unwrap(), vec![0, 1, 2]);
        assert_eq!(network.region_dofs(1).unwrap(), vec![2, 3]);
        assert_eq!(network.region_dofs(2).unwrap(), vec![2, 4]);
        assert!(network.region_dofs(3).is_none());
    }

    #[test]
    fn csv_without_z_column_is_planar() {
        let network = VesselNetwork::parse_csv("x,y,branch\n0,0,a\n1,2,a\n").unwrap();
        assert_eq!(network.points()[1], Vertex::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn csv_interleaved_labels_join_their_branch() {
        let network =
            VesselNetwork::parse_csv("branch,x,y\nb,5,5\na,0,0\nb,6,5\na,1,0\n").unwrap();
        assert_eq!(network.nb_regions(), 2);
        assert_eq!(network.branches(), &[vec![0, 2], vec![1, 3]]);
        assert_eq!(network.points()[3], Vertex::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn csv_errors() {
        assert!(VesselNetwork::parse_csv("x,y\n0,0\n").is_err());
        assert!(VesselNetwork::parse_csv("branch,x,y\n0,0,zero\n0,1,1\n").is_err());
        // single-node branch
        assert!(VesselNetwork::parse_csv("branch,x,y\n0,0,0\n").is_err());
        assert!(VesselNetwork::parse_csv("").is_err());
    }

    #[test]
    fn network_rejects_dangling_nodes() {
        let points = vec![Vertex::new(0.0, 0.0, 0.0), Vertex::new(1.0, 0.0, 0.0)];
        assert!(VesselNetwork::new(points, vec![vec![0, 2]]).is_err());
    }

    #[test]
    fn vtu_polylines_become_branches() {
        let vtu = r#"<?xml version="1.0"?>
<VTKFile type="UnstructuredGrid" version="0.1" byte_order="LittleEndian">
  <UnstructuredGrid>
    <Piece NumberOfPoints="3" NumberOfCells="2">
      <Points>
        <DataArray type="Float64" NumberOfComponents="3" format="ascii">0 0 0 1 0 0 2 0 0</DataArray>
      </Points>
      <Cells>
        <DataArray type="Int64" Name="connectivity" format="ascii">0 1 1 2</DataArray>
        <DataArray type="Int64" Name="offsets" format="ascii">2 4</DataArray>
        <DataArray type="UInt8" Name="types" format="ascii">3 4</DataArray>
      </Cells>
    </Piece>
  </UnstructuredGrid>
</VTKFile>"#;
        let network = VesselNetwork::parse_vtu(vtu).unwrap();
        assert_eq!(network.nb_dof(), 3);
        assert_eq!(network.branches(), &[vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn tissue_grid_layout() {
        let grid = TissueGrid::new(2, [1.0, 2.0, 4.0]).unwrap();
        assert_eq!(grid.nb_dof(), 27);
        assert_eq!(grid.cells().len(), 8);
        assert_eq!(grid.points()[26], Vertex::new(1.0, 2.0, 4.0));
        assert_eq!(grid.region_dofs(0).unwrap().len(), 27);
        assert!(grid.region_dofs(1).is_none());
        assert!(TissueGrid::new(0, [1.0, 1.0, 1.0]).is_err());
    }
}
