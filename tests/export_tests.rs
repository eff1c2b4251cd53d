//! Export of the parameter fields and the collaborator seams of the build

use std::cell::RefCell;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use nalgebra::DVector;
use param3d1d::{
    BranchRadiusImporter, BuildOptions, Collaborators, Discretization, FieldExporter,
    JsonParamStore, Param3d1d, ParamError, RadiusImporter, Result, TissueGrid, VesselNetwork,
    VtuExporter,
};

const NETWORK: &str = "branch,x,y,z\n0,0,0,0\n0,1,0,0\n0,2,0,0\n1,2,0,0\n1,2,1,0.5\n";

fn network() -> VesselNetwork {
    VesselNetwork::parse_csv(NETWORK).unwrap()
}

fn tissue() -> TissueGrid {
    TissueGrid::new(1, [2.0, 2.0, 2.0]).unwrap()
}

fn export_store(output_dir: &Path) -> JsonParamStore {
    JsonParamStore::parse(&format!(
        r#"{{
            "IMPORT_RADIUS": 0, "TEST_PARAM": 0, "EXPORT_PARAM": 1,
            "RADIUS": 5e-6, "OutputDir": "{}",
            "P": 1333, "U": 0.001, "d": 0.0005, "k": 1e-18, "mu": 0.0012, "Lp": 1e-12
        }}"#,
        output_dir.display()
    ))
    .unwrap()
}

/// Values of the named point data array in a vtu file
fn point_data(path: &Path, name: &str) -> Vec<f64> {
    let contents = std::fs::read_to_string(path).unwrap();
    let doc = roxmltree::Document::parse(&contents).unwrap();
    let array = doc
        .descendants()
        .filter(|n| n.has_tag_name("PointData"))
        .flat_map(|n| n.children())
        .find(|n| n.attribute("Name") == Some(name))
        .unwrap();
    array
        .text()
        .unwrap()
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect()
}

#[test]
fn exports_radius_and_wall_conductivity() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("vtk");
    let store = export_store(&output_dir);
    let (tissue, network) = (tissue(), network());

    let param = Param3d1d::build(&store, &tissue, &network, &BuildOptions::default()).unwrap();

    let radius = point_data(&output_dir.join("radius.vtu"), "R");
    let q = point_data(&output_dir.join("conductivity.vtu"), "Q");
    assert_eq!(radius.as_slice(), param.radius().as_slice());
    assert_eq!(q.as_slice(), param.q_field().as_slice());
}

#[test]
fn exported_network_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = export_store(dir.path());
    let (tissue, network) = (tissue(), network());
    Param3d1d::build(&store, &tissue, &network, &BuildOptions::default()).unwrap();

    let path = dir.path().join("radius.vtu");
    let reloaded = VesselNetwork::load(path.to_str().unwrap()).unwrap();
    assert_eq!(reloaded.points(), network.points());
    assert_eq!(reloaded.branches(), network.branches());
}

#[test]
fn export_needs_output_dir() {
    let store = JsonParamStore::parse(
        r#"{ "IMPORT_RADIUS": 0, "TEST_PARAM": 1, "EXPORT_PARAM": true,
             "RADIUS": 0.1, "Kt": 1, "Q": 1, "Kv": 1 }"#,
    )
    .unwrap();
    let (tissue, network) = (tissue(), network());
    let err = Param3d1d::build(&store, &tissue, &network, &BuildOptions::default()).unwrap_err();
    assert!(matches!(err, ParamError::MissingKey { ref key, .. } if key == "OutputDir"));
}

#[test]
fn tissue_grid_exports_hexahedra() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tissue.vtu");
    let grid = TissueGrid::new(2, [1.0, 1.0, 1.0]).unwrap();
    let kt = DVector::from_element(grid.nb_dof(), 0.5);

    VtuExporter.export(&path, &grid, &[("kt", &kt)]).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let doc = roxmltree::Document::parse(&contents).unwrap();
    let piece = doc.descendants().find(|n| n.has_tag_name("Piece")).unwrap();
    assert_eq!(piece.attribute("NumberOfPoints"), Some("27"));
    assert_eq!(piece.attribute("NumberOfCells"), Some("8"));
    assert_eq!(point_data(&path, "kt"), vec![0.5; 27]);
}

// ============================================================================
// Custom collaborators
// ============================================================================

/// Remembers what it was asked to export instead of writing files
#[derive(Default)]
struct RecordingExporter {
    calls: RefCell<Vec<(PathBuf, Vec<String>)>>,
}

impl FieldExporter for RecordingExporter {
    fn export(
        &self,
        path: &Path,
        _mf: &dyn Discretization,
        fields: &[(&str, &DVector<f64>)],
    ) -> Result<()> {
        self.calls.borrow_mut().push((
            path.to_path_buf(),
            fields.iter().map(|(name, _)| name.to_string()).collect(),
        ));
        Ok(())
    }
}

/// Assigns radius `0.01 * (dof + 1)`, ignoring the stream contents
struct RampImporter;

impl RadiusImporter for RampImporter {
    fn import(
        &self,
        _source: &mut dyn BufRead,
        mf_datav: &dyn Discretization,
    ) -> Result<DVector<f64>> {
        Ok(DVector::from_fn(mf_datav.nb_dof(), |i, _| 0.01 * (i + 1) as f64))
    }
}

#[test]
fn custom_collaborators_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let rfile = dir.path().join("radius.txt");
    std::fs::write(&rfile, "ignored\n").unwrap();

    let store = JsonParamStore::parse(&format!(
        r#"{{
            "IMPORT_RADIUS": 1, "TEST_PARAM": 0, "EXPORT_PARAM": 1,
            "RFILE": "{}", "OutputDir": "out",
            "P": 1333, "U": 0.001, "d": 0.0005, "k": 1e-18, "mu": 0.0012, "Lp": 1e-12
        }}"#,
        rfile.display()
    ))
    .unwrap();
    let exporter = RecordingExporter::default();
    let collaborators = Collaborators {
        importer: &RampImporter,
        exporter: &exporter,
    };
    let (tissue, network) = (tissue(), network());

    let param = Param3d1d::build_with(
        &store,
        &tissue,
        &network,
        collaborators,
        &BuildOptions::default(),
    )
    .unwrap();

    assert_eq!(param.r(0), 0.01);
    assert_eq!(param.r(3), 0.04);
    assert_eq!(
        *exporter.calls.borrow(),
        vec![
            (Path::new("out").join("radius.vtu"), vec!["R".to_string()]),
            (Path::new("out").join("conductivity.vtu"), vec!["Q".to_string()]),
        ]
    );
}

#[test]
fn output_dir_is_a_directory_not_a_prefix() {
    let store = JsonParamStore::parse(
        r#"{ "IMPORT_RADIUS": 0, "TEST_PARAM": 1, "EXPORT_PARAM": 1,
             "RADIUS": 0.1, "Kt": 1, "Q": 1, "Kv": 1, "OutputDir": "out/run1_" }"#,
    )
    .unwrap();
    let exporter = RecordingExporter::default();
    let collaborators = Collaborators {
        importer: &BranchRadiusImporter,
        exporter: &exporter,
    };
    let (tissue, network) = (tissue(), network());

    Param3d1d::build_with(
        &store,
        &tissue,
        &network,
        collaborators,
        &BuildOptions::default(),
    )
    .unwrap();

    let paths: Vec<PathBuf> = exporter.calls.borrow().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(
        paths,
        vec![
            Path::new("out/run1_").join("radius.vtu"),
            Path::new("out/run1_").join("conductivity.vtu"),
        ]
    );
}
