use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::DVector;
use quick_xml::{
    events::{BytesDecl, BytesText, Event},
    Writer,
};

use crate::{
    discretization::Discretization,
    error::{ParamError, Result},
};

/// Writes a mesh together with named point data
pub trait FieldExporter {
    /// # Arguments
    /// * `path` - The output file
    /// * `mf` - The discretization the fields live on
    /// * `fields` - `(name, values)` pairs, one value per DOF of `mf`
    fn export(
        &self,
        path: &Path,
        mf: &dyn Discretization,
        fields: &[(&str, &DVector<f64>)],
    ) -> Result<()>;
}

/// VTK XML unstructured grid writer (ASCII)
#[derive(Debug, Clone, Copy, Default)]
pub struct VtuExporter;

fn joined<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

fn data_array<W: Write>(
    w: &mut Writer<W>,
    attributes: &[(&str, &str)],
    values: &str,
) -> quick_xml::Result<()> {
    w.create_element("DataArray")
        .with_attributes(attributes.iter().copied())
        .write_text_content(BytesText::new(values))?;
    Ok(())
}

impl VtuExporter {
    fn write<W: Write>(
        &self,
        writer: &mut Writer<W>,
        mf: &dyn Discretization,
        fields: &[(&str, &DVector<f64>)],
    ) -> quick_xml::Result<()> {
        let cells = mf.cells();

        let coordinates = joined(mf.points().iter().flat_map(|p| [p.x, p.y, p.z]));
        let connectivity = joined(cells.iter().flat_map(|c| c.nodes.iter()));
        let offsets = joined(cells.iter().scan(0, |end, c| {
            *end += c.nodes.len();
            Some(*end)
        }));
        let types = joined(cells.iter().map(|c| c.kind.vtk_type()));
        let n_points = mf.points().len().to_string();
        let n_cells = cells.len().to_string();
        let scalars = fields.first().map(|(name, _)| *name).unwrap_or("");

        writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
        writer
            .create_element("VTKFile")
            .with_attributes([
                ("type", "UnstructuredGrid"),
                ("version", "0.1"),
                ("byte_order", "LittleEndian"),
            ])
            .write_inner_content(|w| -> quick_xml::Result<()> {
                w.create_element("UnstructuredGrid")
                    .write_inner_content(|w| -> quick_xml::Result<()> {
                        w.create_element("Piece")
                            .with_attributes([
                                ("NumberOfPoints", n_points.as_str()),
                                ("NumberOfCells", n_cells.as_str()),
                            ])
                            .write_inner_content(|w| -> quick_xml::Result<()> {
                                w.create_element("Points").write_inner_content(
                                    |w| -> quick_xml::Result<()> {
                                        data_array(
                                            w,
                                            &[
                                                ("type", "Float64"),
                                                ("NumberOfComponents", "3"),
                                                ("format", "ascii"),
                                            ],
                                            &coordinates,
                                        )
                                    },
                                )?;
                                w.create_element("Cells").write_inner_content(
                                    |w| -> quick_xml::Result<()> {
                                        data_array(
                                            w,
                                            &[
                                                ("type", "Int64"),
                                                ("Name", "connectivity"),
                                                ("format", "ascii"),
                                            ],
                                            &connectivity,
                                        )?;
                                        data_array(
                                            w,
                                            &[
                                                ("type", "Int64"),
                                                ("Name", "offsets"),
                                                ("format", "ascii"),
                                            ],
                                            &offsets,
                                        )?;
                                        data_array(
                                            w,
                                            &[
                                                ("type", "UInt8"),
                                                ("Name", "types"),
                                                ("format", "ascii"),
                                            ],
                                            &types,
                                        )
                                    },
                                )?;
                                w.create_element("PointData")
                                    .with_attribute(("Scalars", scalars))
                                    .write_inner_content(|w| -> quick_xml::Result<()> {
                                        for (name, values) in fields {
                                            data_array(
                                                w,
                                                &[
                                                    ("type", "Float64"),
                                                    ("Name", *name),
                                                    ("format", "ascii"),
                                                ],
                                                &joined(values.iter()),
                                            )?;
                                        }
                                        Ok(())
                                    })?;
                                Ok(())
                            })?;
                        Ok(())
                    })?;
                Ok(())
            })?;
        Ok(())
    }
}

impl FieldExporter for VtuExporter {
    fn export(
        &self,
        path: &Path,
        mf: &dyn Discretization,
        fields: &[(&str, &DVector<f64>)],
    ) -> Result<()> {
        if mf.points().len() != mf.nb_dof() {
            return Err(ParamError::Export(format!(
                "Discretization has {} points for {} DOFs",
                mf.points().len(),
                mf.nb_dof()
            )));
        }
        for (name, values) in fields {
            if values.len() != mf.nb_dof() {
                return Err(ParamError::Export(format!(
                    "Field {name} has {} values for {} DOFs",
                    values.len(),
                    mf.nb_dof()
                )));
            }
        }

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(err) => {
                return Err(ParamError::Export(format!(
                    "Failed to create {}: {err}",
                    path.display()
                )));
            }
        };
        let mut writer = Writer::new_with_indent(BufWriter::new(file), b' ', 2);

        if let Err(err) = self.write(&mut writer, mf, fields) {
            return Err(ParamError::Export(format!(
                "Failed to write {}: {err}",
                path.display()
            )));
        }
        writer.into_inner().flush()?;

        log::info!("wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::VesselNetwork;

    #[test]
    fn rejects_wrongly_sized_field() {
        let network = VesselNetwork::parse_csv("branch,x,y\n0,0,0\n0,1,0\n").unwrap();
        let field = DVector::from_element(3, 1.0);
        let dir = tempfile::tempdir().unwrap();
        let result = VtuExporter.export(&dir.path().join("r.vtu"), &network, &[("R", &field)]);
        assert!(matches!(result, Err(ParamError::Export(_))));
    }

    #[test]
    fn writes_nested_grid_sections() {
        let network = VesselNetwork::parse_csv("branch,x,y\n0,0,0\n0,1,0\n0,2,0\n").unwrap();
        let radius = DVector::from_element(3, 0.25);
        let mut writer = Writer::new(Vec::new());

        VtuExporter
            .write(&mut writer, &network, &[("R", &radius)])
            .unwrap();

        let xml = String::from_utf8(writer.into_inner()).unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let piece = doc.descendants().find(|n| n.has_tag_name("Piece")).unwrap();
        assert_eq!(piece.attribute("NumberOfPoints"), Some("3"));
        assert_eq!(piece.attribute("NumberOfCells"), Some("1"));
        let sections: Vec<&str> = piece
            .children()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect();
        assert_eq!(sections, ["Points", "Cells", "PointData"]);
        let offsets = doc
            .descendants()
            .find(|n| n.attribute("Name") == Some("offsets"))
            .unwrap();
        assert_eq!(offsets.text(), Some("3"));
    }
}
