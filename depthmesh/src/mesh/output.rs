//! Mesh output implementation
use super::Mesh;
use crate::Error;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};

/// Encoding for PLY files
///
/// The `Display` impl gives the name used in the PLY `format` header line.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlyFormat {
    /// Human-readable text
    Ascii,
    /// Packed little-endian binary
    #[default]
    BinaryLittleEndian,
}

impl Mesh {
    /// Checks that every buffer is consistent with the vertex count
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_with(&self.triangles)
    }

    fn validate_with(&self, triangles: &[Vector3<usize>]) -> Result<(), Error> {
        let n = self.vertices.len();
        if n > i32::MAX as usize {
            return Err(Error::TooManyVertices(n));
        }
        if !self.colors.is_empty() && self.colors.len() != n {
            return Err(Error::BadColorCount(self.colors.len(), n));
        }
        if !self.normals.is_empty() && self.normals.len() != n {
            return Err(Error::BadNormalCount(self.normals.len(), n));
        }
        if let Some(&index) = triangles.iter().flatten().find(|&&i| i >= n) {
            return Err(Error::BadIndex {
                index,
                vertex_count: n,
            });
        }
        Ok(())
    }

    /// Writes a PLY file to the given output
    pub fn write_ply<F: Write>(
        &self,
        out: &mut F,
        format: PlyFormat,
    ) -> Result<(), Error> {
        self.write_ply_with(out, format, &self.triangles)
    }

    /// Writes a PLY file, using `triangles` in place of [`Mesh::triangles`]
    ///
    /// This lets the caller export a different winding (or a subset of faces)
    /// without touching the mesh itself.
    ///
    /// Vertices are written as `x y z`, followed by `red green blue alpha`
    /// (if the mesh has colors) and `nx ny nz` (if the mesh has normals).
    pub fn write_ply_with<F: Write>(
        &self,
        out: &mut F,
        format: PlyFormat,
        triangles: &[Vector3<usize>],
    ) -> Result<(), Error> {
        self.validate_with(triangles)?;
        let has_colors = !self.colors.is_empty();
        let has_normals = !self.normals.is_empty();

        // We're going to do many small writes and will typically be writing to
        // a file, so using a `BufWriter` saves excessive syscalls.
        let mut out = BufWriter::new(out);
        writeln!(out, "ply")?;
        writeln!(out, "format {format} 1.0")?;
        writeln!(out, "comment exported by depthmesh")?;
        writeln!(out, "element vertex {}", self.vertices.len())?;
        for p in ["x", "y", "z"] {
            writeln!(out, "property float {p}")?;
        }
        if has_colors {
            for p in ["red", "green", "blue", "alpha"] {
                writeln!(out, "property uchar {p}")?;
            }
        }
        if has_normals {
            for p in ["nx", "ny", "nz"] {
                writeln!(out, "property float {p}")?;
            }
        }
        writeln!(out, "element face {}", triangles.len())?;
        writeln!(out, "property list uchar int vertex_indices")?;
        writeln!(out, "end_header")?;

        match format {
            PlyFormat::Ascii => {
                for (i, v) in self.vertices.iter().enumerate() {
                    write!(out, "{} {} {}", v.x, v.y, v.z)?;
                    if let Some(c) = self.colors.get(i) {
                        write!(out, " {} {} {} 255", c.r, c.g, c.b)?;
                    }
                    if let Some(n) = self.normals.get(i) {
                        write!(out, " {} {} {}", n.x, n.y, n.z)?;
                    }
                    writeln!(out)?;
                }
                for t in triangles {
                    writeln!(out, "3 {} {} {}", t.x, t.y, t.z)?;
                }
            }
            PlyFormat::BinaryLittleEndian => {
                for (i, v) in self.vertices.iter().enumerate() {
                    for p in v {
                        out.write_all(&p.to_le_bytes())?;
                    }
                    if let Some(c) = self.colors.get(i) {
                        out.write_all(&[c.r, c.g, c.b, u8::MAX])?;
                    }
                    if let Some(n) = self.normals.get(i) {
                        for p in n {
                            out.write_all(&p.to_le_bytes())?;
                        }
                    }
                }
                for t in triangles {
                    out.write_all(&[3u8])?;
                    for &i in t {
                        // Checked against `i32::MAX` in `validate_with`
                        out.write_all(&(i as i32).to_le_bytes())?;
                    }
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}
