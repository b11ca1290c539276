use super::Mesh;
use crate::source::Rgb;
use nalgebra::Vector3;

/// Container used during construction of a [`Mesh`]
pub struct MeshBuilder {
    /// Map from grid cells (row-major) to `out.vertices`
    ///
    /// `usize::MAX` is used as a marker for a cell that emitted no vertex
    map: Vec<usize>,
    width: usize,
    out: Mesh,
}

impl MeshBuilder {
    /// Builds a new builder for a `width × height` grid
    ///
    /// `out` is cleared, but its allocations are reused.
    pub fn new(mut out: Mesh, width: usize, height: usize) -> Self {
        out.clear();
        Self {
            map: vec![usize::MAX; width * height],
            width,
            out,
        }
    }

    /// Adds a vertex for the cell at `(x, y)`
    pub fn push_vertex(&mut self, x: usize, y: usize, p: Vector3<f32>, c: Rgb) {
        let next_vert = self.out.vertices.len();
        debug_assert_ne!(next_vert, usize::MAX);
        self.out.vertices.push(p);
        self.out.colors.push(c);
        self.map[y * self.width + x] = next_vert;
    }

    /// Looks up the vertex for the cell at `(x, y)`, if there is one
    pub fn get(&self, x: usize, y: usize) -> Option<usize> {
        match self.map[y * self.width + x] {
            usize::MAX => None,
            u => Some(u),
        }
    }

    pub fn push(&mut self, tri: Vector3<usize>) {
        self.out.triangles.push(tri)
    }

    pub fn take(self) -> Mesh {
        self.out
    }
}
