//! Depth-grid meshing
//!
//! Reconstruction runs in two passes over a [`SampleSource`]:
//!
//! - Every valid cell becomes a vertex, in row-major order.  A cell is valid
//!   when its distance is positive and its world-space Z is both positive and
//!   inside the [`ClipRange`].
//! - Every 2×2 block of cells is split into two triangles,
//!   ```text
//!   (x, y) ------ (x+1, y)
//!     |  A      /    |
//!     |      /    B  |
//!   (x, y+1) -- (x+1, y+1)
//!   ```
//!   `A = (00, 10, 01)` and `B = (10, 11, 01)`.  Each triangle is emitted only
//!   if all three of its corners are valid, so depth discontinuities (which
//!   show up as clipped or missing cells) leave holes instead of stretching
//!   triangles between foreground and background.
//!
//! ```
//! use depthmesh::{config::ClipRange, source::DepthFrame};
//! use nalgebra::Vector3;
//!
//! let mut frame = DepthFrame::new(2, 2);
//! for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
//!     frame.set(x, y, 600.0, Vector3::new(x as f32, y as f32, 600.0));
//! }
//! let mesh = depthmesh::reconstruct(&frame, ClipRange::default());
//! assert_eq!(mesh.vertex_count(), 4);
//! assert_eq!(mesh.face_count(), 2);
//! ```
use crate::{
    config::ClipRange,
    source::{Rgb, SampleSource},
};
use nalgebra::Vector3;

mod builder;
mod normals;
mod output;

use builder::MeshBuilder;
pub use normals::swap_winding;
pub use output::PlyFormat;

/// An indexed, per-vertex colored 3D mesh
///
/// `colors` always has one entry per vertex; `normals` is either empty or has
/// one entry per vertex (see [`Mesh::estimate_normals`]).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Triangles, as indexes into [`self.vertices`](Self::vertices)
    pub triangles: Vec<Vector3<usize>>,
    /// Vertex positions, in world space
    pub vertices: Vec<Vector3<f32>>,
    /// Vertex colors
    pub colors: Vec<Rgb>,
    /// Vertex normals
    pub normals: Vec<Vector3<f32>>,
}

impl Mesh {
    /// Builds a new, empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all data, keeping allocations
    pub fn clear(&mut self) {
        self.triangles.clear();
        self.vertices.clear();
        self.colors.clear();
        self.normals.clear();
    }

    /// Checks whether the last reconstruction produced any vertices
    pub fn has_cloud(&self) -> bool {
        !self.vertices.is_empty()
    }

    /// Returns the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of triangle indices (three per triangle)
    pub fn index_count(&self) -> usize {
        self.triangles.len() * 3
    }

    /// Returns the number of triangles
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    /// Clears this mesh and refills it from the given source
    ///
    /// This is equivalent to [`reconstruct`], but reuses existing allocations;
    /// it's meant to be called once per frame on a long-lived mesh.
    pub fn rebuild<S: SampleSource + ?Sized>(
        &mut self,
        source: &S,
        clip: ClipRange,
    ) {
        let (w, h) = (source.width(), source.height());
        let mut b = MeshBuilder::new(std::mem::take(self), w, h);

        let have_rgb = source.has_color_channel();
        for y in 0..h {
            for x in 0..w {
                if source.distance_at(x, y) <= 0.0 {
                    continue;
                }
                let p = source.world_position_at(x, y);
                if !(p.z > 0.0 && clip.contains(p.z)) {
                    continue;
                }
                let c = if have_rgb {
                    source.color_at(x, y)
                } else {
                    Rgb::WHITE
                };
                b.push_vertex(x, y, p, c);
            }
        }

        for y in 0..h.saturating_sub(1) {
            for x in 0..w.saturating_sub(1) {
                let i00 = b.get(x, y);
                let i10 = b.get(x + 1, y);
                let i01 = b.get(x, y + 1);
                let i11 = b.get(x + 1, y + 1);

                if let (Some(a), Some(b10), Some(c)) = (i00, i10, i01) {
                    b.push(Vector3::new(a, b10, c));
                }
                if let (Some(a), Some(b11), Some(c)) = (i10, i11, i01) {
                    b.push(Vector3::new(a, b11, c));
                }
            }
        }

        *self = b.take();
    }
}

/// Reconstructs a mesh from one frame of samples
pub fn reconstruct<S: SampleSource + ?Sized>(
    source: &S,
    clip: ClipRange,
) -> Mesh {
    let mut mesh = Mesh::new();
    mesh.rebuild(source, clip);
    mesh
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::DepthFrame;

    /// Builds a `w × h` frame where every cell is at `z`
    fn flat(w: usize, h: usize, z: f32) -> DepthFrame {
        let mut f = DepthFrame::new(w, h);
        for y in 0..h {
            for x in 0..w {
                f.set(x, y, z, Vector3::new(x as f32, y as f32, z));
            }
        }
        f
    }

    #[test]
    fn test_empty_frame() {
        let f = DepthFrame::new(8, 6);
        let mesh = reconstruct(&f, ClipRange::default());
        assert!(!mesh.has_cloud());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.index_count(), 0);

        let f = DepthFrame::new(0, 0);
        let mesh = reconstruct(&f, ClipRange::default());
        assert!(!mesh.has_cloud());
        assert_eq!(mesh.index_count(), 0);
    }

    #[test]
    fn test_all_clipped() {
        let f = flat(4, 4, 900.0);
        let mesh = reconstruct(&f, ClipRange::default());
        assert!(!mesh.has_cloud());
        assert!(mesh.triangles.is_empty());

        let f = flat(4, 4, 600.0);
        let mesh = reconstruct(&f, ClipRange::new(800, 500));
        assert!(!mesh.has_cloud());
    }

    #[test]
    fn test_clip_bounds_are_inclusive() {
        let mut f = flat(2, 1, 500.0);
        f.set(1, 0, 800.0, Vector3::new(1.0, 0.0, 800.0));
        let mesh = reconstruct(&f, ClipRange::default());
        assert_eq!(mesh.vertex_count(), 2);
    }

    #[test]
    fn test_distance_and_z_must_be_positive() {
        let mut f = flat(3, 1, 600.0);
        // Valid position, but the sensor reported no distance
        f.set(0, 0, 0.0, Vector3::new(0.0, 0.0, 600.0));
        // Valid distance, negative Z
        f.set(1, 0, 600.0, Vector3::new(1.0, 0.0, -600.0));
        let mesh = reconstruct(&f, ClipRange::new(0, 1000));
        assert_eq!(mesh.vertices, vec![Vector3::new(2.0, 0.0, 600.0)]);
    }

    #[test]
    fn test_full_grid() {
        let (w, h) = (7, 5);
        let mesh = reconstruct(&flat(w, h, 600.0), ClipRange::default());
        assert_eq!(mesh.vertex_count(), w * h);
        assert_eq!(mesh.face_count(), 2 * (w - 1) * (h - 1));

        // Row-major vertex order
        for (i, v) in mesh.vertices.iter().enumerate() {
            assert_eq!(v.x, (i % w) as f32);
            assert_eq!(v.y, (i / w) as f32);
        }
    }

    #[test]
    fn test_two_by_two() {
        let mesh = reconstruct(&flat(2, 2, 600.0), ClipRange::default());
        assert_eq!(
            mesh.triangles,
            vec![Vector3::new(0, 1, 2), Vector3::new(1, 3, 2)]
        );
    }

    #[test]
    fn test_three_corners_make_one_triangle() {
        // Missing (1, 1) keeps only the upper-left triangle
        let mut f = flat(2, 2, 600.0);
        f.set(1, 1, 0.0, Vector3::zeros());
        let mesh = reconstruct(&f, ClipRange::default());
        assert_eq!(mesh.triangles, vec![Vector3::new(0, 1, 2)]);

        // Missing (0, 0) keeps only the lower-right triangle
        let mut f = flat(2, 2, 600.0);
        f.set(0, 0, 0.0, Vector3::zeros());
        let mesh = reconstruct(&f, ClipRange::default());
        assert_eq!(mesh.triangles, vec![Vector3::new(0, 2, 1)]);

        // Two missing corners leave no triangles at all
        let mut f = flat(2, 2, 600.0);
        f.set(0, 0, 0.0, Vector3::zeros());
        f.set(1, 1, 0.0, Vector3::zeros());
        let mesh = reconstruct(&f, ClipRange::default());
        assert_eq!(mesh.vertex_count(), 2);
        assert!(mesh.triangles.is_empty());
    }

    #[test]
    fn test_colors() {
        let mut f = flat(2, 1, 600.0);
        let mesh = reconstruct(&f, ClipRange::default());
        assert_eq!(mesh.colors, vec![Rgb::WHITE; 2]);

        f.set_color(1, 0, Rgb::new(1, 2, 3));
        let mesh = reconstruct(&f, ClipRange::default());
        assert_eq!(mesh.colors, vec![Rgb::WHITE, Rgb::new(1, 2, 3)]);
    }

    #[test]
    fn test_rebuild_discards_previous_frame() {
        let mut mesh = reconstruct(&flat(4, 4, 600.0), ClipRange::default());
        mesh.estimate_normals(true);
        assert!(!mesh.normals.is_empty());

        mesh.rebuild(&flat(2, 2, 600.0), ClipRange::default());
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.colors.len(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert!(mesh.normals.is_empty());

        mesh.rebuild(&DepthFrame::new(4, 4), ClipRange::default());
        assert!(!mesh.has_cloud());
        assert!(mesh.triangles.is_empty());
    }
}
