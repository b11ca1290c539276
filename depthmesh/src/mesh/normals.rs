//! Per-vertex normal estimation
use super::Mesh;
use nalgebra::Vector3;

impl Mesh {
    /// Recomputes per-vertex normals from the current triangles
    ///
    /// Each triangle's unnormalized face normal `(b - a) × (c - a)` is added to
    /// all three of its vertices, then the sums are normalized.  Area-weighting
    /// falls out of the cross product's magnitude.  Vertices that aren't used
    /// by any (non-degenerate) triangle get a zero normal.
    ///
    /// With `flip`, every normal is negated after normalization; this
    /// reconciles the two front-face conventions used for display and export.
    ///
    /// If the mesh has no vertices or no triangles, the normals are cleared
    /// and left empty.
    pub fn estimate_normals(&mut self, flip: bool) {
        let mut acc = std::mem::take(&mut self.normals);
        acc.clear();
        if self.vertices.is_empty() || self.triangles.is_empty() {
            self.normals = acc;
            return;
        }
        acc.resize(self.vertices.len(), Vector3::zeros());

        for t in &self.triangles {
            let a = self.vertices[t.x];
            let b = self.vertices[t.y];
            let c = self.vertices[t.z];
            let n = (b - a).cross(&(c - a));
            acc[t.x] += n;
            acc[t.y] += n;
            acc[t.z] += n;
        }

        for n in acc.iter_mut() {
            // Never normalize a zero vector
            if n.norm_squared() > 0.0 {
                n.normalize_mut();
            }
            if flip {
                n.neg_mut();
            }
        }
        self.normals = acc;
    }
}

/// Reverses the winding of every triangle by swapping its last two indices
///
/// Applying this twice restores the original triangles.
pub fn swap_winding(triangles: &mut [Vector3<usize>]) {
    for t in triangles {
        *t = Vector3::new(t.x, t.z, t.y);
    }
}
