//! Module containing the universal error type
use std::path::PathBuf;
use thiserror::Error;

/// Universal error type for `depthmesh`
#[derive(Error, Debug)]
pub enum Error {
    /// Sample buffers do not match the grid dimensions
    #[error("grid buffer has {actual} samples; expected {expected}")]
    BadGridSize {
        /// Expected sample count (`width * height`)
        expected: usize,
        /// Length of the buffer that was provided
        actual: usize,
    },

    /// Triangle index is out of range for the vertex buffer
    #[error("triangle index {index} is out of range ({vertex_count} vertices)")]
    BadIndex {
        /// Offending index
        index: usize,
        /// Number of vertices in the mesh
        vertex_count: usize,
    },

    /// Normal buffer is populated but does not have one entry per vertex
    #[error("mesh has {0} normals but {1} vertices")]
    BadNormalCount(usize, usize),

    /// Color buffer does not have one entry per vertex
    #[error("mesh has {0} colors but {1} vertices")]
    BadColorCount(usize, usize),

    /// Vertex count cannot be addressed by a PLY `int` index
    #[error("mesh has too many vertices ({0}) for a PLY index")]
    TooManyVertices(usize),

    /// Capture was requested while the mesh has no vertices
    #[error("no vertices in mesh; skipping save")]
    EmptyMesh,

    /// Writing a capture file failed
    #[error("failed to write {path:?}: {source}")]
    ExportFailed {
        /// Resolved output path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The background export thread is no longer running
    #[error("export worker thread has stopped")]
    ExportWorkerGone,

    /// The background export thread is still writing a previous capture
    #[error("export worker is busy with a previous capture")]
    ExportWorkerBusy,

    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}
