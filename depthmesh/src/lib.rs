//! `depthmesh` turns frames from a depth camera into textured triangle meshes,
//! and captures single frames to PLY files.
//!
//! A depth camera produces a **grid** of samples every frame.  Each cell of
//! the grid has a raw distance, a world-space position, and (if the camera
//! also has a color stream registered to the depth stream) a color.  Cells
//! where the sensor saw nothing have a distance of zero.
//!
//! # Sample sources
//! Sample grids are provided through the
//! [`SampleSource`](crate::source::SampleSource) trait.  Device drivers
//! implement it directly; the crate also includes
//! [`DepthFrame`](crate::source::DepthFrame), an owned in-memory grid that can
//! be filled cell-by-cell or built from a 16-bit depth map and a set of
//! [`Pinhole`](crate::source::Pinhole) intrinsics.
//!
//! # Reconstruction
//! [`reconstruct`] (or [`Mesh::rebuild`](crate::mesh::Mesh::rebuild), which
//! reuses allocations) builds a [`Mesh`](crate::mesh::Mesh) from one frame:
//! ```
//! use depthmesh::{config::ClipRange, source::{DepthFrame, Rgb}};
//! use nalgebra::Vector3;
//!
//! let mut frame = DepthFrame::new(3, 3);
//! for y in 0..3 {
//!     for x in 0..3 {
//!         let p = Vector3::new(x as f32, y as f32, 650.0);
//!         frame.set(x, y, 650.0, p);
//!     }
//! }
//! // This cell is too far away and will be clipped
//! frame.set(2, 2, 900.0, Vector3::new(2.0, 2.0, 900.0));
//! frame.set_color(0, 0, Rgb::new(255, 0, 0));
//!
//! let mesh = depthmesh::reconstruct(&frame, ClipRange::new(500, 800));
//! assert_eq!(mesh.vertex_count(), 8);
//! assert_eq!(mesh.face_count(), 7);
//! assert_eq!(mesh.colors[0], Rgb::new(255, 0, 0));
//! ```
//!
//! Cells are kept if their world-space Z is inside the
//! [`ClipRange`](crate::config::ClipRange); each 2×2 block of kept cells
//! becomes two triangles.  A block with one missing corner still produces the
//! triangle on the other side of the diagonal, so the surface tracks the edge
//! of an object without bridging across depth discontinuities.
//!
//! # Normals
//! [`Mesh::estimate_normals`](crate::mesh::Mesh::estimate_normals) computes
//! area-weighted vertex normals from the triangles.  Its `flip` argument
//! negates the result, which is how the same geometry is shaded with two
//! different front-face conventions:
//! ```
//! # use depthmesh::{config::ClipRange, source::DepthFrame};
//! # use nalgebra::Vector3;
//! # let mut frame = DepthFrame::new(2, 2);
//! # for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
//! #     frame.set(x, y, 600.0, Vector3::new(x as f32, y as f32, 600.0));
//! # }
//! let mut mesh = depthmesh::reconstruct(&frame, ClipRange::default());
//! mesh.estimate_normals(false);
//! assert_eq!(mesh.normals[0], Vector3::new(0.0, 0.0, 1.0));
//! mesh.estimate_normals(true);
//! assert_eq!(mesh.normals[0], Vector3::new(0.0, 0.0, -1.0));
//! ```
//!
//! # Capture
//! [`CaptureWorkflow`](crate::capture::CaptureWorkflow) runs a countdown, then
//! writes the current mesh to `cloud_<timestamp>.ply`.  The exported file has
//! reversed winding and matching normals; the live mesh keeps its triangles
//! and ends up with display-oriented normals.  Writing can happen on the frame
//! thread ([`PlyExporter`](crate::capture::PlyExporter)) or on a background
//! thread ([`ExportWorker`](crate::capture::worker::ExportWorker)).
//!
//! ```no_run
//! use depthmesh::{
//!     capture::{CaptureWorkflow, PlyExporter},
//!     config::{CaptureConfig, ClipRange},
//!     mesh::Mesh,
//!     source::DepthFrame,
//! };
//! use std::time::Instant;
//!
//! let config = CaptureConfig::default();
//! let mut capture =
//!     CaptureWorkflow::new(config.clone(), PlyExporter::new(config.format));
//! let mut mesh = Mesh::new();
//! capture.trigger(Instant::now());
//! loop {
//!     let frame = DepthFrame::new(640, 480); // read from a device here
//!     mesh.rebuild(&frame, ClipRange::default());
//!     if let Some(event) = capture.tick(Instant::now(), &mut mesh) {
//!         println!("{event:?}");
//!         break;
//!     }
//! }
//! ```
#![warn(missing_docs)]

pub mod capture;
pub mod config;
pub mod mesh;
pub mod source;

mod error;
pub use error::Error;

pub use mesh::reconstruct;
