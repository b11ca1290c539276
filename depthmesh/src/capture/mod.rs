//! Countdown-then-export capture of a single reconstructed frame
//!
//! [`CaptureWorkflow`] is a small state machine advanced once per frame by
//! [`CaptureWorkflow::tick`].  A call to [`CaptureWorkflow::trigger`] starts a
//! countdown; when it runs out, the current mesh is written to a timestamped
//! PLY file with reversed winding and matching normals, then the live mesh's
//! normals are restored to the display orientation.
//!
//! ```text
//!            trigger (from any state)
//!                    |
//!                    v
//!   Idle <--- CountingDown(n) --(n == 1)--> Saving ---> JustSaved(n) ---> Idle
//!     ^          (n -= 1)                     |
//!     +------------- empty mesh --------------+
//! ```
use crate::{
    Error,
    config::{CaptureConfig, EmptyMeshPolicy},
    mesh::{Mesh, PlyFormat, swap_winding},
};
use log::{debug, error, info};
use nalgebra::Vector3;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};

pub mod worker;

/// Current state of a [`CaptureWorkflow`]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CaptureState {
    /// Nothing is pending
    Idle,
    /// Counting down to a capture; the value is the number on screen
    CountingDown(u32),
    /// Waiting to export (only while a previous export is still running)
    Saving,
    /// Post-capture countdown, ending in [`CaptureState::Idle`]
    ///
    /// It steps once per delay like [`CaptureState::CountingDown`], but plays
    /// no cues and never saves.
    JustSaved(u32),
}

impl CaptureState {
    /// Checks whether the live mesh should be forced on screen
    ///
    /// This is true on the last countdown step, so the user can see what's
    /// about to be captured.
    pub fn shows_mesh(&self) -> bool {
        matches!(self, CaptureState::CountingDown(1) | CaptureState::Saving)
    }

    /// Returns the countdown number to draw, if a capture is pending
    pub fn countdown_label(&self) -> Option<u32> {
        match self {
            CaptureState::CountingDown(n) => Some(*n),
            _ => None,
        }
    }
}

/// Audible cue
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Cue {
    /// Played on trigger and at every countdown step
    Countdown,
    /// Played when the capture happens
    Shutter,
}

/// Plays [`Cue`]s, if the application has a way to do so
pub trait CuePlayer {
    /// Plays the given cue without blocking
    fn play(&mut self, cue: Cue);
}

/// [`CuePlayer`] that does nothing
#[derive(Copy, Clone, Debug, Default)]
pub struct Silent;

impl CuePlayer for Silent {
    fn play(&mut self, _cue: Cue) {}
}

/// Result of a successful capture
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaptureReport {
    /// Path of the file that was written
    pub path: PathBuf,
    /// Number of vertices in the file
    pub vertex_count: usize,
    /// Number of triangle indices in the file
    pub index_count: usize,
}

/// Observation emitted by [`CaptureWorkflow::tick`]
#[derive(Debug)]
pub enum CaptureEvent {
    /// A capture file was written
    Saved(CaptureReport),
    /// A capture failed; no file was written
    Failed(Error),
}

/// Whether an export finished immediately or is still running
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Progress {
    /// The file has been written
    Done,
    /// The export will be reported later by [`Exporter::poll`]
    Pending,
}

/// Writes capture files
pub trait Exporter {
    /// Exports `mesh`, using `triangles` instead of [`Mesh::triangles`]
    ///
    /// Implementations that return [`Progress::Pending`] must not hold onto
    /// the borrowed buffers; the caller mutates the mesh right after this
    /// returns.
    fn export(
        &mut self,
        path: &Path,
        mesh: &Mesh,
        triangles: &[Vector3<usize>],
    ) -> Result<Progress, Error>;

    /// Returns the result of a finished background export, if any
    fn poll(&mut self) -> Option<Result<CaptureReport, Error>> {
        None
    }

    /// Checks whether an export is still in flight
    fn busy(&self) -> bool {
        false
    }
}

/// [`Exporter`] that writes PLY files on the calling thread
#[derive(Copy, Clone, Debug, Default)]
pub struct PlyExporter {
    /// Output encoding
    pub format: PlyFormat,
}

impl PlyExporter {
    /// Builds a new exporter
    pub fn new(format: PlyFormat) -> Self {
        Self { format }
    }
}

impl Exporter for PlyExporter {
    fn export(
        &mut self,
        path: &Path,
        mesh: &Mesh,
        triangles: &[Vector3<usize>],
    ) -> Result<Progress, Error> {
        write_file(path, mesh, triangles, self.format)?;
        Ok(Progress::Done)
    }
}

/// Writes a PLY file, creating its parent directory if needed
pub(crate) fn write_file(
    path: &Path,
    mesh: &Mesh,
    triangles: &[Vector3<usize>],
    format: PlyFormat,
) -> Result<(), Error> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut f = std::fs::File::create(path)?;
    mesh.write_ply_with(&mut f, format, triangles)
}

/// Exports `mesh` with reversed winding and outward normals
///
/// The triangles written are a copy of [`Mesh::triangles`] with each
/// triangle's last two indices swapped; the normals are recomputed for that
/// copy's orientation before the export.  Afterwards, `mesh` is left with its
/// own triangles and flipped (display-oriented) normals, whether or not the
/// export succeeded.
///
/// A mesh that fails [`Mesh::validate`] is rejected before anything is
/// touched.
///
/// Returns `Ok(None)` if the exporter queued the file for later.
pub fn export_mesh<E: Exporter + ?Sized>(
    exporter: &mut E,
    path: &Path,
    mesh: &mut Mesh,
) -> Result<Option<CaptureReport>, Error> {
    let failed = |e| Error::ExportFailed {
        path: path.to_owned(),
        source: Box::new(e),
    };
    mesh.validate().map_err(failed)?;

    let mut triangles = mesh.triangles.clone();
    swap_winding(&mut triangles);
    mesh.estimate_normals(false);

    let r = exporter.export(path, mesh, &triangles);

    // Put the live normals back into the display orientation
    mesh.estimate_normals(true);

    match r {
        Ok(Progress::Done) => Ok(Some(CaptureReport {
            path: path.to_owned(),
            vertex_count: mesh.vertex_count(),
            index_count: triangles.len() * 3,
        })),
        Ok(Progress::Pending) => Ok(None),
        Err(e) => Err(failed(e)),
    }
}

/// Builds a capture file name, e.g. `cloud_2024-01-31_12-00-59.ply`
pub fn capture_file_name(prefix: &str, time: chrono::NaiveDateTime) -> String {
    format!("{prefix}{}.ply", time.format("%Y-%m-%d_%H-%M-%S"))
}

/// Countdown-then-export state machine
pub struct CaptureWorkflow<E, C = Silent> {
    config: CaptureConfig,
    state: CaptureState,
    /// Time of the last countdown step
    anchor: Instant,
    exporter: E,
    cues: C,
}

impl<E: Exporter> CaptureWorkflow<E, Silent> {
    /// Builds a new, idle workflow without cues
    pub fn new(config: CaptureConfig, exporter: E) -> Self {
        Self::with_cues(config, exporter, Silent)
    }
}

impl<E: Exporter, C: CuePlayer> CaptureWorkflow<E, C> {
    /// Builds a new, idle workflow
    pub fn with_cues(config: CaptureConfig, exporter: E, cues: C) -> Self {
        Self {
            config,
            state: CaptureState::Idle,
            anchor: Instant::now(),
            exporter,
            cues,
        }
    }

    /// Returns the current state
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Returns the workflow's configuration
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Borrows the exporter
    pub fn exporter(&self) -> &E {
        &self.exporter
    }

    /// Mutably borrows the exporter
    pub fn exporter_mut(&mut self) -> &mut E {
        &mut self.exporter
    }

    /// Borrows the cue player
    pub fn cues(&self) -> &C {
        &self.cues
    }

    /// Starts (or restarts) the capture countdown
    pub fn trigger(&mut self, now: Instant) {
        let n = self.config.countdown.max(1);
        self.set_state(CaptureState::CountingDown(n));
        self.anchor = now;
        self.cues.play(Cue::Countdown);
    }

    /// Advances the state machine
    ///
    /// This should be called once per frame, after `mesh` has been rebuilt for
    /// that frame.  It returns an observation when a capture succeeds or
    /// fails.
    pub fn tick(
        &mut self,
        now: Instant,
        mesh: &mut Mesh,
    ) -> Option<CaptureEvent> {
        if let Some(r) = self.exporter.poll() {
            return Some(Self::observe(r));
        }

        let elapsed = now.saturating_duration_since(self.anchor)
            >= self.config.step_delay();
        match self.state {
            CaptureState::Idle => None,
            CaptureState::CountingDown(_) | CaptureState::JustSaved(_)
                if !elapsed =>
            {
                None
            }
            CaptureState::CountingDown(n) if n > 1 => {
                self.set_state(CaptureState::CountingDown(n - 1));
                self.anchor = now;
                self.cues.play(Cue::Countdown);
                None
            }
            CaptureState::CountingDown(_) => {
                self.set_state(CaptureState::Saving);
                self.save(now, mesh)
            }
            CaptureState::Saving => self.save(now, mesh),
            CaptureState::JustSaved(n) => {
                self.set_state(if n > 1 {
                    CaptureState::JustSaved(n - 1)
                } else {
                    CaptureState::Idle
                });
                self.anchor = now;
                None
            }
        }
    }

    fn set_state(&mut self, state: CaptureState) {
        if state != self.state {
            debug!("capture: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Runs the export sequence, unless a previous export is still running
    fn save(&mut self, now: Instant, mesh: &mut Mesh) -> Option<CaptureEvent> {
        if self.exporter.busy() {
            return None;
        }
        self.cues.play(Cue::Shutter);
        self.anchor = now;

        if !mesh.has_cloud() {
            self.set_state(match self.config.on_empty_mesh {
                EmptyMeshPolicy::Idle => CaptureState::Idle,
                EmptyMeshPolicy::Retry => {
                    CaptureState::CountingDown(self.config.cooldown.max(1))
                }
            });
            return Some(Self::observe(Err(Error::EmptyMesh)));
        }

        self.set_state(match self.config.cooldown {
            0 => CaptureState::Idle,
            n => CaptureState::JustSaved(n),
        });

        let name = capture_file_name(
            &self.config.file_prefix,
            chrono::Local::now().naive_local(),
        );
        let path = self.config.output_dir.join(name);
        match export_mesh(&mut self.exporter, &path, mesh) {
            Ok(Some(report)) => Some(Self::observe(Ok(report))),
            Ok(None) => {
                debug!("capture: export to {path:?} queued");
                None
            }
            Err(e) => Some(Self::observe(Err(e))),
        }
    }

    fn observe(r: Result<CaptureReport, Error>) -> CaptureEvent {
        match r {
            Ok(report) => {
                info!(
                    "Saved {:?} verts={} indices={}",
                    report.path, report.vertex_count, report.index_count
                );
                CaptureEvent::Saved(report)
            }
            Err(e) => {
                error!("capture failed: {e}");
                CaptureEvent::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_capture_file_name() {
        let t = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        assert_eq!(
            capture_file_name("cloud_", t),
            "cloud_2024-01-31_09-05-07.ply"
        );
    }

    #[test]
    fn test_state_helpers() {
        assert!(CaptureState::CountingDown(1).shows_mesh());
        assert!(CaptureState::Saving.shows_mesh());
        assert!(!CaptureState::CountingDown(2).shows_mesh());
        assert!(!CaptureState::JustSaved(1).shows_mesh());
        assert_eq!(CaptureState::CountingDown(3).countdown_label(), Some(3));
        assert_eq!(CaptureState::JustSaved(3).countdown_label(), None);
        assert_eq!(CaptureState::Idle.countdown_label(), None);
    }

    #[test]
    fn test_cue_names() {
        assert_eq!(Cue::Countdown.to_string(), "countdown");
        assert_eq!(Cue::Shutter.to_string(), "shutter");
    }
}
