//! Background export thread
//!
//! Writing a full-resolution capture can take long enough to drop frames, so
//! [`ExportWorker`] copies the buffers and writes them on a dedicated thread.
//! Only one export is ever in flight: while it's running,
//! [`Exporter::busy`] returns `true` and the workflow holds off on the next
//! save.
use super::{CaptureReport, Exporter, Progress, write_file};
use crate::{Error, mesh::Mesh, mesh::PlyFormat};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, error};
use nalgebra::Vector3;
use std::{
    path::{Path, PathBuf},
    thread::JoinHandle,
};

/// Snapshot of a mesh, ready to be written
struct Job {
    path: PathBuf,
    mesh: Mesh,
}

/// [`Exporter`] that writes PLY files on a worker thread
pub struct ExportWorker {
    jobs: Option<Sender<Job>>,
    done: Receiver<Result<CaptureReport, Error>>,
    handle: Option<JoinHandle<()>>,
    pending: bool,
}

impl ExportWorker {
    /// Spawns the worker thread
    pub fn spawn(format: PlyFormat) -> Result<Self, Error> {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let handle = std::thread::Builder::new()
            .name("depthmesh-export".to_owned())
            .spawn(move || {
                for job in job_rx {
                    debug!("export worker: writing {:?}", job.path);
                    let r = write_file(
                        &job.path,
                        &job.mesh,
                        &job.mesh.triangles,
                        format,
                    )
                    .map(|()| CaptureReport {
                        vertex_count: job.mesh.vertex_count(),
                        index_count: job.mesh.index_count(),
                        path: job.path.clone(),
                    })
                    .map_err(|e| Error::ExportFailed {
                        path: job.path,
                        source: Box::new(e),
                    });
                    if done_tx.send(r).is_err() {
                        break;
                    }
                }
                debug!("export worker is done");
            })?;
        Ok(Self {
            jobs: Some(job_tx),
            done: done_rx,
            handle: Some(handle),
            pending: false,
        })
    }

    /// Blocks until the in-flight export (if any) finishes
    pub fn wait(&mut self) -> Option<Result<CaptureReport, Error>> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(self.done.recv().unwrap_or(Err(Error::ExportWorkerGone)))
    }
}

impl Exporter for ExportWorker {
    fn export(
        &mut self,
        path: &Path,
        mesh: &Mesh,
        triangles: &[Vector3<usize>],
    ) -> Result<Progress, Error> {
        if self.pending {
            return Err(Error::ExportWorkerBusy);
        }
        let jobs = self.jobs.as_ref().ok_or(Error::ExportWorkerGone)?;
        let job = Job {
            path: path.to_owned(),
            mesh: Mesh {
                triangles: triangles.to_vec(),
                vertices: mesh.vertices.clone(),
                colors: mesh.colors.clone(),
                normals: mesh.normals.clone(),
            },
        };
        jobs.send(job).map_err(|_| Error::ExportWorkerGone)?;
        self.pending = true;
        Ok(Progress::Pending)
    }

    fn poll(&mut self) -> Option<Result<CaptureReport, Error>> {
        if !self.pending {
            return None;
        }
        match self.done.try_recv() {
            Ok(r) => {
                self.pending = false;
                Some(r)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = false;
                Some(Err(Error::ExportWorkerGone))
            }
        }
    }

    fn busy(&self) -> bool {
        self.pending
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        // Closing the job channel stops the worker after its current job
        self.jobs.take();
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                error!("export worker thread panicked");
            }
        }
    }
}
