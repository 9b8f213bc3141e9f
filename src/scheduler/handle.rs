//! Host-facing scheduler handle
//!
//! Every method posts a command and returns immediately; none of them block
//! the calling thread. Requests with results hand back a future that resolves
//! once the scheduler has processed the command.

use std::future::Future;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};

use crate::decode::MediaOptions;
use crate::error::{Result, SchedulerError};
use crate::graphics::SurfaceHandle;

use super::command::Command;
use super::diagnostics::{FrameSnapshot, SchedulerDiagnostics};

/// Cloneable handle to a running scheduler
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    fn post(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| SchedulerError::Closed.into())
    }

    /// Attach `surface` to the stream at `url`
    ///
    /// Rejections (surface already bound, admission limit reached) are
    /// logged by the scheduler; the only error returned here is
    /// [`SchedulerError::Closed`].
    pub fn attach(
        &self,
        url: impl Into<String>,
        surface: SurfaceHandle,
        width: u32,
        height: u32,
        options: MediaOptions,
    ) -> Result<()> {
        self.post(Command::Attach {
            url: url.into(),
            surface,
            width,
            height,
            options,
        })
    }

    /// Detach `surface` from the stream at `url`
    pub fn detach(&self, url: impl Into<String>, surface: SurfaceHandle) -> Result<()> {
        self.post(Command::Detach {
            url: url.into(),
            surface,
        })
    }

    /// Update a surface's physical size
    pub fn resize(&self, surface: SurfaceHandle, width: u32, height: u32) -> Result<()> {
        self.post(Command::Resize {
            surface,
            width,
            height,
        })
    }

    /// Show or hide a surface without detaching it
    pub fn set_visibility(&self, surface: SurfaceHandle, visible: bool) -> Result<()> {
        self.post(Command::SetVisibility { surface, visible })
    }

    /// Change the admission limit; live pipelines are never evicted
    pub fn set_admission_limit(&self, limit: usize) -> Result<()> {
        self.post(Command::SetAdmissionLimit(limit))
    }

    /// Read back the last frame shown on `surface`
    ///
    /// Resolves to `None` when the surface is unknown, no frame has been
    /// produced yet, or the scheduler has stopped.
    pub fn capture(&self, surface: SurfaceHandle) -> impl Future<Output = Option<FrameSnapshot>> {
        let (reply, rx) = oneshot::channel();
        let posted = self.post(Command::Capture { surface, reply });
        async move {
            posted.ok()?;
            rx.await.ok().flatten()
        }
    }

    /// Snapshot of every pipeline and binding
    pub fn diagnostics(&self) -> impl Future<Output = Option<SchedulerDiagnostics>> {
        let (reply, rx) = oneshot::channel();
        let posted = self.post(Command::Diagnostics { reply });
        async move {
            posted.ok()?;
            rx.await.ok()
        }
    }

    /// Log the diagnostics dump at info level
    pub fn print_diagnostics(&self) -> Result<()> {
        self.post(Command::PrintDiagnostics)
    }

    /// Release everything and stop the scheduler
    ///
    /// Idempotent; the future resolves once teardown has run (or at once if
    /// the scheduler is already gone).
    pub fn shutdown(&self) -> impl Future<Output = ()> {
        let (done, rx) = oneshot::channel();
        let _ = self.post(Command::Shutdown { done: Some(done) });
        async move {
            let _ = rx.await;
        }
    }

    /// Whether the scheduler task is still accepting commands
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Scheduler running on its own OS thread
///
/// Dropping this posts a shutdown without waiting for it.
#[derive(Debug)]
pub struct SchedulerThread {
    handle: SchedulerHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl SchedulerThread {
    pub(crate) fn new(handle: SchedulerHandle, thread: JoinHandle<Result<()>>) -> Self {
        Self {
            handle,
            thread: Some(thread),
        }
    }

    /// A handle for posting commands
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Shut the scheduler down and wait for its thread to exit
    ///
    /// Returns the initialization error if the scheduler never started.
    pub fn join(mut self) -> Result<()> {
        let _ = self.handle.post(Command::Shutdown { done: None });
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .unwrap_or_else(|_| Err(SchedulerError::Closed.into())),
            None => Ok(()),
        }
    }
}

impl Drop for SchedulerThread {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.handle.post(Command::Shutdown { done: None });
        }
    }
}
