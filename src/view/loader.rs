use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::audio::{AnalysisJob, AnalysisParams, MagnitudeField, Progress, SampleBuffer};
use crate::error::{EngineError, Result};

/// What the renderer can currently draw from.
#[derive(Clone, Debug)]
pub enum FieldState {
    Empty,
    Pending { done: usize, total: usize },
    Ready(Arc<MagnitudeField>),
    Unavailable(String),
}

enum LoadMessage {
    Progress { generation: u64, done: usize, total: usize },
    Finished { generation: u64, result: Result<MagnitudeField> },
}

/// Runs STFT analysis off the interaction thread.
///
/// Each `load` bumps the generation and raises the cancel flag of the
/// previous job. Worker output is only applied from `poll`, on the caller's
/// thread, and only when its generation is still current, so a newer load
/// can never be overwritten by an older one.
pub struct FieldLoader {
    generation: u64,
    cancel: Option<Arc<AtomicBool>>,
    tx: Sender<LoadMessage>,
    rx: Receiver<LoadMessage>,
    state: FieldState,
}

impl Default for FieldLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            generation: 0,
            cancel: None,
            tx,
            rx,
            state: FieldState::Empty,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    pub fn field(&self) -> Option<Arc<MagnitudeField>> {
        match &self.state {
            FieldState::Ready(field) => Some(Arc::clone(field)),
            _ => None,
        }
    }

    /// Start analyzing `buffer`, discarding whatever was loading before.
    ///
    /// Bad parameters fail here, before any work is spawned.
    pub fn load(&mut self, buffer: SampleBuffer, params: AnalysisParams) -> Result<u64> {
        params.validate()?;
        self.cancel_in_flight();

        self.generation += 1;
        let generation = self.generation;
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Some(Arc::clone(&cancel));
        self.state = FieldState::Pending {
            done: 0,
            total: params.column_count(buffer.len()),
        };

        let tx = self.tx.clone();
        thread::Builder::new()
            .name(format!("analysis-{generation}"))
            .spawn(move || {
                let result = run_job(&buffer, params, &cancel, |done, total| {
                    let _ = tx.send(LoadMessage::Progress { generation, done, total });
                });
                let _ = tx.send(LoadMessage::Finished { generation, result });
            })
            .map_err(|err| self.spawn_failed(err))?;

        log::info!("Started analysis generation {}", generation);
        Ok(generation)
    }

    /// Forget the current field and stop any running analysis.
    pub fn clear(&mut self) {
        self.cancel_in_flight();
        self.generation += 1;
        self.state = FieldState::Empty;
    }

    /// Apply messages from workers. Returns true when the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.rx.try_recv() {
            changed |= self.apply(message);
        }
        changed
    }

    /// Block until the current generation finishes or all workers are gone.
    pub fn wait(&mut self) -> &FieldState {
        while matches!(self.state, FieldState::Pending { .. }) {
            match self.rx.recv() {
                Ok(message) => {
                    self.apply(message);
                }
                Err(_) => break,
            }
        }
        &self.state
    }

    /// A worker that never started will never report, so settle the state
    /// here instead of leaving it `Pending`.
    fn spawn_failed(&mut self, err: std::io::Error) -> EngineError {
        self.cancel = None;
        let err = EngineError::AnalysisUnavailable(format!("failed to spawn analysis: {err}"));
        log::warn!("{}", err);
        self.state = FieldState::Unavailable(err.to_string());
        err
    }

    fn apply(&mut self, message: LoadMessage) -> bool {
        match message {
            LoadMessage::Progress { generation, done, total } => {
                if generation != self.generation {
                    return false;
                }
                self.state = FieldState::Pending { done, total };
                true
            }
            LoadMessage::Finished { generation, result } => {
                if generation != self.generation {
                    if !matches!(result, Err(EngineError::Cancelled)) {
                        log::warn!(
                            "Dropping stale analysis result (generation {}, current {})",
                            generation,
                            self.generation
                        );
                    }
                    return false;
                }
                self.cancel = None;
                self.state = match result {
                    Ok(field) => {
                        log::info!("Spectrogram ready: {}x{}", field.width(), field.height());
                        FieldState::Ready(Arc::new(field))
                    }
                    Err(err) => {
                        log::warn!("{}", err);
                        FieldState::Unavailable(err.to_string())
                    }
                };
                true
            }
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(flag) = self.cancel.take() {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

impl Drop for FieldLoader {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

fn run_job(
    buffer: &SampleBuffer,
    params: AnalysisParams,
    cancel: &AtomicBool,
    mut report: impl FnMut(usize, usize),
) -> Result<MagnitudeField> {
    let mut job = AnalysisJob::new(buffer, params)?;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(EngineError::Cancelled);
        }
        match job.step() {
            Progress::Pending { done, total } => report(done, total),
            Progress::Ready(field) => return Ok(field),
        }
    }
}
