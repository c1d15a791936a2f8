//! Star tracking run orchestration.
//!
//! A run is started per observer. If an external analysis program is
//! installed it is launched and its output relayed line by line; otherwise,
//! or if it cannot be spawned, the in-process pipeline runs on the blocking
//! pool. Every run ends with exactly one `star_tracking_result` event
//! addressed to the requesting observer.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use serde::Serialize;
use shared::ImageSize;
use shared_wasm::{DetectedStar, StarTrackingResult, StationEvent};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::{JoinError, JoinHandle};
use track::{StarTracker, TrackingSolution};

use crate::events::{EventSink, ObserverId};
use crate::process_table::{ProcessLease, ProcessTable};

/// Lifecycle of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Launching,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

fn advance(observer: &ObserverId, state: &mut RunState, next: RunState) {
    if next.is_terminal() {
        tracing::info!("Run for {observer} finished: {next:?}");
    } else {
        tracing::debug!("Run for {observer}: {state:?} -> {next:?}");
    }
    *state = next;
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Star image not found on server.")]
    ImageUnavailable(PathBuf),
    #[error("Failed to decode star image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("External analysis failed: {0}")]
    ExternalProcess(#[from] io::Error),
    #[error("Analysis worker failed: {0}")]
    Worker(String),
}

/// Where to find the inputs of a run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Image analyzed by the in-process pipeline
    pub star_image_path: PathBuf,
    /// External programs to try, in priority order
    pub program_candidates: Vec<PathBuf>,
    /// Interpreter to run the external program with; `None` executes it directly
    pub interpreter: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            star_image_path: PathBuf::from("static/imgs/star_field.jpg"),
            program_candidates: vec![
                PathBuf::from("../final/final8.py"),
                PathBuf::from("../final8.py"),
            ],
            interpreter: Some(PathBuf::from("python3")),
        }
    }
}

/// First candidate that resolves to an existing regular file, as an
/// absolute path. Relative candidates resolve against the current working
/// directory.
pub fn locate_external_program(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find_map(|candidate| candidate.canonicalize().ok().filter(|path| path.is_file()))
}

/// Everything produced by one in-process analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub detected_stars: Vec<DetectedStar>,
    pub solution: TrackingSolution,
    pub status: RunState,
    pub error: Option<String>,
}

impl AnalysisRun {
    fn failed(error: &AnalysisError) -> Self {
        Self {
            detected_stars: Vec::new(),
            solution: TrackingSolution::default(),
            status: RunState::Failed,
            error: Some(error.to_string()),
        }
    }

    /// Terminal result payload for observers.
    pub fn to_result(&self) -> StarTrackingResult {
        if let Some(error) = &self.error {
            return StarTrackingResult::failed(error.clone());
        }

        let message = if self.detected_stars.is_empty() {
            "No stars detected.".to_string()
        } else {
            self.solution.summary()
        };
        StarTrackingResult::Analysis {
            patterns: self.solution.patterns.clone(),
            attitude: self.solution.attitude.clone(),
            position: self.solution.position,
            message,
        }
    }
}

/// Run the in-process pipeline on the image at `image_path`, reporting
/// progress to `observer`. Blocking; call from a blocking context.
pub fn run_star_analysis(
    tracker: &StarTracker,
    image_path: &Path,
    events: &dyn EventSink,
    observer: &ObserverId,
) -> AnalysisRun {
    match analyze(tracker, image_path, events, observer) {
        Ok(run) => run,
        Err(e) => {
            tracing::error!("Star analysis for {observer} failed: {e}");
            AnalysisRun::failed(&e)
        }
    }
}

fn analyze(
    tracker: &StarTracker,
    image_path: &Path,
    events: &dyn EventSink,
    observer: &ObserverId,
) -> Result<AnalysisRun, AnalysisError> {
    if !image_path.is_file() {
        return Err(AnalysisError::ImageUnavailable(image_path.to_path_buf()));
    }
    let image = image::open(image_path)?;

    events.emit(Some(observer), StationEvent::notification("Detecting stars from image..."));
    let detected_stars = tracker.detect_stars(&image);
    if detected_stars.is_empty() {
        return Ok(AnalysisRun {
            detected_stars,
            solution: TrackingSolution::default(),
            status: RunState::Completed,
            error: None,
        });
    }

    events.emit(
        Some(observer),
        StationEvent::notification(format!(
            "Found {} stars. Identifying patterns...",
            detected_stars.len()
        )),
    );
    let solution =
        tracker.identify_constellations_and_position(ImageSize::of_image(&image), &detected_stars);

    Ok(AnalysisRun {
        detected_stars,
        solution,
        status: RunState::Completed,
        error: None,
    })
}

fn panic_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "analysis task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "analysis task panicked".to_string()
    }
}

/// Starts analysis runs and owns the shared resources they use.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    config: Arc<OrchestratorConfig>,
    tracker: Arc<StarTracker>,
    events: Arc<dyn EventSink>,
    processes: ProcessTable,
}

impl AnalysisOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        tracker: Arc<StarTracker>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tracker,
            events,
            processes: ProcessTable::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Registry of external processes currently being supervised.
    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// Begin a run for `observer` and return immediately.
    ///
    /// Must be called from within a tokio runtime. The handle resolves to the
    /// final state once the terminal result has been emitted; dropping it
    /// detaches the run.
    pub fn start_analysis(&self, observer: ObserverId) -> JoinHandle<RunState> {
        let this = self.clone();
        tokio::spawn(async move { this.run(observer).await })
    }

    fn notify(&self, observer: &ObserverId, message: impl Into<String>) {
        self.events
            .emit(Some(observer), StationEvent::notification(message));
    }

    fn finish(&self, observer: &ObserverId, result: StarTrackingResult) {
        self.events
            .emit(Some(observer), StationEvent::StarTrackingResult(result));
    }

    async fn run(self, observer: ObserverId) -> RunState {
        tracing::info!("Star tracking requested by {observer}");
        let mut state = RunState::Idle;
        advance(&observer, &mut state, RunState::Launching);

        if let Some(program) = locate_external_program(&self.config.program_candidates) {
            self.notify(
                &observer,
                format!("Launching external script {}...", program.display()),
            );
            match self.spawn_external(&program) {
                Ok(child) => {
                    let lease = self
                        .processes
                        .register(observer.clone(), child.id(), &program);
                    advance(&observer, &mut state, RunState::Running);
                    let outcome = self.supervise(child, lease).await;
                    advance(&observer, &mut state, outcome);
                    return state;
                }
                Err(e) => {
                    tracing::warn!("Failed to launch {}: {e}", program.display());
                    self.notify(&observer, format!("Failed to launch external script: {e}."));
                }
            }
        }

        self.notify(&observer, "Running integrated star analysis (fallback).");
        advance(&observer, &mut state, RunState::Running);
        let outcome = self.run_fallback(observer.clone()).await;
        advance(&observer, &mut state, outcome);
        state
    }

    fn spawn_external(&self, program: &Path) -> io::Result<Child> {
        let mut command = match &self.config.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(program);
                command
            }
            None => Command::new(program),
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }

    /// Relay a child's output until it exits. The lease is held for the
    /// whole supervision and released on every exit path.
    async fn supervise(&self, mut child: Child, lease: ProcessLease) -> RunState {
        let observer = lease.observer().clone();
        tracing::debug!("Supervising external analysis for {observer} (pid {:?})", child.id());

        let outcome = self.relay_output(&mut child, &observer).await;
        drop(lease);

        match outcome {
            Ok(returncode) => {
                tracing::info!("External analysis for {observer} exited with code {returncode}");
                self.finish(&observer, StarTrackingResult::external(returncode));
                if returncode == 0 {
                    RunState::Completed
                } else {
                    RunState::Failed
                }
            }
            Err(e) => {
                tracing::error!("External analysis for {observer} failed: {e}");
                self.finish(&observer, StarTrackingResult::failed(e.to_string()));
                RunState::Failed
            }
        }
    }

    async fn relay_output(&self, child: &mut Child, observer: &ObserverId) -> Result<i32, AnalysisError> {
        self.notify(observer, "External star tracker started.");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

        // Drain stderr concurrently so a chatty child cannot block on a full pipe
        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            stderr.read_to_string(&mut buf).await.map(|_| buf)
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim_end();
            if !line.is_empty() {
                self.notify(observer, format!("[external] {line}"));
            }
        }

        let stderr_text = stderr_reader
            .await
            .map_err(|e| AnalysisError::Worker(panic_message(e)))??;
        let stderr_text = stderr_text.trim_end();
        if !stderr_text.is_empty() {
            self.notify(observer, format!("[external-err] {stderr_text}"));
        }

        let status = child.wait().await?;
        // Killed by a signal: no exit code to report
        Ok(status.code().unwrap_or(-1))
    }

    async fn run_fallback(&self, observer: ObserverId) -> RunState {
        let tracker = self.tracker.clone();
        let events = self.events.clone();
        let image_path = self.config.star_image_path.clone();
        let worker_observer = observer.clone();

        let joined = tokio::task::spawn_blocking(move || {
            run_star_analysis(&tracker, &image_path, events.as_ref(), &worker_observer)
        })
        .await;

        let run = joined.unwrap_or_else(|e| {
            let error = AnalysisError::Worker(panic_message(e));
            tracing::error!("Star analysis for {observer} aborted: {error}");
            AnalysisRun::failed(&error)
        });

        self.finish(&observer, run.to_result());
        run.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_locate_prefers_first_existing_candidate() {
        let dir = TempDir::new().unwrap();
        let second = dir.path().join("second.py");
        let third = dir.path().join("third.py");
        fs::write(&second, "").unwrap();
        fs::write(&third, "").unwrap();

        let candidates = vec![dir.path().join("missing.py"), second.clone(), third];
        assert_eq!(
            locate_external_program(&candidates),
            Some(second.canonicalize().unwrap())
        );
    }

    #[test]
    fn test_locate_ignores_directories() {
        let dir = TempDir::new().unwrap();
        assert_eq!(locate_external_program(&[dir.path().to_path_buf()]), None);
        assert_eq!(locate_external_program(&[]), None);
    }

    #[test]
    fn test_locate_returns_absolute_path() {
        let dir = TempDir::new().unwrap();
        let program = dir.path().join("prog.py");
        fs::write(&program, "").unwrap();

        let relative = dir.path().join("sub").join("..").join("prog.py");
        fs::create_dir(dir.path().join("sub")).unwrap();

        let found = locate_external_program(&[relative]).unwrap();
        assert!(found.is_absolute());
        assert_eq!(found, program.canonicalize().unwrap());
    }

    #[test]
    fn test_locate_resolves_relative_to_working_directory() {
        let file = tempfile::Builder::new()
            .prefix("locate-")
            .suffix(".py")
            .tempfile_in(".")
            .unwrap();
        let name = PathBuf::from(file.path().file_name().unwrap());
        assert!(name.is_relative());

        let expected = std::env::current_dir().unwrap().join(&name).canonicalize().unwrap();
        assert_eq!(locate_external_program(&[name]), Some(expected));
    }

    #[test]
    fn test_failed_run_result_carries_only_error() {
        let run = AnalysisRun::failed(&AnalysisError::ImageUnavailable(PathBuf::from("x.jpg")));
        assert_eq!(run.status, RunState::Failed);
        assert_eq!(
            run.to_result(),
            StarTrackingResult::failed("Star image not found on server.")
        );
    }

    #[test]
    fn test_empty_run_reports_no_stars() {
        let run = AnalysisRun {
            detected_stars: Vec::new(),
            solution: TrackingSolution::default(),
            status: RunState::Completed,
            error: None,
        };
        match run.to_result() {
            StarTrackingResult::Analysis {
                patterns,
                attitude,
                position,
                message,
            } => {
                assert!(patterns.is_empty());
                assert!(attitude.is_none());
                assert!(position.is_none());
                assert_eq!(message, "No stars detected.");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_run_with_stars_but_no_patterns() {
        let run = AnalysisRun {
            detected_stars: vec![DetectedStar::new(1.0, 2.0, 9)],
            solution: TrackingSolution::default(),
            status: RunState::Completed,
            error: None,
        };
        match run.to_result() {
            StarTrackingResult::Analysis { message, .. } => {
                assert_eq!(message, "Analysis complete. No patterns found.")
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Launching.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Failed.is_terminal());
    }

    #[tokio::test]
    async fn test_panic_message_extraction() {
        let err = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        assert_eq!(panic_message(err), "boom");

        let err = tokio::spawn(async { panic!("{}", String::from("owned")) })
            .await
            .unwrap_err();
        assert_eq!(panic_message(err), "owned");
    }
}
