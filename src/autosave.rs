// Debounced autosave controller
//
// Trailing-edge debounce around a caller-supplied persistence function.
// Rapid edits coalesce into one save carrying the latest value; the save
// lifecycle is published through a watch channel for the UI to render.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// How long a successful save stays visible before returning to idle
const SAVED_DISPLAY_WINDOW: Duration = Duration::from_millis(2000);

/// Externally observable state of the autosave lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

impl fmt::Display for AutosaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutosaveStatus::Idle => "idle",
            AutosaveStatus::Saving => "saving",
            AutosaveStatus::Saved => "saved",
            AutosaveStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

type PersistFn<T, E> = Box<dyn FnMut(T) -> BoxFuture<'static, Result<(), E>> + Send>;

struct Edit<T> {
    value: T,
    /// Computed at observation time so buffering never stretches the window
    deadline: Instant,
}

/// Debounced autosave driver
///
/// Feed draft values through [`observe`](Self::observe); once input has
/// been quiet for the configured delay, the persistence function runs
/// with the latest value. Only one persistence call is ever in flight;
/// edits arriving mid-save are buffered and debounced again after it
/// settles. Failures never propagate out of the timers; they become an
/// [`AutosaveStatus::Error`] plus a retained error value.
pub struct AutosaveController<T, E> {
    edits: mpsc::UnboundedSender<Edit<T>>,
    status_rx: watch::Receiver<AutosaveStatus>,
    last_error: Arc<Mutex<Option<Arc<E>>>>,
    delay: Duration,
    primed: AtomicBool,
    disposed: AtomicBool,
    worker: JoinHandle<()>,
}

impl<T, E> AutosaveController<T, E>
where
    T: Clone + Send + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    /// Create a controller around `persist`
    ///
    /// `initial_value` is the draft as loaded; it seeds the controller
    /// without ever being saved on its own. Must be called from within
    /// a tokio runtime.
    pub fn new<F, Fut>(mut persist: F, initial_value: T, delay: Duration) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let (edits_tx, edits_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(AutosaveStatus::Idle);
        let last_error = Arc::new(Mutex::new(None));

        let worker = Worker {
            edits: edits_rx,
            status_tx,
            last_error: Arc::clone(&last_error),
            persist: Box::new(move |value| persist(value).boxed()),
            latest: initial_value,
            save_deadline: None,
            clear_deadline: None,
        };

        Self {
            edits: edits_tx,
            status_rx,
            last_error,
            delay,
            primed: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            worker: tokio::spawn(worker.run()),
        }
    }
}

impl<T, E> AutosaveController<T, E> {
    /// Feed the latest draft value
    ///
    /// The very first call after creation is the baseline for content
    /// loaded into the editor and never schedules a save. Every later
    /// call re-arms the trailing-edge timer. Calls after
    /// [`dispose`](Self::dispose) are no-ops.
    pub fn observe(&self, value: T) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if !self.primed.swap(true, Ordering::SeqCst) {
            return;
        }
        let deadline = Instant::now() + self.delay;
        // Send only fails when the worker is gone, i.e. after dispose
        let _ = self.edits.send(Edit { value, deadline });
    }

    /// Current lifecycle status
    pub fn status(&self) -> AutosaveStatus {
        *self.status_rx.borrow()
    }

    /// Watch the lifecycle status as it changes
    pub fn subscribe(&self) -> watch::Receiver<AutosaveStatus> {
        self.status_rx.clone()
    }

    /// The failure retained from the most recent save attempt
    pub fn last_error(&self) -> Option<Arc<E>> {
        self.last_error.lock().unwrap().clone()
    }

    /// Cancel all pending work
    ///
    /// Stops the armed debounce timer, the saved-display timer, and any
    /// in-flight persistence call at its next suspension point. After
    /// this returns, `observe` is a no-op. Idempotent; also invoked on
    /// drop.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.worker.abort();
    }
}

impl<T, E> Drop for AutosaveController<T, E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct Worker<T, E> {
    edits: mpsc::UnboundedReceiver<Edit<T>>,
    status_tx: watch::Sender<AutosaveStatus>,
    last_error: Arc<Mutex<Option<Arc<E>>>>,
    persist: PersistFn<T, E>,
    latest: T,
    save_deadline: Option<Instant>,
    clear_deadline: Option<Instant>,
}

impl<T, E> Worker<T, E>
where
    T: Clone + Send + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                // Edits outrank expired timers: a buffered edit must
                // re-arm the window, not race the save it supersedes
                biased;

                edit = self.edits.recv() => {
                    match edit {
                        Some(edit) => self.handle_edit(edit),
                        // Controller gone; nothing more can arrive
                        None => break,
                    }
                }
                _ = deadline(self.save_deadline) => {
                    self.save_deadline = None;
                    self.run_save().await;
                }
                _ = deadline(self.clear_deadline) => {
                    self.clear_deadline = None;
                    self.set_status(AutosaveStatus::Idle);
                }
            }
        }
    }

    fn handle_edit(&mut self, edit: Edit<T>) {
        // Last write wins: abandon the previous deadline entirely and
        // reset the visible status
        self.latest = edit.value;
        self.save_deadline = Some(edit.deadline);
        self.clear_deadline = None;
        self.set_status(AutosaveStatus::Idle);
        tracing::trace!("Draft changed, debounce timer re-armed");
    }

    async fn run_save(&mut self) {
        self.set_status(AutosaveStatus::Saving);
        *self.last_error.lock().unwrap() = None;

        match (self.persist)(self.latest.clone()).await {
            Ok(()) => {
                tracing::debug!("Autosave succeeded");
                self.set_status(AutosaveStatus::Saved);
                self.clear_deadline = Some(Instant::now() + SAVED_DISPLAY_WINDOW);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Autosave failed");
                *self.last_error.lock().unwrap() = Some(Arc::new(e));
                self.set_status(AutosaveStatus::Error);
            }
        }
    }

    fn set_status(&self, status: AutosaveStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => futures::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    type CallLog = Arc<Mutex<Vec<(String, Instant)>>>;

    /// Persist fn that records each invocation and its start time
    fn recording_persist(
        calls: &CallLog,
        busy_for: Duration,
    ) -> impl FnMut(String) -> BoxFuture<'static, Result<(), String>> + Send + 'static {
        let calls = Arc::clone(calls);
        move |value: String| {
            let calls = Arc::clone(&calls);
            async move {
                calls.lock().unwrap().push((value, Instant::now()));
                if !busy_for.is_zero() {
                    tokio::time::sleep(busy_for).await;
                }
                Ok(())
            }
            .boxed()
        }
    }

    fn spawn_status_collector(
        mut rx: watch::Receiver<AutosaveStatus>,
    ) -> Arc<Mutex<Vec<(AutosaveStatus, Instant)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let collector_log = Arc::clone(&log);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let status = *rx.borrow_and_update();
                collector_log.lock().unwrap().push((status, Instant::now()));
            }
        });
        log
    }

    #[tokio::test(start_paused = true)]
    async fn test_baseline_observation_schedules_no_save() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let controller = AutosaveController::new(
            recording_persist(&calls, Duration::ZERO),
            "loaded content".to_string(),
            Duration::from_millis(2000),
        );

        controller.observe("loaded content".to_string());
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(controller.status(), AutosaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce_into_one_trailing_save() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let controller = AutosaveController::new(
            recording_persist(&calls, Duration::ZERO),
            "draft1".to_string(),
            Duration::from_millis(2000),
        );

        controller.observe("draft1".to_string()); // baseline
        tokio::time::sleep(Duration::from_millis(500)).await;
        controller.observe("draft2".to_string());
        tokio::time::sleep(Duration::from_millis(300)).await;
        controller.observe("draft3".to_string());
        tokio::time::sleep(Duration::from_secs(10)).await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "draft3");
        // 2000ms after the last edit at t=800, not after the first
        assert_eq!(calls[0].1, start + Duration::from_millis(2800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_walks_saving_saved_idle() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let controller = AutosaveController::new(
            recording_persist(&calls, Duration::from_millis(10)),
            "draft".to_string(),
            Duration::from_millis(2000),
        );
        let statuses = spawn_status_collector(controller.subscribe());

        controller.observe("draft".to_string()); // baseline
        controller.observe("draft edited".to_string());
        tokio::time::sleep(Duration::from_secs(30)).await;

        let statuses = statuses.lock().unwrap();
        let expected = vec![
            (AutosaveStatus::Saving, start + Duration::from_millis(2000)),
            (AutosaveStatus::Saved, start + Duration::from_millis(2010)),
            // Idle only after the display window, not immediately
            (AutosaveStatus::Idle, start + Duration::from_millis(4010)),
        ];
        assert_eq!(*statuses, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_retained_until_next_edit() {
        let calls = Arc::new(Mutex::new(0u32));
        let persist = {
            let calls = Arc::clone(&calls);
            move |_value: String| {
                let calls = Arc::clone(&calls);
                async move {
                    let mut calls = calls.lock().unwrap();
                    *calls += 1;
                    if *calls == 1 {
                        Err("backend rejected the draft".to_string())
                    } else {
                        Ok(())
                    }
                }
                .boxed()
            }
        };
        let controller =
            AutosaveController::new(persist, "draft".to_string(), Duration::from_millis(2000));

        controller.observe("draft".to_string()); // baseline
        controller.observe("v1".to_string());
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(controller.status(), AutosaveStatus::Error);
        assert_eq!(
            controller.last_error().unwrap().as_str(),
            "backend rejected the draft"
        );

        // No automatic retry, no automatic reset
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(controller.status(), AutosaveStatus::Error);

        // The next edit is the only path back to saving
        controller.observe("v2".to_string());
        assert_eq!(*calls.lock().unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(*calls.lock().unwrap(), 2);
        assert!(controller.last_error().is_none());
        assert_eq!(controller.status(), AutosaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_armed_timer() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let controller = AutosaveController::new(
            recording_persist(&calls, Duration::ZERO),
            "draft".to_string(),
            Duration::from_millis(2000),
        );

        controller.observe("draft".to_string()); // baseline
        controller.observe("about to be abandoned".to_string());
        tokio::time::sleep(Duration::from_millis(1000)).await;
        controller.dispose();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(calls.lock().unwrap().is_empty());

        // Observing after dispose stays a no-op
        controller.observe("after dispose".to_string());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_inflight_save_debounces_after_completion() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let controller = AutosaveController::new(
            recording_persist(&calls, Duration::from_millis(500)),
            "draft".to_string(),
            Duration::from_millis(2000),
        );

        controller.observe("draft".to_string()); // baseline
        controller.observe("v1".to_string()); // save fires at t=2000, busy until t=2500

        // Edit at t=2100 lands while the save is in flight
        tokio::time::sleep(Duration::from_millis(2100)).await;
        controller.observe("v2".to_string());
        tokio::time::sleep(Duration::from_secs(10)).await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        // The in-flight save was not cancelled
        assert_eq!(calls[0].0, "v1");
        assert_eq!(calls[0].1, start + Duration::from_millis(2000));
        // The mid-save edit waited for completion, then kept its own
        // debounce deadline of t=2100+2000
        assert_eq!(calls[1].0, "v2");
        assert_eq!(calls[1].1, start + Duration::from_millis(4100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_display_window_resets_to_idle() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let controller = AutosaveController::new(
            recording_persist(&calls, Duration::ZERO),
            "draft".to_string(),
            Duration::from_millis(2000),
        );

        controller.observe("draft".to_string()); // baseline
        controller.observe("v1".to_string());
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(controller.status(), AutosaveStatus::Saved);

        controller.observe("v2".to_string());
        tokio::task::yield_now().await;
        assert_eq!(controller.status(), AutosaveStatus::Idle);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    // The worker polls its timer arms every loop iteration, so an
    // unarmed deadline must stay pending forever or the loop would spin.
    #[tokio::test(start_paused = true)]
    async fn test_unarmed_deadline_never_fires() {
        let mut unarmed = task::spawn(deadline(None));
        assert_pending!(unarmed.poll());

        let mut armed = task::spawn(deadline(Some(
            Instant::now() + Duration::from_millis(2000),
        )));
        assert_pending!(armed.poll());

        tokio::time::advance(Duration::from_millis(2000)).await;
        assert_ready!(armed.poll());
        assert_pending!(unarmed.poll());
    }
}
