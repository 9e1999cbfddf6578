//! The move arbiter: proposes a move by book or search, then validates it.
//!
//! Each run executes on its own worker thread and reports through a bounded
//! channel. Emitting an event and cancelling share a gate, so once
//! [`RunControl::cancel`] returns nothing but the `Cancelled` acknowledgment
//! can follow.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use xiangqi_core::Move;
use xiangqi_engine::search::DepthReport;
use xiangqi_engine::{notation, Position, RuleEngine, RuleError, RuleVariant, Searcher, StopReason, StopSignals};
use xiangqi_openings::OpeningBook;

use crate::error::ArbiterError;
use crate::evaluation::Evaluation;
use crate::events::{AnalysisEvent, ArbiterEvent, Decision, DecisionSource, Rejection};
use crate::params::SearchParameters;

/// Candidates judged before a run gives up.
pub const MAX_VALIDATION_ATTEMPTS: usize = 10;

/// Default capacity of a run's event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Wait between two tries to push into a full channel.
const EMIT_RETRY: Duration = Duration::from_millis(2);

/// Longest uninterrupted sleep while pacing.
const PACING_SLICE: Duration = Duration::from_millis(10);

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ArbiterState {
    Idle = 0,
    BookLookup = 1,
    Searching = 2,
    Validating = 3,
    Accepted = 4,
    Exhausted = 5,
    Cancelled = 6,
    Aborted = 7,
}

impl ArbiterState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ArbiterState::BookLookup,
            2 => ArbiterState::Searching,
            3 => ArbiterState::Validating,
            4 => ArbiterState::Accepted,
            5 => ArbiterState::Exhausted,
            6 => ArbiterState::Cancelled,
            7 => ArbiterState::Aborted,
            _ => ArbiterState::Idle,
        }
    }

    /// Returns true once a run has ended.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ArbiterState::Accepted
                | ArbiterState::Exhausted
                | ArbiterState::Cancelled
                | ArbiterState::Aborted
        )
    }

    /// Returns true while a run is in progress.
    pub fn is_active(self) -> bool {
        self != ArbiterState::Idle && !self.is_terminal()
    }
}

impl fmt::Display for ArbiterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// State shared by a run's worker and its controllers.
#[derive(Debug)]
struct RunShared {
    state: AtomicU8,
    signals: StopSignals,
    gate: Mutex<()>,
}

impl RunShared {
    fn new() -> Self {
        RunShared {
            state: AtomicU8::new(ArbiterState::Idle as u8),
            signals: StopSignals::new(),
            gate: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ArbiterState {
        ArbiterState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ArbiterState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Cloneable handle for steering a run from any thread.
#[derive(Debug, Clone)]
pub struct RunControl {
    shared: Arc<RunShared>,
}

impl RunControl {
    pub fn state(&self) -> ArbiterState {
        self.shared.state()
    }

    /// Requests cancellation.
    ///
    /// Returns false if the run had already ended. Once this returns, the run
    /// emits no further progress event or decision; its stream ends with a
    /// single `Cancelled` event.
    pub fn cancel(&self) -> bool {
        let _gate = self.shared.lock();
        if self.shared.state().is_terminal() {
            return false;
        }
        self.shared.signals.cancel();
        self.shared.set_state(ArbiterState::Cancelled);
        tracing::info!("analysis cancelled");
        true
    }

    /// Ends the search early and validates the deepest completed result.
    ///
    /// Depth 1 always completes first. Returns false if the run had already
    /// ended.
    pub fn force(&self) -> bool {
        if self.shared.state().is_terminal() {
            return false;
        }
        self.shared.signals.force();
        tracing::debug!("forced move requested");
        true
    }
}

/// The event stream of one run.
///
/// Iterating yields events in production order and stops after the
/// terminal event. Dropping an unfinished run cancels it.
#[derive(Debug)]
pub struct AnalysisRun {
    events: Receiver<ArbiterEvent>,
    control: RunControl,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl AnalysisRun {
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn state(&self) -> ArbiterState {
        self.control.state()
    }

    pub fn cancel(&self) -> bool {
        self.control.cancel()
    }

    pub fn force(&self) -> bool {
        self.control.force()
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout and once the stream has ended.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<ArbiterEvent> {
        if self.finished {
            return None;
        }
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(self.observe(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.finish();
                None
            }
        }
    }

    /// Drains the stream and returns its terminal event.
    pub fn wait(mut self) -> Option<ArbiterEvent> {
        self.by_ref().last()
    }

    fn observe(&mut self, event: ArbiterEvent) -> ArbiterEvent {
        if event.is_terminal() {
            self.finish();
        }
        event
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("analysis worker panicked");
            }
        }
    }
}

impl Iterator for AnalysisRun {
    type Item = ArbiterEvent;

    fn next(&mut self) -> Option<ArbiterEvent> {
        if self.finished {
            return None;
        }
        match self.events.recv() {
            Ok(event) => Some(self.observe(event)),
            Err(_) => {
                self.finish();
                None
            }
        }
    }
}

impl Drop for AnalysisRun {
    fn drop(&mut self) {
        if !self.finished {
            self.control.cancel();
        }
    }
}

/// Runs one analysis at a time against injected rules and book.
///
/// Configuration, position and rules are snapshotted by [`start`]; changing
/// them while a run is active fails with [`ArbiterError::Busy`].
///
/// [`start`]: MoveArbiter::start
pub struct MoveArbiter<R: RuleEngine = RuleVariant> {
    rules: R,
    book: Option<Arc<dyn OpeningBook + Send + Sync>>,
    parameters: SearchParameters,
    position: Position,
    pacing: Duration,
    channel_capacity: usize,
    current: Option<RunControl>,
}

impl MoveArbiter<RuleVariant> {
    /// Creates an arbiter with standard rules, no book and default parameters.
    pub fn new() -> Self {
        Self::with_rules(RuleVariant::default())
    }
}

impl Default for MoveArbiter<RuleVariant> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> MoveArbiter<R>
where
    R: RuleEngine + Clone + Send + 'static,
{
    pub fn with_rules(rules: R) -> Self {
        MoveArbiter {
            rules,
            book: None,
            parameters: SearchParameters::default(),
            position: Position::startpos(),
            pacing: Duration::ZERO,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            current: None,
        }
    }

    #[must_use]
    pub fn with_book(self, book: impl OpeningBook + Send + Sync + 'static) -> Self {
        self.with_shared_book(Arc::new(book))
    }

    #[must_use]
    pub fn with_shared_book(mut self, book: Arc<dyn OpeningBook + Send + Sync>) -> Self {
        self.book = Some(book);
        self
    }

    /// Sleeps this long after each completed depth.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn state(&self) -> ArbiterState {
        self.current
            .as_ref()
            .map_or(ArbiterState::Idle, RunControl::state)
    }

    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    pub fn parameters(&self) -> &SearchParameters {
        &self.parameters
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Validates and replaces the search parameters.
    pub fn configure(&mut self, parameters: SearchParameters) -> Result<(), ArbiterError> {
        self.ensure_idle("configure")?;
        parameters.validate()?;
        tracing::debug!(?parameters, "arbiter configured");
        self.parameters = parameters;
        Ok(())
    }

    /// Sets the position the next run analyses.
    pub fn set_position(&mut self, position: Position) -> Result<(), ArbiterError> {
        self.ensure_idle("set the position")?;
        self.position = position;
        Ok(())
    }

    /// Replaces the rules the next run validates against.
    pub fn set_rule_variant(&mut self, rules: R) -> Result<(), ArbiterError> {
        self.ensure_idle("change the rule variant")?;
        tracing::debug!(rules = rules.name(), "rule variant selected");
        self.rules = rules;
        Ok(())
    }

    /// Cancels the active run, if any.
    pub fn cancel(&self) -> bool {
        self.current.as_ref().is_some_and(RunControl::cancel)
    }

    /// Forces the active run to stop searching, if any.
    pub fn force(&self) -> bool {
        self.current.as_ref().is_some_and(RunControl::force)
    }

    /// Starts a run on a worker thread.
    pub fn start(&mut self) -> Result<AnalysisRun, ArbiterError> {
        if self.is_running() {
            return Err(ArbiterError::AlreadyRunning);
        }

        let shared = Arc::new(RunShared::new());
        let (sender, events) = mpsc::sync_channel(self.channel_capacity);
        let fallback = (Arc::clone(&shared), sender.clone());
        let worker = RunWorker {
            rules: self.rules.clone(),
            book: self.book.clone(),
            parameters: self.parameters.clone(),
            position: self.position.clone(),
            pacing: self.pacing,
            shared: Arc::clone(&shared),
            sender,
            started: Instant::now(),
        };

        // Active before the thread exists, so a second start cannot slip in.
        shared.set_state(ArbiterState::Searching);
        let handle = thread::Builder::new()
            .name("xiangqi-arbiter".to_string())
            .spawn(move || {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| worker.run())) {
                    let (shared, sender) = fallback;
                    worker_panicked(&shared, &sender, payload.as_ref());
                }
            })
            .map_err(|e| {
                shared.set_state(ArbiterState::Aborted);
                ArbiterError::Worker(e.to_string())
            })?;

        tracing::info!(
            rules = self.rules.name(),
            fen = %self.position.to_fen(),
            "analysis started"
        );
        let control = RunControl { shared };
        self.current = Some(control.clone());
        Ok(AnalysisRun {
            events,
            control,
            worker: Some(handle),
            finished: false,
        })
    }

    fn ensure_idle(&self, action: &'static str) -> Result<(), ArbiterError> {
        if self.is_running() {
            return Err(ArbiterError::Busy(action));
        }
        Ok(())
    }
}

/// Ends a run whose worker panicked with the one terminal event it owes.
fn worker_panicked(shared: &RunShared, sender: &SyncSender<ArbiterEvent>, payload: &(dyn Any + Send)) {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(%message, "analysis worker panicked");

    let event = {
        let _gate = shared.lock();
        match shared.state() {
            ArbiterState::Cancelled => ArbiterEvent::Cancelled,
            state if state.is_terminal() => return,
            _ => {
                shared.set_state(ArbiterState::Aborted);
                ArbiterEvent::Failed(ArbiterError::Worker(format!(
                    "analysis worker panicked: {message}"
                )))
            }
        }
    };
    // The receiver may be gone already.
    let _ = sender.send(event);
}

/// Why a run stopped without a decision.
enum Halt {
    Cancelled,
    Failed(ArbiterError, ArbiterState),
}

enum Verdict {
    Legal,
    Rejected(String),
}

struct RunWorker<R> {
    rules: R,
    book: Option<Arc<dyn OpeningBook + Send + Sync>>,
    parameters: SearchParameters,
    position: Position,
    pacing: Duration,
    shared: Arc<RunShared>,
    sender: SyncSender<ArbiterEvent>,
    started: Instant,
}

impl<R: RuleEngine> RunWorker<R> {
    fn run(self) {
        let delivered = match self.analyse() {
            Ok(decision) => {
                tracing::info!(
                    notation = %decision.notation,
                    source = ?decision.source,
                    retries = decision.retries,
                    "move accepted"
                );
                self.emit(ArbiterEvent::Decision(decision), Some(ArbiterState::Accepted))
            }
            Err(Halt::Failed(error, state)) => {
                tracing::warn!(%error, "analysis failed");
                self.emit(ArbiterEvent::Failed(error), Some(state))
            }
            Err(Halt::Cancelled) => false,
        };

        if !delivered {
            self.shared.set_state(ArbiterState::Cancelled);
            // The receiver may be gone already.
            let _ = self.sender.send(ArbiterEvent::Cancelled);
        }
    }

    fn analyse(&self) -> Result<Decision, Halt> {
        self.position
            .validate()
            .map_err(|e| Halt::Failed(e.into(), ArbiterState::Aborted))?;

        let mut attempts = 0;
        if let Some(decision) = self.consult_book(&mut attempts)? {
            return Ok(decision);
        }

        self.transition(ArbiterState::Searching)?;
        let searcher = Searcher::new(
            self.parameters.limits(),
            self.rules.geometry(),
            self.shared.signals.clone(),
        );
        let outcome = searcher.run(&self.position, |report| {
            self.emit(ArbiterEvent::Progress(self.progress(report)), None) && self.pace()
        });
        tracing::debug!(
            reason = ?outcome.reason,
            nodes = outcome.nodes,
            depth = outcome.last.as_ref().map_or(0, |r| r.depth),
            "search finished"
        );
        if matches!(outcome.reason, StopReason::Cancelled | StopReason::Halted) {
            return Err(Halt::Cancelled);
        }

        self.transition(ArbiterState::Validating)?;
        let Some(report) = outcome.last else {
            return Err(self.exhausted(attempts));
        };
        for &candidate in &report.ranked {
            if attempts >= MAX_VALIDATION_ATTEMPTS {
                break;
            }
            attempts += 1;
            let iccs = candidate.to_iccs();
            match self.judge(&iccs)? {
                Verdict::Legal => return Ok(self.search_decision(&report, candidate, attempts)),
                Verdict::Rejected(reason) => self.reject(iccs, Some(candidate), attempts, reason)?,
            }
        }
        Err(self.exhausted(attempts))
    }

    /// Tries the book; `Ok(None)` falls through to search.
    fn consult_book(&self, attempts: &mut usize) -> Result<Option<Decision>, Halt> {
        let Some(book) = self.book.as_ref().filter(|_| self.parameters.book_enabled) else {
            return Ok(None);
        };
        self.transition(ArbiterState::BookLookup)?;
        let Some(suggestion) = book.probe(&self.position) else {
            tracing::debug!("no book entry");
            return Ok(None);
        };

        let mv = match notation::decode(&self.position, &suggestion) {
            Ok(mv) => mv,
            Err(e) => {
                *attempts += 1;
                self.reject(suggestion, None, *attempts, e.to_string())?;
                return Ok(None);
            }
        };
        tracing::info!(notation = %suggestion, "book hit");
        let event = AnalysisEvent {
            depth: 0,
            best_move: mv,
            notation: notation::describe(&self.position, mv),
            evaluation: Evaluation::Score(0),
            nodes: 0,
            elapsed: self.started.elapsed(),
            pv: vec![mv],
        };
        if !self.emit(ArbiterEvent::Progress(event), None) {
            return Err(Halt::Cancelled);
        }

        self.transition(ArbiterState::Validating)?;
        *attempts += 1;
        match self.judge(&suggestion)? {
            Verdict::Legal => Ok(Some(Decision {
                mv,
                notation: notation::describe(&self.position, mv),
                rule_variant: self.rules.name().to_string(),
                retries: *attempts - 1,
                source: DecisionSource::Book,
                ponder: None,
                evaluation: None,
                depth: 0,
            })),
            Verdict::Rejected(reason) => {
                self.reject(suggestion, Some(mv), *attempts, reason)?;
                Ok(None)
            }
        }
    }

    fn progress(&self, report: &DepthReport) -> AnalysisEvent {
        AnalysisEvent {
            depth: report.depth,
            best_move: report.best_move,
            notation: notation::describe(&self.position, report.best_move),
            evaluation: Evaluation::from_score(report.score),
            nodes: report.nodes,
            elapsed: self.started.elapsed(),
            pv: report.pv.clone(),
        }
    }

    fn search_decision(&self, report: &DepthReport, mv: Move, attempts: usize) -> Decision {
        let principal = mv == report.best_move;
        let ponder = if self.parameters.ponder_enabled && principal {
            report.pv.get(1).copied()
        } else {
            None
        };
        Decision {
            mv,
            notation: notation::describe(&self.position, mv),
            rule_variant: self.rules.name().to_string(),
            retries: attempts - 1,
            source: DecisionSource::Search,
            ponder,
            evaluation: principal.then(|| Evaluation::from_score(report.score)),
            depth: report.depth,
        }
    }

    fn judge(&self, candidate: &str) -> Result<Verdict, Halt> {
        match self.rules.is_legal(candidate, &self.position) {
            Ok(true) => Ok(Verdict::Legal),
            Ok(false) => Ok(Verdict::Rejected(format!(
                "illegal under {} rules",
                self.rules.name()
            ))),
            Err(RuleError::InvalidNotation(e)) => Ok(Verdict::Rejected(e.to_string())),
            Err(RuleError::InvalidPosition(e)) => {
                Err(Halt::Failed(e.into(), ArbiterState::Aborted))
            }
        }
    }

    fn reject(
        &self,
        notation: String,
        mv: Option<Move>,
        attempt: usize,
        reason: String,
    ) -> Result<(), Halt> {
        tracing::warn!(%notation, attempt, %reason, "candidate rejected");
        let rejection = Rejection {
            notation,
            mv,
            attempt,
            reason,
        };
        if self.emit(ArbiterEvent::Rejected(rejection), None) {
            Ok(())
        } else {
            Err(Halt::Cancelled)
        }
    }

    fn exhausted(&self, attempts: usize) -> Halt {
        Halt::Failed(
            ArbiterError::NoLegalMoveFound { attempts },
            ArbiterState::Exhausted,
        )
    }

    /// Moves to `state` unless the run was cancelled.
    fn transition(&self, state: ArbiterState) -> Result<(), Halt> {
        let _gate = self.shared.lock();
        if self.shared.signals.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        tracing::debug!(from = %self.shared.state(), to = %state, "state transition");
        self.shared.set_state(state);
        Ok(())
    }

    /// Delivers an event unless the run was cancelled; `terminal` is entered
    /// together with delivery.
    ///
    /// Returns false when the event was dropped.
    fn emit(&self, mut event: ArbiterEvent, terminal: Option<ArbiterState>) -> bool {
        loop {
            let gate = self.shared.lock();
            if self.shared.signals.is_cancelled() {
                return false;
            }
            match self.sender.try_send(event) {
                Ok(()) => {
                    if let Some(state) = terminal {
                        self.shared.set_state(state);
                    }
                    return true;
                }
                Err(TrySendError::Full(back)) => {
                    event = back;
                    drop(gate);
                    thread::sleep(EMIT_RETRY);
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::debug!("event receiver dropped, abandoning run");
                    self.shared.signals.cancel();
                    return false;
                }
            }
        }
    }

    /// Sleeps between depths; returns false if cancelled meanwhile.
    fn pace(&self) -> bool {
        let deadline = Instant::now() + self.pacing;
        loop {
            let signals = &self.shared.signals;
            if signals.is_cancelled() {
                return false;
            }
            if signals.is_forced() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(PACING_SLICE.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> SearchParameters {
        SearchParameters {
            thinking_time_ms: 10_000,
            max_depth: 2,
            hash_mb: 16,
            threads: 1,
            book_enabled: false,
            ponder_enabled: true,
        }
    }

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            ArbiterState::Idle,
            ArbiterState::BookLookup,
            ArbiterState::Searching,
            ArbiterState::Validating,
            ArbiterState::Accepted,
            ArbiterState::Exhausted,
            ArbiterState::Cancelled,
            ArbiterState::Aborted,
        ] {
            assert_eq!(ArbiterState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn terminal_and_active_are_disjoint() {
        assert!(!ArbiterState::Idle.is_active());
        assert!(!ArbiterState::Idle.is_terminal());
        assert!(ArbiterState::Searching.is_active());
        assert!(ArbiterState::Accepted.is_terminal());
        assert!(!ArbiterState::Aborted.is_active());
    }

    #[test]
    fn new_arbiter_is_idle() {
        let arbiter = MoveArbiter::new();
        assert_eq!(arbiter.state(), ArbiterState::Idle);
        assert_eq!(arbiter.rules(), &RuleVariant::Standard);
        assert_eq!(arbiter.position(), &Position::startpos());
        assert!(!arbiter.cancel());
        assert!(!arbiter.force());
    }

    #[test]
    fn configure_rejects_out_of_range_parameters() {
        let mut arbiter = MoveArbiter::new();
        let bad = SearchParameters {
            threads: 0,
            ..SearchParameters::default()
        };
        assert!(matches!(
            arbiter.configure(bad),
            Err(ArbiterError::InvalidParameters(_))
        ));
        assert_eq!(arbiter.parameters(), &SearchParameters::default());
    }

    #[test]
    fn small_search_accepts_a_move() {
        let mut arbiter = MoveArbiter::new();
        arbiter.configure(quick()).unwrap();
        let run = arbiter.start().unwrap();
        let last = run.wait();
        assert!(matches!(last, Some(ArbiterEvent::Decision(_))));
        assert_eq!(arbiter.state(), ArbiterState::Accepted);
    }

    #[test]
    fn dropping_a_run_cancels_it() {
        let mut arbiter = MoveArbiter::new().with_pacing(Duration::from_secs(5));
        arbiter.configure(quick()).unwrap();
        let run = arbiter.start().unwrap();
        drop(run);
        assert_eq!(arbiter.state(), ArbiterState::Cancelled);
        assert!(arbiter.start().is_ok());
    }
}
