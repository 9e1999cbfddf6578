//! Iterative-deepening alpha-beta search.
//!
//! The root move list is split across worker threads; each worker owns its
//! share of the transposition table and keeps it between depths. A depth
//! counts only once every worker finished it: an interrupted depth is thrown
//! away and the previous result stands.
//!
//! Stopping rules:
//! - cancellation interrupts any depth, including the first;
//! - the time budget and a forced stop never interrupt depth 1, so a
//!   completed search always has a best move.

use crate::eval::{evaluate, piece_value, MATE_SCORE, MATE_THRESHOLD};
use crate::movegen::{generate_legal_moves, make_move, Geometry, MoveList};
use crate::Position;
use std::sync::atomic::{AtomicBool, Ordering};
use std::panic;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use xiangqi_core::Move;

/// Nodes between two looks at the clock and the stop flags.
const CHECK_INTERVAL: u64 = 1024;

/// Bounds for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_depth: u8,
    pub thinking_time: Duration,
    pub hash_mb: usize,
    pub threads: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_depth: 18,
            thinking_time: Duration::from_millis(3000),
            hash_mb: 16,
            threads: 1,
        }
    }
}

/// Flags another thread raises to end a search early.
#[derive(Debug, Clone, Default)]
pub struct StopSignals {
    cancel: Arc<AtomicBool>,
    force: Arc<AtomicBool>,
}

impl StopSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandons the search; no further depth completes.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Ends the search after depth 1, keeping the last completed depth.
    pub fn force(&self) {
        self.force.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn is_forced(&self) -> bool {
        self.force.load(Ordering::SeqCst)
    }
}

/// Result of one completed depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthReport {
    pub depth: u8,
    pub best_move: Move,
    /// Score of `best_move` from the mover's perspective.
    pub score: i32,
    /// Nodes visited since the search began.
    pub nodes: u64,
    /// Time since the search began.
    pub elapsed: Duration,
    /// Principal variation starting with `best_move`.
    pub pv: Vec<Move>,
    /// All root moves, best first.
    pub ranked: Vec<Move>,
}

/// Why a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_depth` was completed.
    DepthExhausted,
    /// The thinking time ran out.
    TimeUp,
    /// A forced stop was honoured.
    Forced,
    /// The search was cancelled.
    Cancelled,
    /// The depth callback asked to stop.
    Halted,
    /// The side to move has no moves.
    NoMoves,
}

/// Final result of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// The deepest completed depth, if any.
    pub last: Option<DepthReport>,
    pub reason: StopReason,
    pub nodes: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy)]
struct TtEntry {
    key: u64,
    best: Move,
    score: i32,
    depth: u8,
    bound: Bound,
}

impl Default for TtEntry {
    fn default() -> Self {
        TtEntry {
            key: 0,
            best: Move::NULL,
            score: 0,
            depth: 0,
            bound: Bound::Exact,
        }
    }
}

/// Fixed-size, always-replace transposition table.
struct TranspositionTable {
    entries: Vec<TtEntry>,
    mask: usize,
}

impl TranspositionTable {
    fn with_megabytes(megabytes: usize) -> Self {
        let bytes = megabytes.max(1) << 20;
        let wanted = (bytes / std::mem::size_of::<TtEntry>()).max(1);
        // Round down to a power of two so the hash can be masked.
        let len = 1usize << (usize::BITS - 1 - wanted.leading_zeros());
        TranspositionTable {
            entries: vec![TtEntry::default(); len],
            mask: len - 1,
        }
    }

    fn probe(&self, key: u64) -> Option<TtEntry> {
        let entry = self.entries[key as usize & self.mask];
        (entry.key == key && entry.best != Move::NULL).then_some(entry)
    }

    fn store(&mut self, key: u64, best: Move, score: i32, depth: u8, bound: Bound) {
        let slot = &mut self.entries[key as usize & self.mask];
        if slot.key == key && slot.depth > depth && bound != Bound::Exact {
            return;
        }
        *slot = TtEntry {
            key,
            best,
            score,
            depth,
            bound,
        };
    }
}

/// Mate scores count plies from the root; stored ones count from the node.
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

/// Read-only state every worker consults.
struct SharedContext<'a> {
    signals: &'a StopSignals,
    start: Instant,
    thinking_time: Duration,
    geometry: Geometry,
}

impl SharedContext<'_> {
    fn should_stop(&self, depth: u8) -> bool {
        if self.signals.is_cancelled() {
            return true;
        }
        depth > 1 && (self.signals.is_forced() || self.start.elapsed() >= self.thinking_time)
    }
}

/// One search thread's private state.
struct Worker {
    tt: TranspositionTable,
    nodes: u64,
    stopped: bool,
}

impl Worker {
    fn new(hash_mb: usize) -> Self {
        Worker {
            tt: TranspositionTable::with_megabytes(hash_mb),
            nodes: 0,
            stopped: false,
        }
    }

    /// Scores each of `moves` at `depth`, or returns `None` if interrupted.
    fn search_root(
        &mut self,
        ctx: &SharedContext<'_>,
        position: &Position,
        moves: &[Move],
        depth: u8,
    ) -> Option<Vec<(Move, i32)>> {
        self.stopped = false;
        let mut alpha = -MATE_SCORE - 1;
        let beta = MATE_SCORE + 1;
        let mut scored = Vec::with_capacity(moves.len());

        for &m in moves {
            let next = make_move(position, m);
            let score = -self.alpha_beta(ctx, &next, depth, depth - 1, 1, -beta, -alpha);
            if self.stopped {
                return None;
            }
            if score > alpha {
                alpha = score;
            }
            scored.push((m, score));
        }
        Some(scored)
    }

    #[allow(clippy::too_many_arguments)]
    fn alpha_beta(
        &mut self,
        ctx: &SharedContext<'_>,
        position: &Position,
        iteration: u8,
        depth: u8,
        ply: i32,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        self.nodes += 1;
        if self.nodes % CHECK_INTERVAL == 0 && ctx.should_stop(iteration) {
            self.stopped = true;
        }
        if self.stopped {
            return 0;
        }

        if depth == 0 {
            return evaluate(position);
        }

        let key = position.zobrist_hash();
        let tt_move = match self.tt.probe(key) {
            Some(entry) => {
                if entry.depth >= depth {
                    let score = score_from_tt(entry.score, ply);
                    let usable = match entry.bound {
                        Bound::Exact => true,
                        Bound::Lower => score >= beta,
                        Bound::Upper => score <= alpha,
                    };
                    if usable {
                        return score;
                    }
                }
                Some(entry.best)
            }
            None => None,
        };

        let mut moves = generate_legal_moves(position, ctx.geometry);
        if moves.is_empty() {
            // No moves is a loss in Xiangqi, checked or not.
            return -MATE_SCORE + ply;
        }
        order_moves(position, &mut moves, tt_move);

        let original_alpha = alpha;
        let mut best_move = moves[0];
        for &m in moves.as_slice() {
            let next = make_move(position, m);
            let score = -self.alpha_beta(ctx, &next, iteration, depth - 1, ply + 1, -beta, -alpha);
            if self.stopped {
                return 0;
            }
            if score >= beta {
                self.tt.store(key, m, score_to_tt(beta, ply), depth, Bound::Lower);
                return beta;
            }
            if score > alpha {
                alpha = score;
                best_move = m;
            }
        }

        let bound = if alpha > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt.store(key, best_move, score_to_tt(alpha, ply), depth, bound);
        alpha
    }

    /// Follows stored best moves from `position` for up to `length` plies.
    fn principal_variation(&self, position: &Position, length: u8, geometry: Geometry) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut current = position.clone();
        let mut seen = Vec::new();
        while pv.len() < length as usize {
            let key = current.zobrist_hash();
            if seen.contains(&key) {
                break;
            }
            seen.push(key);
            let Some(entry) = self.tt.probe(key) else {
                break;
            };
            if !crate::movegen::is_legal(&current, entry.best, geometry) {
                break;
            }
            pv.push(entry.best);
            current = make_move(&current, entry.best);
        }
        pv
    }
}

/// Hash move first, then captures by most valuable victim and least valuable
/// attacker, then quiet moves in generation order.
fn order_moves(position: &Position, moves: &mut MoveList, tt_move: Option<Move>) {
    let key = |m: &Move| -> i32 {
        if Some(*m) == tt_move {
            return i32::MIN;
        }
        match position.piece_at(m.to()) {
            Some((victim, _)) => {
                let attacker = position
                    .piece_at(m.from())
                    .map_or(0, |(piece, _)| piece_value(piece));
                // Capturing the general outranks everything.
                let victim = if victim == xiangqi_core::Piece::General {
                    10 * MATE_SCORE
                } else {
                    piece_value(victim)
                };
                -(victim * 16 - attacker / 16)
            }
            None => 0,
        }
    };
    moves.as_mut_slice().sort_by_key(key);
}

/// Runs iterative deepening over one position.
pub struct Searcher {
    limits: SearchLimits,
    geometry: Geometry,
    signals: StopSignals,
}

impl Searcher {
    pub fn new(limits: SearchLimits, geometry: Geometry, signals: StopSignals) -> Self {
        Searcher {
            limits,
            geometry,
            signals,
        }
    }

    pub fn signals(&self) -> &StopSignals {
        &self.signals
    }

    /// Searches `position`, calling `on_depth` after each completed depth.
    ///
    /// Returning `false` from `on_depth` ends the search with
    /// [`StopReason::Halted`].
    pub fn run<F>(&self, position: &Position, mut on_depth: F) -> SearchOutcome
    where
        F: FnMut(&DepthReport) -> bool,
    {
        let start = Instant::now();
        let root = position.without_history();
        let max_depth = self.limits.max_depth.max(1);
        let ctx = SharedContext {
            signals: &self.signals,
            start,
            thinking_time: self.limits.thinking_time,
            geometry: self.geometry,
        };

        let mut root_moves = generate_legal_moves(&root, self.geometry);
        if root_moves.is_empty() {
            return SearchOutcome {
                last: None,
                reason: StopReason::NoMoves,
                nodes: 0,
                elapsed: start.elapsed(),
            };
        }
        order_moves(&root, &mut root_moves, None);
        let mut ranked: Vec<Move> = root_moves.as_slice().to_vec();

        let threads = self.limits.threads.clamp(1, ranked.len());
        let share = (self.limits.hash_mb / threads).max(1);
        let mut workers: Vec<Worker> = (0..threads).map(|_| Worker::new(share)).collect();
        tracing::debug!(threads, hash_mb_per_thread = share, "search started");

        let mut last: Option<DepthReport> = None;
        let mut reason = StopReason::DepthExhausted;

        for depth in 1..=max_depth {
            if ctx.should_stop(depth) {
                reason = self.stop_reason();
                break;
            }

            let Some(mut scored) = search_depth(&ctx, &mut workers, &root, &ranked, depth) else {
                reason = self.stop_reason();
                break;
            };

            // Stable sort keeps the previous order among equal scores.
            scored.sort_by_key(|(_, score)| -score);
            let (best_move, score) = scored[0];
            let owner = ranked
                .iter()
                .position(|m| *m == best_move)
                .map_or(0, |index| index % workers.len());
            ranked = scored.iter().map(|(m, _)| *m).collect();

            let mut pv = vec![best_move];
            pv.extend(workers[owner].principal_variation(
                &make_move(&root, best_move),
                depth - 1,
                self.geometry,
            ));

            let report = DepthReport {
                depth,
                best_move,
                score,
                nodes: workers.iter().map(|w| w.nodes).sum(),
                elapsed: start.elapsed(),
                pv,
                ranked: ranked.clone(),
            };
            tracing::trace!(depth, score, nodes = report.nodes, "depth completed");
            let keep_going = on_depth(&report);
            let mate_found = score.abs() >= MATE_THRESHOLD;
            last = Some(report);

            if !keep_going {
                reason = StopReason::Halted;
                break;
            }
            if self.signals.is_cancelled() {
                reason = StopReason::Cancelled;
                break;
            }
            if depth == max_depth {
                reason = StopReason::DepthExhausted;
                break;
            }
            if mate_found {
                reason = StopReason::DepthExhausted;
                break;
            }
            if self.signals.is_forced() {
                reason = StopReason::Forced;
                break;
            }
            if start.elapsed() >= self.limits.thinking_time {
                reason = StopReason::TimeUp;
                break;
            }
        }

        SearchOutcome {
            last,
            reason,
            nodes: workers.iter().map(|w| w.nodes).sum(),
            elapsed: start.elapsed(),
        }
    }

    fn stop_reason(&self) -> StopReason {
        if self.signals.is_cancelled() {
            StopReason::Cancelled
        } else if self.signals.is_forced() {
            StopReason::Forced
        } else {
            StopReason::TimeUp
        }
    }
}

/// Searches one depth with the root moves dealt round-robin to the workers.
fn search_depth(
    ctx: &SharedContext<'_>,
    workers: &mut [Worker],
    root: &Position,
    ranked: &[Move],
    depth: u8,
) -> Option<Vec<(Move, i32)>> {
    let count = workers.len();
    let shares: Vec<Vec<Move>> = (0..count)
        .map(|i| ranked.iter().skip(i).step_by(count).copied().collect())
        .collect();

    let results: Vec<Option<Vec<(Move, i32)>>> = if count == 1 {
        vec![workers[0].search_root(ctx, root, &shares[0], depth)]
    } else {
        thread::scope(|scope| {
            let handles: Vec<_> = workers
                .iter_mut()
                .zip(shares.iter())
                .map(|(worker, share)| scope.spawn(move || worker.search_root(ctx, root, share, depth)))
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(payload) => panic::resume_unwind(payload),
                })
                .collect()
        })
    };

    let mut scored = Vec::with_capacity(ranked.len());
    for result in results {
        scored.extend(result?);
    }
    // Restore the incoming order before the caller's stable sort.
    scored.sort_by_key(|(m, _)| ranked.iter().position(|r| r == m));
    Some(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_depth: u8, threads: usize) -> SearchLimits {
        SearchLimits {
            max_depth,
            thinking_time: Duration::from_secs(30),
            hash_mb: 16,
            threads,
        }
    }

    #[test]
    fn reports_every_depth_in_order() {
        let searcher = Searcher::new(limits(3, 1), Geometry::STANDARD, StopSignals::new());
        let mut depths = Vec::new();
        let outcome = searcher.run(&Position::startpos(), |report| {
            depths.push(report.depth);
            true
        });
        assert_eq!(depths, vec![1, 2, 3]);
        assert_eq!(outcome.reason, StopReason::DepthExhausted);
        let last = outcome.last.unwrap();
        assert_eq!(last.ranked.len(), 44);
        assert_eq!(last.ranked[0], last.best_move);
        assert_eq!(last.pv[0], last.best_move);
    }

    #[test]
    fn finds_mate_in_one() {
        // The chariot on a8 covers rank 8; Ri0-i9 mates along rank 9.
        let pos = Position::from_fen("4k4/R8/9/9/9/9/9/9/9/3K4R w").unwrap();
        let searcher = Searcher::new(limits(2, 1), Geometry::STANDARD, StopSignals::new());
        let outcome = searcher.run(&pos, |_| true);
        let last = outcome.last.unwrap();
        assert_eq!(last.best_move, Move::from_iccs("i0i9").unwrap());
        assert!(last.score >= MATE_THRESHOLD);
    }

    #[test]
    fn stored_mate_scores_are_relative_to_the_node() {
        // Mate two plies below a node at ply 3.
        let stored = score_to_tt(MATE_SCORE - 5, 3);
        assert_eq!(stored, MATE_SCORE - 2);
        // The same node reached at ply 5 is mated two plies later.
        assert_eq!(score_from_tt(stored, 5), MATE_SCORE - 7);
        assert_eq!(score_from_tt(score_to_tt(-MATE_SCORE + 4, 4), 6), -MATE_SCORE + 6);
        assert_eq!(score_from_tt(score_to_tt(120, 9), 2), 120);
    }

    #[test]
    fn mate_score_counts_plies_from_the_root() {
        let pos = Position::from_fen("4k4/R8/9/9/9/9/9/9/9/3K4R w").unwrap();
        let searcher = Searcher::new(limits(4, 2), Geometry::STANDARD, StopSignals::new());
        let last = searcher.run(&pos, |_| true).last.unwrap();
        assert_eq!(last.score, MATE_SCORE - 1);
    }

    #[test]
    fn threads_agree_on_move_count() {
        let searcher = Searcher::new(limits(2, 4), Geometry::STANDARD, StopSignals::new());
        let outcome = searcher.run(&Position::startpos(), |_| true);
        let last = outcome.last.unwrap();
        assert_eq!(last.depth, 2);
        assert_eq!(last.ranked.len(), 44);
        assert!(outcome.nodes > 44);
    }

    #[test]
    fn cancelled_search_reports_nothing() {
        let signals = StopSignals::new();
        signals.cancel();
        let searcher = Searcher::new(limits(5, 1), Geometry::STANDARD, signals);
        let outcome = searcher.run(&Position::startpos(), |_| panic!("no depth expected"));
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert!(outcome.last.is_none());
    }

    #[test]
    fn forced_search_still_completes_depth_one() {
        let signals = StopSignals::new();
        signals.force();
        let searcher = Searcher::new(limits(5, 1), Geometry::STANDARD, signals);
        let mut depths = Vec::new();
        let outcome = searcher.run(&Position::startpos(), |r| {
            depths.push(r.depth);
            true
        });
        assert_eq!(depths, vec![1]);
        assert_eq!(outcome.reason, StopReason::Forced);
    }

    #[test]
    fn zero_time_still_completes_depth_one() {
        let searcher = Searcher::new(
            SearchLimits {
                thinking_time: Duration::ZERO,
                ..limits(10, 1)
            },
            Geometry::STANDARD,
            StopSignals::new(),
        );
        let outcome = searcher.run(&Position::startpos(), |_| true);
        assert_eq!(outcome.last.unwrap().depth, 1);
        assert_eq!(outcome.reason, StopReason::TimeUp);
    }

    #[test]
    fn callback_can_halt() {
        let searcher = Searcher::new(limits(5, 1), Geometry::STANDARD, StopSignals::new());
        let outcome = searcher.run(&Position::startpos(), |r| r.depth < 2);
        assert_eq!(outcome.last.unwrap().depth, 2);
        assert_eq!(outcome.reason, StopReason::Halted);
    }

    #[test]
    fn no_moves_is_reported() {
        // Black to move and mated by two chariots.
        let pos = Position::from_fen("3k5/R8/3R5/9/9/9/9/9/9/4K4 b").unwrap();
        let searcher = Searcher::new(limits(3, 1), Geometry::STANDARD, StopSignals::new());
        let outcome = searcher.run(&pos, |_| true);
        assert_eq!(outcome.reason, StopReason::NoMoves);
    }

    #[test]
    fn transposition_table_is_a_power_of_two() {
        let tt = TranspositionTable::with_megabytes(16);
        assert!(tt.entries.len().is_power_of_two());
        assert_eq!(tt.mask, tt.entries.len() - 1);
    }
}
