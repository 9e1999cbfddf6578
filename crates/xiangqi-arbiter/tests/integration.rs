//! End-to-end runs of the move arbiter.

use std::time::{Duration, Instant};

use xiangqi_arbiter::{
    AnalysisEvent, ArbiterError, ArbiterEvent, ArbiterState, Decision, DecisionSource,
    MoveArbiter, SearchParameters, MAX_VALIDATION_ATTEMPTS,
};
use xiangqi_core::Move;
use xiangqi_engine::{Position, RuleEngine, RuleError, RuleVariant};
use xiangqi_openings::{MoveDatabase, OpeningMove};

/// Rules that refuse every move.
#[derive(Clone)]
struct RefuseEverything;

impl RuleEngine for RefuseEverything {
    fn name(&self) -> &str {
        "Refuse everything"
    }

    fn is_legal_move(&self, _m: Move, position: &Position) -> Result<bool, RuleError> {
        position.validate()?;
        Ok(false)
    }
}

/// Rules whose judgement blows up.
#[derive(Clone)]
struct PanicOnJudge;

impl RuleEngine for PanicOnJudge {
    fn name(&self) -> &str {
        "Panic on judge"
    }

    fn is_legal_move(&self, _m: Move, _position: &Position) -> Result<bool, RuleError> {
        panic!("rule table corrupted");
    }
}

fn params(max_depth: u8, thinking_time_ms: u64) -> SearchParameters {
    SearchParameters {
        thinking_time_ms,
        max_depth,
        hash_mb: 16,
        threads: 2,
        book_enabled: false,
        ponder_enabled: true,
    }
}

fn progress(events: &[ArbiterEvent]) -> Vec<&AnalysisEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ArbiterEvent::Progress(p) => Some(p),
            _ => None,
        })
        .collect()
}

fn decision(events: &[ArbiterEvent]) -> &Decision {
    match events.last() {
        Some(ArbiterEvent::Decision(d)) => d,
        other => panic!("expected a decision, got {other:?}"),
    }
}

fn single_move_book(notation: &str) -> MoveDatabase {
    let mut book = MoveDatabase::new();
    book.add_position(&Position::startpos(), vec![OpeningMove::new(notation, 1)]);
    book
}

fn assert_single_terminal(events: &[ArbiterEvent]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "{events:?}");
    assert!(events.last().is_some_and(ArbiterEvent::is_terminal));
}

#[test]
fn test_depth_three_from_startpos() {
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(3, 10_000)).unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    let depths: Vec<u8> = progress(&events).iter().map(|p| p.depth).collect();
    assert_eq!(depths, [1, 2, 3]);
    assert_eq!(events.len(), 4, "{events:?}");

    let decision = decision(&events);
    assert_eq!(decision.source, DecisionSource::Search);
    assert_eq!(decision.rule_variant, "Standard");
    assert_eq!(decision.retries, 0);
    assert_eq!(decision.depth, 3);
    assert_eq!(
        RuleVariant::Standard.is_legal_move(decision.mv, &Position::startpos()),
        Ok(true)
    );
    assert_eq!(arbiter.state(), ArbiterState::Accepted);
}

#[test]
fn test_progress_is_monotonic_and_bounded() {
    let position =
        Position::from_fen("2bakab2/9/2n1c1n2/p1p1p3p/6p2/2P6/P3P1P1P/1CN1B1N2/9/2BAKA3 w").unwrap();
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(4, 10_000)).unwrap();
    arbiter.set_position(position.clone()).unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    let ticks = progress(&events);
    assert!(!ticks.is_empty());
    for pair in ticks.windows(2) {
        assert!(pair[0].depth <= pair[1].depth);
        assert!(pair[0].nodes <= pair[1].nodes);
        assert!(pair[0].elapsed <= pair[1].elapsed);
    }
    assert!(ticks.iter().all(|p| p.depth <= 4));
    assert!(ticks.iter().all(|p| p.pv.first() == Some(&p.best_move)));

    let decision = decision(&events);
    assert_eq!(RuleVariant::Standard.is_legal_move(decision.mv, &position), Ok(true));
}

#[test]
fn test_time_budget_ends_the_search() {
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(64, 200)).unwrap();

    let started = Instant::now();
    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    let elapsed = started.elapsed();

    let ticks = progress(&events);
    let deepest = ticks.last().map_or(0, |p| p.depth);
    assert!(deepest >= 1);
    assert!(deepest < 64);
    assert!(elapsed >= Duration::from_millis(200));
    decision(&events);
}

#[test]
fn test_early_finish_means_depth_exhausted() {
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(2, 60_000)).unwrap();

    let started = Instant::now();
    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(progress(&events).last().map(|p| p.depth), Some(2));
}

#[test]
fn test_book_move_skips_search() {
    let mut arbiter = MoveArbiter::new().with_book(single_move_book("炮二平五"));
    arbiter
        .configure(SearchParameters {
            book_enabled: true,
            ..params(3, 10_000)
        })
        .unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert_eq!(events.len(), 2, "{events:?}");
    let ticks = progress(&events);
    assert_eq!(ticks.len(), 1);
    assert!(ticks[0].is_book());
    assert_eq!(ticks[0].notation, "炮二平五");

    let decision = decision(&events);
    assert_eq!(decision.source, DecisionSource::Book);
    assert_eq!(decision.mv, Move::from_iccs("h2e2").unwrap());
    assert_eq!(decision.depth, 0);
    assert_eq!(decision.ponder, None);
}

#[test]
fn test_disabled_book_is_ignored() {
    let mut arbiter = MoveArbiter::new().with_book(single_move_book("炮二平五"));
    arbiter.configure(params(1, 10_000)).unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert!(progress(&events).iter().all(|p| !p.is_book()));
    assert_eq!(decision(&events).source, DecisionSource::Search);
}

#[test]
fn test_illegal_book_move_falls_through_to_search() {
    // The left chariot is boxed in by its own horse.
    let mut arbiter = MoveArbiter::new().with_book(single_move_book("车九平八"));
    arbiter
        .configure(SearchParameters {
            book_enabled: true,
            ..params(2, 10_000)
        })
        .unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert!(matches!(&events[0], ArbiterEvent::Progress(p) if p.is_book()));
    assert!(matches!(&events[1], ArbiterEvent::Rejected(r) if r.attempt == 1));
    let decision = decision(&events);
    assert_eq!(decision.source, DecisionSource::Search);
    assert_eq!(decision.retries, 1);
}

#[test]
fn test_undecodable_book_move_is_rejected_without_progress() {
    let mut arbiter = MoveArbiter::new().with_book(single_move_book("炮五平六"));
    arbiter
        .configure(SearchParameters {
            book_enabled: true,
            ..params(1, 10_000)
        })
        .unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    match &events[0] {
        ArbiterEvent::Rejected(r) => {
            assert_eq!(r.notation, "炮五平六");
            assert_eq!(r.mv, None);
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert!(progress(&events).iter().all(|p| !p.is_book()));
    decision(&events);
}

#[test]
fn test_refusing_rules_exhaust_the_attempts() {
    let mut arbiter = MoveArbiter::with_rules(RefuseEverything);
    arbiter.configure(params(2, 10_000)).unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    let rejections: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ArbiterEvent::Rejected(r) => Some(r.attempt),
            _ => None,
        })
        .collect();
    assert_eq!(rejections, (1..=MAX_VALIDATION_ATTEMPTS).collect::<Vec<_>>());
    assert_eq!(
        events.last(),
        Some(&ArbiterEvent::Failed(ArbiterError::NoLegalMoveFound {
            attempts: MAX_VALIDATION_ATTEMPTS
        }))
    );
    assert_eq!(arbiter.state(), ArbiterState::Exhausted);
}

#[test]
fn test_refusing_rules_with_book_share_the_bound() {
    let mut arbiter =
        MoveArbiter::with_rules(RefuseEverything).with_book(single_move_book("炮二平五"));
    arbiter
        .configure(SearchParameters {
            book_enabled: true,
            ..params(1, 10_000)
        })
        .unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    let rejected = events
        .iter()
        .filter(|e| matches!(e, ArbiterEvent::Rejected(_)))
        .count();
    assert_eq!(rejected, MAX_VALIDATION_ATTEMPTS);
    assert!(matches!(
        events.last(),
        Some(ArbiterEvent::Failed(ArbiterError::NoLegalMoveFound { .. }))
    ));
}

#[test]
fn test_cancel_stops_all_further_output() {
    for delay_ms in [0, 5, 40, 120] {
        let mut arbiter = MoveArbiter::new().with_pacing(Duration::from_millis(30));
        arbiter.configure(params(64, 60_000)).unwrap();
        let run = arbiter.start().unwrap();

        std::thread::sleep(Duration::from_millis(delay_ms));
        assert!(arbiter.cancel());
        assert_eq!(arbiter.state(), ArbiterState::Cancelled);

        let events: Vec<ArbiterEvent> = run.collect();
        assert_single_terminal(&events);
        assert_eq!(events.last(), Some(&ArbiterEvent::Cancelled));
        assert!(!events.iter().any(|e| matches!(e, ArbiterEvent::Decision(_))));
    }
}

#[test]
fn test_cancel_after_first_progress() {
    let mut arbiter = MoveArbiter::new().with_pacing(Duration::from_millis(50));
    arbiter.configure(params(64, 60_000)).unwrap();
    let mut run = arbiter.start().unwrap();

    let first = run.next();
    assert!(matches!(first, Some(ArbiterEvent::Progress(_))));
    assert!(run.cancel());

    let rest: Vec<ArbiterEvent> = run.collect();
    assert_eq!(rest.last(), Some(&ArbiterEvent::Cancelled));
    assert!(rest.iter().all(|e| !matches!(e, ArbiterEvent::Decision(_))));
    // Only events queued before the cancel may precede the acknowledgment.
    assert!(rest.len() <= 2, "{rest:?}");
}

#[test]
fn test_cancel_after_decision_is_a_no_op() {
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(1, 10_000)).unwrap();
    let mut run = arbiter.start().unwrap();

    let events: Vec<ArbiterEvent> = run.by_ref().collect();
    decision(&events);
    assert!(!run.cancel());
    assert!(run.next().is_none());
    assert_eq!(arbiter.state(), ArbiterState::Accepted);
}

#[test]
fn test_set_position_while_searching_is_rejected() {
    let mut arbiter = MoveArbiter::new().with_pacing(Duration::from_millis(100));
    arbiter.configure(params(3, 10_000)).unwrap();
    let mut run = arbiter.start().unwrap();

    assert!(matches!(run.next(), Some(ArbiterEvent::Progress(_))));
    let other = Position::from_fen("3k5/9/9/9/9/9/9/9/9/4K4 w").unwrap();
    assert_eq!(
        arbiter.set_position(other),
        Err(ArbiterError::Busy("set the position"))
    );
    assert!(matches!(
        arbiter.configure(SearchParameters::default()),
        Err(ArbiterError::Busy(_))
    ));
    assert!(matches!(
        arbiter.set_rule_variant(RuleVariant::Relaxed),
        Err(ArbiterError::Busy(_))
    ));
    assert!(matches!(arbiter.start(), Err(ArbiterError::AlreadyRunning)));

    let rest: Vec<ArbiterEvent> = run.collect();
    let depths: Vec<u8> = progress(&rest).iter().map(|p| p.depth).collect();
    assert_eq!(depths, [2, 3]);
    let decision = decision(&rest);
    assert_eq!(
        RuleVariant::Standard.is_legal_move(decision.mv, &Position::startpos()),
        Ok(true)
    );
    assert_eq!(arbiter.position(), &Position::startpos());
}

#[test]
fn test_configuration_changes_between_runs() {
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(1, 10_000)).unwrap();
    arbiter.start().unwrap().wait();

    arbiter.set_rule_variant(RuleVariant::Relaxed).unwrap();
    let position = Position::from_fen("3k5/9/9/9/4P4/9/9/9/9/5K3 w").unwrap();
    arbiter.set_position(position.clone()).unwrap();
    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    let decision = decision(&events);
    assert_eq!(decision.rule_variant, "Relaxed");
    assert_eq!(RuleVariant::Relaxed.is_legal_move(decision.mv, &position), Ok(true));
}

#[test]
fn test_missing_general_aborts_the_run() {
    let mut arbiter = MoveArbiter::new();
    let broken = Position::from_fen_unchecked("9/9/9/9/9/9/9/9/9/4K4 w").unwrap();
    arbiter.set_position(broken).unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        ArbiterEvent::Failed(ArbiterError::InvalidPosition(_))
    ));
    assert_eq!(arbiter.state(), ArbiterState::Aborted);
}

#[test]
fn test_mated_side_has_no_move() {
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(3, 10_000)).unwrap();
    arbiter
        .set_position(Position::from_fen("3k5/R8/3R5/9/9/9/9/9/9/4K4 b").unwrap())
        .unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert_eq!(
        events,
        [ArbiterEvent::Failed(ArbiterError::NoLegalMoveFound { attempts: 0 })]
    );
}

#[test]
fn test_force_ends_a_long_search() {
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(64, 120_000)).unwrap();
    let started = Instant::now();
    let mut run = arbiter.start().unwrap();

    assert!(matches!(run.next(), Some(ArbiterEvent::Progress(_))));
    assert!(run.force());
    let rest: Vec<ArbiterEvent> = run.collect();
    decision(&rest);
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[test]
fn test_ponder_move_follows_the_principal_variation() {
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(3, 10_000)).unwrap();
    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();

    let last_pv = progress(&events).last().map(|p| p.pv.clone()).unwrap();
    let decision = decision(&events);
    assert_eq!(decision.mv, last_pv[0]);
    assert_eq!(decision.ponder, last_pv.get(1).copied());

    arbiter
        .configure(SearchParameters {
            ponder_enabled: false,
            ..params(3, 10_000)
        })
        .unwrap();
    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert_eq!(self::decision(&events).ponder, None);
}

#[test]
fn test_mate_in_one_is_found_and_shown() {
    let position = Position::from_fen("4k4/R8/9/9/9/9/9/9/9/3K4R w").unwrap();
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(4, 10_000)).unwrap();
    arbiter.set_position(position).unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    let decision = decision(&events);
    assert_eq!(decision.mv, Move::from_iccs("i0i9").unwrap());
    assert_eq!(decision.evaluation.map(|e| e.to_string()).as_deref(), Some("M1"));
}

#[test]
fn test_worker_panic_ends_the_run_and_frees_the_arbiter() {
    let mut arbiter = MoveArbiter::with_rules(PanicOnJudge);
    arbiter.configure(params(1, 10_000)).unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert_single_terminal(&events);
    match events.last() {
        Some(ArbiterEvent::Failed(ArbiterError::Worker(message))) => {
            assert!(message.contains("rule table corrupted"), "{message}");
        }
        other => panic!("expected a worker failure, got {other:?}"),
    }
    assert_eq!(arbiter.state(), ArbiterState::Aborted);

    arbiter.configure(params(2, 10_000)).unwrap();
    arbiter.set_position(Position::startpos()).unwrap();
    let last = arbiter.start().unwrap().wait();
    assert!(matches!(last, Some(ArbiterEvent::Failed(ArbiterError::Worker(_)))));
}

#[test]
fn test_overcrowded_board_aborts_without_panicking() {
    let fen = "1N1NkN1N1/N1N1N1N1N/1N1N1N1N1/N1N1N1N1N/1N1N1N1N1/N1N1N1N1N/1N1N1N1N1/N1N1N1N1N/1N1N1N1N1/N1N1K1N1N w";
    let mut arbiter = MoveArbiter::new();
    arbiter.configure(params(2, 10_000)).unwrap();
    arbiter
        .set_position(Position::from_fen_unchecked(fen).unwrap())
        .unwrap();

    let events: Vec<ArbiterEvent> = arbiter.start().unwrap().collect();
    assert_eq!(events.len(), 1, "{events:?}");
    assert!(matches!(
        events[0],
        ArbiterEvent::Failed(ArbiterError::InvalidPosition(_))
    ));
    assert_eq!(arbiter.state(), ArbiterState::Aborted);
}
