use repstore::codec::{parse_uci, to_uci};
use repstore::visitor::{due_schedule, next_due, set_subtree_learnable, upcoming};
use repstore::{Repertoire, Section, TreeVisitor};
use shakmaty::{Chess, Position};
use tempfile::TempDir;

fn new_repertoire() -> (TempDir, Repertoire) {
    let dir = TempDir::new().unwrap();
    let rep = Repertoire::create(dir.path().join("main.rep")).unwrap();
    (dir, rep)
}

/// Store a line from `start`, returning the positions before each move.
fn store_line(rep: &mut Repertoire, section: Section, start: &Chess, line: &[&str]) -> Vec<Chess> {
    let mut pos = start.clone();
    let mut before = Vec::new();
    for uci in line {
        let mv = parse_uci(&pos, uci).unwrap();
        rep.append(section, &pos, &mv, 1, 0).unwrap();
        before.push(pos.clone());
        pos.play_unchecked(&mv);
    }
    before
}

fn ucis<I: IntoIterator<Item = repstore::Visit>>(visits: I) -> Vec<String> {
    visits.into_iter().map(|v| to_uci(&v.mv)).collect()
}

#[test]
fn transposition_back_to_start_terminates() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    store_line(&mut rep, Section::WHITE, &start, &["g1f3", "g8f6", "f3g1", "f6g8"]);

    let every: Vec<_> = TreeVisitor::new(&rep, Section::WHITE, &start).every_turn().collect();
    assert_eq!(ucis(every.clone()), vec!["g1f3", "g8f6", "f3g1"]);
    assert_eq!(every.iter().map(|v| v.depth).collect::<Vec<_>>(), vec![0, 1, 2]);

    let white_only = TreeVisitor::new(&rep, Section::WHITE, &start);
    assert_eq!(ucis(white_only), vec!["g1f3", "f3g1"]);
}

#[test]
fn shared_position_is_expanded_once() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    store_line(&mut rep, Section::WHITE, &start, &["e2e4", "e7e6", "d2d4", "d7d5"]);
    store_line(&mut rep, Section::WHITE, &start, &["d2d4", "e7e6", "e2e4", "d7d5"]);

    let visits: Vec<_> = TreeVisitor::new(&rep, Section::WHITE, &start).every_turn().collect();
    // Both orders reach the French after 1.e4 e6 2.d4; d7d5 is only walked once
    let d5 = visits.iter().filter(|v| to_uci(&v.mv) == "d7d5").count();
    assert_eq!(d5, 1);
    assert_eq!(visits.len(), 6);
}

#[test]
fn due_filters_by_time() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let before = store_line(&mut rep, Section::WHITE, &start, &["e2e4", "e7e5", "g1f3"]);
    rep.make_learnable_at(&before[0], Section::WHITE, false, 300);
    rep.make_learnable_at(&before[2], Section::WHITE, false, 200);

    let at = |now| TreeVisitor::new(&rep, Section::WHITE, &start).only_due().at_time(now);
    assert_eq!(at(100).count(), 0);
    assert_eq!(ucis(at(250)), vec!["g1f3"]);
    assert_eq!(ucis(at(300)), vec!["e2e4", "g1f3"]);

    let scheduled = TreeVisitor::new(&rep, Section::WHITE, &start).only_scheduled().at_time(0);
    assert_eq!(scheduled.count(), 2);
    assert_eq!(to_uci(&next_due(&rep, Section::WHITE, &start).unwrap().mv), "e2e4");
}

#[test]
fn schedule_is_soonest_first() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let before = store_line(&mut rep, Section::WHITE, &start, &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]);
    rep.make_learnable_at(&before[0], Section::WHITE, false, 300);
    rep.make_learnable_at(&before[2], Section::WHITE, false, 200);
    rep.make_learnable_at(&before[4], Section::WHITE, false, 250);

    assert_eq!(ucis(due_schedule(&rep, Section::WHITE, &start, 10)), vec!["g1f3", "f1b5", "e2e4"]);
    assert_eq!(ucis(due_schedule(&rep, Section::WHITE, &start, 1)), vec!["g1f3"]);
    assert!(due_schedule(&rep, Section::WHITE, &start, 0).is_empty());

    let learn: Vec<u32> = upcoming(&rep, Section::WHITE, 2).iter().map(|r| r.learn).collect();
    assert_eq!(learn, vec![200, 250]);
}

#[test]
fn subtree_learnable_touches_player_moves_only() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let before = store_line(&mut rep, Section::BLACK, &start, &["e2e4", "c7c5", "g1f3", "d7d6"]);

    assert_eq!(set_subtree_learnable(&mut rep, Section::BLACK, &start, false), 2);
    assert_eq!(set_subtree_learnable(&mut rep, Section::BLACK, &start, false), 0);
    assert_eq!(set_subtree_learnable(&mut rep, Section::BLACK, &start, true), 2);

    let learn = |pos: &Chess| rep.find_records(Section::BLACK, pos).next().unwrap().learn;
    assert_eq!(learn(&before[0]), 0);
    assert!(learn(&before[1]) > 0);
    assert_eq!(learn(&before[2]), 0);
    assert!(learn(&before[3]) > 0);
}

#[test]
fn tactics_train_the_side_to_move_at_start() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    store_line(&mut rep, Section::Tactics, &start, &["e2e4", "e7e5", "d1h5"]);

    assert_eq!(set_subtree_learnable(&mut rep, Section::Tactics, &start, false), 2);
    assert_eq!(upcoming(&rep, Section::Tactics, 10).len(), 2);
}
