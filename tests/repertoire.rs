use std::time::Duration;

use repstore::codec::{parse_uci, to_uci};
use repstore::schedule::now_minutes;
use repstore::storage::{MoveTable, Record};
use repstore::{parse_fen, BookMove, Error, PositionKey, Repertoire, Section};
use shakmaty::{Chess, Position, Square};
use tempfile::TempDir;

fn new_repertoire() -> (TempDir, Repertoire) {
    let dir = TempDir::new().unwrap();
    let rep = Repertoire::create(dir.path().join("main.rep")).expect("create repertoire");
    (dir, rep)
}

fn play(pos: &Chess, uci: &str) -> Chess {
    let mv = parse_uci(pos, uci).unwrap();
    pos.clone().play(&mv).unwrap()
}

#[test]
fn append_is_unique_per_position_and_move() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let e4 = parse_uci(&start, "e2e4").unwrap();

    assert!(rep.append(Section::WHITE, &start, &e4, 1, 0).unwrap());
    assert!(!rep.append(Section::WHITE, &start, &e4, 1, 0).unwrap());
    assert_eq!(rep.stats().white_white, 1);
    assert!(rep.contains(Section::WHITE, &start, &e4));
    assert!(!rep.contains(Section::BLACK, &start, &e4));
}

#[test]
fn tables_are_routed_by_side_to_move() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let after_e4 = play(&start, "e2e4");

    let e5 = parse_uci(&after_e4, "e7e5").unwrap();
    rep.append(Section::WHITE, &after_e4, &e5, 1, 0).unwrap();
    rep.append(Section::BLACK, &after_e4, &e5, 1, 0).unwrap();

    let stats = rep.stats();
    assert_eq!(stats.white_white, 0);
    assert_eq!(stats.white_black, 1);
    assert_eq!(stats.black_black, 1);
    assert_eq!(stats.black_white, 0);
    assert!(rep.has_position(Section::WHITE, &after_e4));
    assert!(!rep.has_position(Section::WHITE, &start));
}

#[test]
fn tactics_share_one_table_and_deduplicate() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let after_e4 = play(&start, "e2e4");
    let d4 = parse_uci(&start, "d2d4").unwrap();
    let c5 = parse_uci(&after_e4, "c7c5").unwrap();

    assert!(rep.append(Section::Tactics, &start, &d4, 1, 0).unwrap());
    assert!(rep.append(Section::Tactics, &after_e4, &c5, 1, 0).unwrap());
    assert!(!rep.append(Section::Tactics, &start, &d4, 1, 0).unwrap());
    assert_eq!(rep.stats().tactics, 2);
}

#[test]
fn find_moves_decodes_every_stored_move() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    for uci in ["e2e4", "d2d4", "g1f3"] {
        let mv = parse_uci(&start, uci).unwrap();
        rep.append(Section::WHITE, &start, &mv, 1, 0).unwrap();
    }

    let mut moves: Vec<String> = rep
        .find_moves(Section::WHITE, &start)
        .map(|m| repstore::codec::to_uci(&m))
        .collect();
    moves.sort();
    assert_eq!(moves, vec!["d2d4", "e2e4", "g1f3"]);
    assert!(rep.find_move(Section::WHITE, &start).is_some());
    assert!(rep.find_move(Section::BLACK, &start).is_none());
}

#[test]
fn remove_one_or_all_moves() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let e4 = parse_uci(&start, "e2e4").unwrap();
    let d4 = parse_uci(&start, "d2d4").unwrap();
    rep.append(Section::WHITE, &start, &e4, 1, 0).unwrap();
    rep.append(Section::WHITE, &start, &d4, 1, 0).unwrap();

    assert_eq!(rep.remove(Section::WHITE, &start, Some(&e4)).unwrap(), 1);
    assert_eq!(rep.remove(Section::WHITE, &start, Some(&e4)).unwrap(), 0);
    assert_eq!(rep.remove(Section::WHITE, &start, None).unwrap(), 1);
    assert!(!rep.has_position(Section::WHITE, &start));
}

#[test]
fn learnable_then_first_correct_answer() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let e4 = parse_uci(&start, "e2e4").unwrap();
    rep.append(Section::WHITE, &start, &e4, 1, 0).unwrap();

    assert_eq!(rep.make_learnable_at(&start, Section::WHITE, false, 1_000), 1);
    let record = rep.find_records(Section::WHITE, &start).next().unwrap();
    assert_eq!(record.learn, 1_000);
    assert_eq!(record.triple().consecutive, 0);

    // Already scheduled entries are left alone unless overridden
    assert_eq!(rep.make_learnable_at(&start, Section::WHITE, false, 5_000), 0);
    assert_eq!(rep.make_learnable_at(&start, Section::WHITE, true, 1_000), 1);

    let next = rep
        .update_learning_data_at(Section::WHITE, &start, &e4, 0, Duration::from_secs(5), 2_000)
        .unwrap()
        .expect("move is stored");
    assert_eq!(next.consecutive, 1);
    assert_eq!(next.due, 2_240);
    assert!((next.easiness - 2.6).abs() < 1e-9);

    let stored = rep.find_records(Section::WHITE, &start).next().unwrap().triple();
    assert_eq!(stored.consecutive, 1);
    assert_eq!(stored.due, 2_240);
    assert!((stored.easiness - 2.6).abs() < 1e-6);
}

#[test]
fn make_learnable_uses_the_wall_clock() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let e4 = parse_uci(&start, "e2e4").unwrap();
    rep.append(Section::WHITE, &start, &e4, 1, 0).unwrap();

    let before = now_minutes();
    assert_eq!(rep.make_learnable(&start, Section::WHITE, false), 1);
    let after = now_minutes();

    let record = rep.find_records(Section::WHITE, &start).next().unwrap();
    assert!(record.learn > 0);
    assert!(before <= record.learn && record.learn <= after);
    assert!(record.is_due(after));
}

#[test]
fn castling_stored_as_king_destination_still_matches() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("main.rep");
    let pos = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let castle = parse_uci(&pos, "e1g1").unwrap();
    Repertoire::create(&root).unwrap().close();

    // Written by a tool that stores the king's destination square
    let king_form = BookMove::new(Square::E1, Square::G1, None).encode();
    {
        let mut table = MoveTable::open(root.join("white").join("white")).unwrap();
        table.insert(Record::new(PositionKey::of(&pos), king_form, 1, 0)).unwrap();
        table.flush().unwrap();
    }

    let mut rep = Repertoire::open(&root).unwrap();
    assert!(rep.contains(Section::WHITE, &pos, &castle));
    assert!(!rep.append(Section::WHITE, &pos, &castle, 1, 0).unwrap());
    let moves: Vec<String> = rep.find_moves(Section::WHITE, &pos).map(|m| to_uci(&m)).collect();
    assert_eq!(moves, vec!["e1g1"]);

    let next = rep
        .update_learning_data_at(Section::WHITE, &pos, &castle, 0, Duration::from_secs(5), 2_000)
        .unwrap()
        .expect("castling is stored");
    assert_eq!(next.due, 2_240);
    let record = rep.find_records(Section::WHITE, &pos).next().unwrap();
    assert_eq!(record.raw_move, king_form);
    assert_eq!(record.learn, 2_240);

    assert_eq!(rep.remove(Section::WHITE, &pos, Some(&castle)).unwrap(), 1);
    assert!(!rep.has_position(Section::WHITE, &pos));
}

#[test]
fn update_of_unknown_move_is_none() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let e4 = parse_uci(&start, "e2e4").unwrap();
    let result = rep
        .update_learning_data_at(Section::WHITE, &start, &e4, 0, Duration::from_secs(5), 2_000)
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn duplicate_records_are_reported_not_updated() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("main.rep");
    let start = Chess::default();
    let e4 = parse_uci(&start, "e2e4").unwrap();
    Repertoire::create(&root).unwrap().close();

    {
        let mut table = MoveTable::open(root.join("white").join("white")).unwrap();
        let record = Record::new(PositionKey::of(&start), repstore::codec::encode(&e4), 1, 0);
        table.insert(record).unwrap();
        table.insert(record).unwrap();
        table.flush().unwrap();
    }

    let mut rep = Repertoire::open(&root).unwrap();
    let result = rep.update_learning_data_at(Section::WHITE, &start, &e4, 0, Duration::from_secs(5), 2_000);
    assert!(matches!(result, Err(Error::AmbiguousRecord { count: 2, .. })));
    assert!(rep.find_records(Section::WHITE, &start).all(|r| r.learn == 0));
}

#[test]
fn comments_set_replace_remove() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();
    let after_e4 = play(&start, "e2e4");

    assert_eq!(rep.get_comment(&start), None);
    rep.set_comment(&start, "main line").unwrap();
    rep.set_comment(&after_e4, "King's pawn").unwrap();
    rep.set_comment(&start, "tries for an edge").unwrap();

    assert_eq!(rep.get_comment(&start).as_deref(), Some("tries for an edge"));
    assert_eq!(rep.get_comment(&after_e4).as_deref(), Some("King's pawn"));
    assert_eq!(rep.comments().len(), 2);

    assert!(rep.remove_comment(&start).unwrap());
    assert!(!rep.remove_comment(&start).unwrap());
    assert_eq!(rep.get_comment(&start), None);
}

#[test]
fn comment_length_limit() {
    let (_dir, mut rep) = new_repertoire();
    let start = Chess::default();

    let longest = "x".repeat(248);
    rep.set_comment(&start, &longest).unwrap();
    assert_eq!(rep.get_comment(&start), Some(longest));

    let too_long = "x".repeat(249);
    assert!(matches!(
        rep.set_comment(&start, &too_long),
        Err(Error::CommentTooLong { len: 249, max: 248 })
    ));

    assert!(matches!(
        rep.set_comment(&start, "line one\0line two"),
        Err(Error::CommentNul { offset: 8 })
    ));
    assert_eq!(rep.get_comment(&start).as_deref(), Some("x".repeat(248).as_str()));
}

#[test]
fn initial_positions_are_deduplicated() {
    let (_dir, mut rep) = new_repertoire();
    let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";

    assert!(rep.initial_positions_mut().add(fen).unwrap());
    assert!(!rep.initial_positions_mut().add(fen).unwrap());
    assert_eq!(rep.stats().initial_positions, 1);
    assert_eq!(rep.initial_positions().positions().unwrap().len(), 1);
}
