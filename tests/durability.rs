use std::fs;

use repstore::codec::parse_uci;
use repstore::{Error, Repertoire, Section};
use shakmaty::{Chess, Position};
use tempfile::TempDir;

#[test]
fn flushed_changes_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("main.rep");
    let start = Chess::default();
    let e4 = parse_uci(&start, "e2e4").unwrap();
    let after_e4 = start.clone().play(&e4).unwrap();
    let c5 = parse_uci(&after_e4, "c7c5").unwrap();

    {
        let mut rep = Repertoire::create(&root).unwrap();
        rep.append(Section::WHITE, &start, &e4, 1, 0).unwrap();
        rep.append(Section::BLACK, &after_e4, &c5, 1, 0).unwrap();
        rep.set_comment(&after_e4, "Sicilian").unwrap();
        rep.make_learnable_at(&start, Section::WHITE, false, 777);
        rep.flush().unwrap();
        // Flushing twice is harmless
        rep.flush().unwrap();
        rep.close();
    }

    let rep = Repertoire::open(&root).unwrap();
    assert!(rep.contains(Section::WHITE, &start, &e4));
    assert!(rep.contains(Section::BLACK, &after_e4, &c5));
    assert_eq!(rep.get_comment(&after_e4).as_deref(), Some("Sicilian"));
    let record = rep.find_records(Section::WHITE, &start).next().unwrap();
    assert_eq!(record.learn, 777);
}

#[test]
fn create_keeps_existing_tables() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("main.rep");
    let start = Chess::default();
    let d4 = parse_uci(&start, "d2d4").unwrap();

    let mut rep = Repertoire::create(&root).unwrap();
    rep.append(Section::WHITE, &start, &d4, 1, 0).unwrap();
    rep.flush().unwrap();
    rep.close();

    let rep = Repertoire::create(&root).unwrap();
    assert_eq!(rep.stats().white_white, 1);
}

#[test]
fn missing_repertoire_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let result = Repertoire::open(dir.path().join("nowhere"));
    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn ragged_table_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("main.rep");
    Repertoire::create(&root).unwrap().close();

    fs::write(root.join("black").join("white"), [0u8; 17]).unwrap();
    let result = Repertoire::open(&root);
    assert!(matches!(result, Err(Error::Corrupt { len: 17, slot: 16, .. })));
}

#[test]
fn ragged_comment_file_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("main.rep");
    Repertoire::create(&root).unwrap().close();

    fs::write(root.join("comments"), vec![0u8; 300]).unwrap();
    assert!(matches!(
        Repertoire::open(&root),
        Err(Error::Corrupt { slot: 256, .. })
    ));
}
