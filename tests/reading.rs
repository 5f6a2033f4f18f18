use std::fs;
use std::path::Path;

use bulkdeck::cards::Grid;
use bulkdeck::{
    CardOrder, DeckConfig, DeckError, DuplicatePolicy, Model, ReadOptions, StructuralKind,
    WriteOptions,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn include_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "root.bdf", "GRID,1,,0.,0.,0.\nINCLUDE 'parts/b.bdf'\nGRID,4,,3.,0.,0.\n");
    write(dir.path(), "parts/b.bdf", "GRID,2,,1.,0.,0.\nINCLUDE 'c.bdf'\nGRID,5,,4.,0.,0.\n");
    write(dir.path(), "parts/c.bdf", "GRID,3,,2.,0.,0.\n");
    dir
}

#[test]
fn includes_flatten_depth_first() {
    let dir = include_tree();
    let model = Model::read(dir.path().join("root.bdf"), &ReadOptions::default()).unwrap();
    let grids = model.container::<Grid>().unwrap();
    assert_eq!(grids.len(), 5);

    let deepest = grids.location(3).unwrap();
    assert!(deepest.path.ends_with("c.bdf"));
    assert_eq!((deepest.line, deepest.depth), (1, 2));
    assert_eq!(grids.location(4).unwrap().depth, 0);

    let text = model
        .write(&WriteOptions::default().with_order(CardOrder::Interspersed))
        .unwrap();
    let order: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with("GRID"))
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(order, vec!["1", "2", "3", "5", "4"]);
}

#[test]
fn missing_include_names_the_including_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "root.bdf", "GRID,1,,0.,0.,0.\nINCLUDE 'gone.bdf'\n");
    let err = Model::read(dir.path().join("root.bdf"), &ReadOptions::default()).unwrap_err();
    match &err {
        DeckError::Io { path, chain, .. } => {
            assert!(path.ends_with("gone.bdf"));
            assert_eq!(chain.len(), 1);
            assert_eq!(chain[0].line, 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("root.bdf:2"));
}

#[test]
fn self_inclusion_is_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.bdf", "INCLUDE 'b.bdf'\n");
    write(dir.path(), "b.bdf", "GRID,1,,0.,0.,0.\nINCLUDE 'a.bdf'\n");
    let err = Model::read(dir.path().join("a.bdf"), &ReadOptions::default()).unwrap_err();
    match err {
        DeckError::Structural { kind, location, .. } => {
            assert_eq!(kind, StructuralKind::IncludeCycle);
            assert!(location.path.ends_with("b.bdf"));
            assert_eq!(location.line, 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn duplicates_follow_the_policy() {
    let deck = "GRID,1,,0.,0.,0.\nGRID,1,,9.,0.,0.\n";
    let err = Model::read_str(deck, &ReadOptions::default()).unwrap_err();
    match err {
        DeckError::DuplicateIdentifier { keyword, id, location } => {
            assert_eq!((keyword.as_str(), id), ("GRID", 1));
            assert_eq!(location.map(|l| l.line), Some(2));
        }
        other => panic!("unexpected error {other:?}"),
    }

    let options = ReadOptions::default().with_duplicate_policy(DuplicatePolicy::LastWriteWins);
    let model = Model::read_str(deck, &options).unwrap();
    assert_eq!(model.get::<Grid>(1).unwrap().xyz[0], 9.0);
}

#[test]
fn bad_fields_report_their_source_line() {
    let err = Model::read_str("GRID,1,,0.,0.,0.\nGRID,2,,abc,0.,0.\n", &ReadOptions::default()).unwrap_err();
    match err {
        DeckError::InvalidField { location, keyword, position, .. } => {
            assert_eq!(keyword, "GRID");
            assert_eq!(position, 3);
            assert_eq!(location.map(|l| l.line), Some(2));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn config_file_drives_read_and_write() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "bulkdeck.toml",
        "[read]\nduplicate_policy = \"last-write-wins\"\n\n[write]\nfield_width = \"free\"\nenddata = \"force-present\"\n",
    );
    let config = DeckConfig::from_file(dir.path().join("bulkdeck.toml")).unwrap();
    let model = Model::read_str("GRID,1,,0.,0.,0.\nGRID,1,,1.,0.,0.\n", &config.read).unwrap();
    let text = model.write(&config.write).unwrap();
    assert!(text.contains("\nGRID,1,,1.,0.,0.\n"));
    assert!(text.ends_with("ENDDATA\n"));
}

#[test]
fn written_file_reads_back() {
    let dir = include_tree();
    let model = Model::read(dir.path().join("root.bdf"), &ReadOptions::default()).unwrap();
    let out = dir.path().join("flat.bdf");
    model.write_file(&out, &WriteOptions::default()).unwrap();
    let reread = Model::read(&out, &ReadOptions::default()).unwrap();
    assert_eq!(reread.stats(), model.stats());
    assert_eq!(reread.digest(&WriteOptions::default()).unwrap(), model.digest(&WriteOptions::default()).unwrap());
}

#[test]
fn bulk_only_deck_read_without_punch_reports_where_it_ended() {
    let err = Model::read_str("GRID,1,,0.,0.,0.\n", &ReadOptions::default().with_punch(false))
        .unwrap_err();
    match err {
        DeckError::Structural { kind, location, .. } => {
            assert_eq!(kind, StructuralKind::UnterminatedSection);
            assert_eq!(location.line, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
}
