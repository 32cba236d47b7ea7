use std::fs;

use collector_core::{AppId, ProgressSet, Schema};
use collector_engine::{load_progress, load_rows, read_stats_input, ResumeError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn missing_and_empty_artifacts_yield_empty_progress() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.csv");
    let progress: ProgressSet<AppId> = load_progress(&missing, "appid").unwrap();
    assert!(progress.is_empty());

    let empty = temp.path().join("empty.csv");
    fs::write(&empty, "").unwrap();
    let progress: ProgressSet<AppId> = load_progress(&empty, "appid").unwrap();
    assert!(progress.is_empty());
}

#[test]
fn unparseable_identifiers_are_left_out() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("export.csv");
    fs::write(
        &path,
        "appid,name\n10,Ten\n20,Twenty\nabc,Broken\n,Blank\n30.5,Fraction\n40,\"Forty, quoted\"\n",
    )
    .unwrap();

    let progress: ProgressSet<AppId> = load_progress(&path, "appid").unwrap();
    assert_eq!(progress.len(), 3);
    for id in [10, 20, 40] {
        assert!(progress.contains(&id));
    }
}

#[test]
fn identifier_column_is_found_by_name() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("export.csv");
    fs::write(&path, "name,appid\nTen,10\nShort\n").unwrap();

    let progress: ProgressSet<AppId> = load_progress(&path, "appid").unwrap();
    assert_eq!(progress.len(), 1);
    assert!(progress.contains(&10));

    let no_column: ProgressSet<AppId> = load_progress(&path, "id").unwrap();
    assert!(no_column.is_empty());
}

#[test]
fn string_identifiers_are_supported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("export.csv");
    fs::write(&path, "slug\nalpha\nbeta\n").unwrap();

    let progress: ProgressSet<String> = load_progress(&path, "slug").unwrap();
    assert!(progress.contains(&"alpha".to_string()));
    assert!(progress.contains(&"beta".to_string()));
}

#[test]
fn prior_rows_are_projected_and_deduplicated() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stats.csv");
    fs::write(
        &path,
        "name,appid,old_column\nTen,10,x\nBroken,zz,y\nTen again,10,z\nTwenty,20,\n",
    )
    .unwrap();

    let schema = Schema::new(["appid", "name", "owners"], "appid").unwrap();
    let rows = load_rows::<AppId>(&path, &schema).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].to_record(), vec!["10", "Ten", ""]);
    assert_eq!(rows[1].to_record(), vec!["20", "Twenty", ""]);
}

#[test]
fn stats_input_requires_the_identifier_column() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("input.csv");
    fs::write(&path, "name\nTen\n").unwrap();

    let err = read_stats_input(&path, "appid").unwrap_err();
    assert!(matches!(err, ResumeError::MissingColumn { .. }));

    let missing = temp.path().join("missing.csv");
    let err = read_stats_input(&missing, "appid").unwrap_err();
    assert!(matches!(err, ResumeError::EmptyInput(_)));
}

#[test]
fn stats_input_skips_records_without_usable_ids() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("input.csv");
    fs::write(&path, "appid,name\n10,Ten\nnope,Bad\n20,Twenty\n").unwrap();

    let input = read_stats_input(&path, "appid").unwrap();
    assert_eq!(input.fields, vec!["appid".to_string(), "name".to_string()]);
    let ids: Vec<AppId> = input.records.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![10, 20]);
}

#[test]
fn unterminated_last_record_is_not_counted_as_done() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("export.csv");

    fs::write(&path, "appid,name\n10,Ten\n20,Twe").unwrap();
    let progress: ProgressSet<AppId> = load_progress(&path, "appid").unwrap();
    assert_eq!(progress.len(), 1);
    assert!(progress.contains(&10));

    fs::write(&path, "appid,name\n10,Ten\n20,\"Twenty\nthirty,\n30,Thirty\n").unwrap();
    let progress: ProgressSet<AppId> = load_progress(&path, "appid").unwrap();
    assert_eq!(progress.len(), 1);
    assert!(!progress.contains(&20));
    assert!(!progress.contains(&30));
}
