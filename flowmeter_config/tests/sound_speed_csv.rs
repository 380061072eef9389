use std::fs::File;
use std::io::Write;

use flowmeter_config::{SoundSpeedRow, SoundSpeedTable, load_sound_speed_csv};
use rstest::rstest;
use tempfile::tempdir;

fn rows(points: &[(f64, f64)]) -> Vec<SoundSpeedRow> {
    points
        .iter()
        .map(|&(celsius, speed_mps)| SoundSpeedRow { celsius, speed_mps })
        .collect()
}

#[rstest]
fn table_from_increasing_rows() {
    let t = SoundSpeedTable::from_rows(rows(&[
        (0.0, 1403.0),
        (10.0, 1447.0),
        (20.0, 1481.0),
        (30.0, 1507.0),
    ]))
    .unwrap();
    assert_eq!(t.points.len(), 4);
    assert_eq!(t.points[2], (20.0, 1481.0));
}

#[rstest]
fn table_rejects_too_few_rows() {
    let err = SoundSpeedTable::from_rows(rows(&[(0.0, 1403.0), (10.0, 1447.0)]))
        .expect_err("two rows cannot back a cubic");
    assert!(format!("{err}").contains("at least 4 rows"));
}

#[rstest]
#[case(&[(0.0, 1403.0), (10.0, 1447.0), (10.0, 1450.0), (30.0, 1507.0)])]
#[case(&[(0.0, 1403.0), (20.0, 1481.0), (10.0, 1447.0), (30.0, 1507.0)])]
fn table_rejects_non_increasing_temperatures(#[case] points: &[(f64, f64)]) {
    let err = SoundSpeedTable::from_rows(rows(points)).expect_err("should fail");
    assert!(format!("{err}").contains("strictly increasing"));
}

#[rstest]
fn table_rejects_non_positive_speed() {
    let err = SoundSpeedTable::from_rows(rows(&[
        (0.0, 1403.0),
        (10.0, 0.0),
        (20.0, 1481.0),
        (30.0, 1507.0),
    ]))
    .expect_err("should fail");
    assert!(format!("{err}").contains("non-positive speed"));
}

#[rstest]
fn load_csv_with_valid_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("water.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "celsius,speed_mps").unwrap();
    for (c, v) in [(0, 1403), (5, 1427), (10, 1447), (20, 1481)] {
        writeln!(f, "{c}, {v}").unwrap();
    }
    drop(f);

    let t = load_sound_speed_csv(&path).unwrap();
    assert_eq!(t.points[1], (5.0, 1427.0));
}

#[rstest]
fn load_csv_rejects_bad_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "temp,speed").unwrap();
    writeln!(f, "0,1403").unwrap();
    drop(f);

    let err = load_sound_speed_csv(&path).expect_err("headers are strict");
    assert!(format!("{err}").contains("must have headers 'celsius,speed_mps'"));
}

#[rstest]
fn load_csv_reports_bad_row_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("row.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "celsius,speed_mps").unwrap();
    writeln!(f, "0,1403").unwrap();
    writeln!(f, "5,fast").unwrap();
    drop(f);

    let err = load_sound_speed_csv(&path).expect_err("non-numeric speed");
    assert!(format!("{err}").contains("invalid CSV row 3"));
}
