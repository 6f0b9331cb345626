mod common;

use covdiff::detect::Format;
use covdiff::error::CovdiffError;
use covdiff::ingest::load_report;
use covdiff::model::CoverageState;

/// Test the full `ingest::load_report()` pipeline: read file from disk, auto-detect format, parse.
#[test]
fn load_lcov_file_auto_detect() {
    let (_dir, path) = common::write_temp("coverage.lcov", common::BASE_LCOV);

    let (report, format) = load_report(&path, None).unwrap();

    assert_eq!(format, Format::Lcov);
    assert_eq!(report.len(), 2);
    let app = report.get_file("src/app.py").unwrap();
    assert_eq!(app.totals().lines, 4);
    assert_eq!(app.get(3).unwrap().state(), CoverageState::Miss);
}

#[test]
fn load_cobertura_file_auto_detect() {
    let xml = br#"<?xml version="1.0" ?>
<coverage version="7.4">
  <sources><source>/repo</source></sources>
  <packages><package name="src"><classes>
    <class name="app.py" filename="src/app.py">
      <lines>
        <line number="1" hits="1"/>
        <line number="2" hits="0"/>
      </lines>
    </class>
  </classes></package></packages>
</coverage>
"#;
    let (_dir, path) = common::write_temp("coverage.xml", xml);

    let (report, format) = load_report(&path, None).unwrap();

    assert_eq!(format, Format::Cobertura);
    let app = report.get_file("/repo/src/app.py").unwrap();
    assert_eq!(app.totals().hits, 1);
    assert_eq!(app.totals().misses, 1);
}

#[test]
fn load_json_file_auto_detect() {
    let json = br#"{"files": {"a.py": {"lines": {"1": {"coverage": 2}}}}}"#;
    let (_dir, path) = common::write_temp("report.json", json);

    let (report, format) = load_report(&path, None).unwrap();

    assert_eq!(format, Format::Json);
    let file = report.get_file("a.py").unwrap();
    assert_eq!(file.get(1).unwrap().state(), CoverageState::Partial);
}

#[test]
fn load_with_format_override() {
    // LCOV content with an extension that does not say so
    let (_dir, path) = common::write_temp("data.txt", b"SF:/src/lib.rs\nend_of_record\n");

    assert!(load_report(&path, None).is_err());
    let (report, format) = load_report(&path, Some("lcov")).unwrap();
    assert_eq!(format, Format::Lcov);
    assert_eq!(report.len(), 1);
}

#[test]
fn load_unknown_format_fails() {
    let (_dir, path) = common::write_temp("random.dat", b"hello world this is not coverage data");

    let result = load_report(&path, None);
    assert!(matches!(result, Err(CovdiffError::UnknownFormat)));
}

#[test]
fn load_bad_format_override_fails() {
    let (_dir, path) = common::write_temp("coverage.lcov", common::BASE_LCOV);

    let result = load_report(&path, Some("jacoco"));
    let err = result.unwrap_err().to_string();
    assert!(err.contains("Unknown format"), "Error: {err}");
}

#[test]
fn load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_report(&dir.path().join("nope.lcov"), None);
    assert!(matches!(result, Err(CovdiffError::Io(_))));
}

#[test]
fn load_empty_coverage_file() {
    let (_dir, path) = common::write_temp("empty.lcov", b"TN:test\n");

    let (report, _format) = load_report(&path, None).unwrap();
    assert!(report.is_empty());
}
