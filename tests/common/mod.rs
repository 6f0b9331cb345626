use std::path::PathBuf;

use tempfile::TempDir;

/// Write `contents` to `name` inside a fresh temporary directory.
/// The caller must hold onto `TempDir` to keep the file alive.
pub fn write_temp(name: &str, contents: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

/// Base coverage for `src/app.py`: a four-line function with line 3 missed.
#[allow(dead_code)]
pub const BASE_LCOV: &[u8] = b"\
TN:
SF:src/app.py
DA:1,1
DA:2,1
DA:3,0
DA:4,1
end_of_record
SF:src/util.py
DA:1,0
DA:2,1
end_of_record
";

/// Head coverage after inserting two lines after line 2 of `src/app.py`.
/// The old line 3 (now 5) became covered; one inserted line is missed.
#[allow(dead_code)]
pub const HEAD_LCOV: &[u8] = b"\
TN:
SF:src/app.py
DA:1,1
DA:2,1
DA:3,1
DA:4,0
DA:5,1
DA:6,1
end_of_record
SF:src/util.py
DA:1,0
DA:2,1
end_of_record
";

#[allow(dead_code)]
pub const DIFF: &str = "\
diff --git a/src/app.py b/src/app.py
index 1111111..2222222 100644
--- a/src/app.py
+++ b/src/app.py
@@ -2,0 +3,2 @@ def main():
+    value = compute()
+    log(value)
";

#[allow(dead_code)]
pub const HEAD_SOURCE: &str = "\
def main():
    setup()
    value = compute()
    log(value)
    teardown()
    return 0
";
