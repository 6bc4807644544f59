//! Robustness tests: broken units, missing or ambiguous helpers, odd
//! line endings. A bad unit must never take the rest of the corpus down.

use deparanoid::deobfuscator::{
    deobfuscate_directory, discover, extract_strings, DeobfuscatorConfig,
};
use std::fs;
use std::path::{Path, PathBuf};

const HELPER: &str = r#".class public final Lo/Deobf;
.super Ljava/lang/Object;

.field private static chunks:[Ljava/lang/String;

.method static constructor <clinit>()V
    .registers 3
    const/4 v0, 0x1
    new-array v0, v0, [Ljava/lang/String;
    const/4 v1, 0x0
    const-string v2, "\u0003foo\u0003bar"
    aput-object v2, v0, v1
    sput-object v0, Lo/Deobf;->chunks:[Ljava/lang/String;
    return-void
.end method

.method public static getString(J)Ljava/lang/String;
    .registers 8
    sget-object v2, Lo/Deobf;->chunks:[Ljava/lang/String;
    return-object v3
.end method
"#;

const MAIN: &str = ".class public Lcom/app/Main;
.super Ljava/lang/Object;

.method public static greet()V
    .registers 2
    const-wide v0, 0x0
    invoke-static {v0, v1}, Lo/Deobf;->getString(J)Ljava/lang/String;
    move-result-object v0
    return-void
.end method
";

fn write_unit(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

fn error_text(root: &Path) -> String {
    let err = discover(root, &DeobfuscatorConfig::default()).unwrap_err();
    format!("{err:#}")
}

// =========================================================================
// Discovery failures stop the run
// =========================================================================

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(error_text(dir.path()).contains("no .smali files"));
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(deobfuscate_directory(&missing, &DeobfuscatorConfig::default()).is_err());
}

#[test]
fn test_no_helper() {
    let dir = tempfile::tempdir().unwrap();
    let main = write_unit(dir.path(), "Main.smali", MAIN);
    assert!(error_text(dir.path()).contains("no string recovery method found"));

    assert!(deobfuscate_directory(dir.path(), &DeobfuscatorConfig::default()).is_err());
    assert_eq!(fs::read_to_string(main).unwrap(), MAIN);
}

#[test]
fn test_ambiguous_helpers() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "o/Deobf.smali", HELPER);
    write_unit(dir.path(), "o/Copy.smali", &HELPER.replace("Lo/Deobf;", "Lo/Copy;"));
    assert!(error_text(dir.path()).contains("found 2 candidate"));
}

#[test]
fn test_unassigned_chunk_slot() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "o/Deobf.smali", &HELPER.replace("const/4 v0, 0x1", "const/4 v0, 0x2"));
    assert!(error_text(dir.path()).contains("chunk slot 1"));
}

#[test]
fn test_helper_without_stored_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let helper = HELPER.replace("    sput-object v0, Lo/Deobf;->chunks:[Ljava/lang/String;\n", "");
    write_unit(dir.path(), "o/Deobf.smali", &helper);
    assert!(error_text(dir.path()).contains("no chunk values found"));
}

// =========================================================================
// Unit failures are isolated
// =========================================================================

#[test]
fn test_malformed_class_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "o/Deobf.smali", HELPER);
    let main = write_unit(dir.path(), "com/app/Main.smali", MAIN);
    let broken = write_unit(dir.path(), "com/app/Broken.smali", ".class public\n");

    let summary = deobfuscate_directory(dir.path(), &DeobfuscatorConfig::default()).unwrap();
    assert_eq!(summary.units, 3);
    assert_eq!(summary.rewritten, 1);
    assert_eq!(summary.failed(), 1);
    assert!(summary.problems[0].0.ends_with("Broken.smali"));

    assert!(fs::read_to_string(main).unwrap().contains("const-string v0, \"foo\""));
    assert_eq!(fs::read_to_string(broken).unwrap(), ".class public\n");
}

#[test]
fn test_unknown_register_leaves_unit_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "o/Deobf.smali", HELPER);
    // The first call is fine; the second one reads a register nobody set.
    let source = MAIN.replace(
        "    return-void",
        "    invoke-static {v4, v5}, Lo/Deobf;->getString(J)Ljava/lang/String;\n    move-result-object v4\n    return-void",
    );
    let main = write_unit(dir.path(), "com/app/Main.smali", &source);

    let summary = deobfuscate_directory(dir.path(), &DeobfuscatorConfig::default()).unwrap();
    assert_eq!(summary.rewritten, 0);
    assert_eq!(summary.failed(), 1);
    assert!(summary.problems[0].1.contains("register not found"));
    assert_eq!(fs::read_to_string(&main).unwrap(), source);

    let report = extract_strings(dir.path(), &DeobfuscatorConfig::default()).unwrap();
    assert!(report.strings.is_empty());
    assert_eq!(report.problems.len(), 1);
}

#[test]
fn test_unrecoverable_identifier_fails_unit() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "o/Deobf.smali", HELPER);
    let source = MAIN.replace("0x0", "-0x8000000000000000L");
    let main = write_unit(dir.path(), "Main.smali", &source);

    let summary = deobfuscate_directory(dir.path(), &DeobfuscatorConfig::default()).unwrap();
    assert_eq!(summary.failed(), 1);
    assert!(summary.problems[0].1.contains("negative start index"));
    assert_eq!(fs::read_to_string(main).unwrap(), source);
}

#[test]
fn test_parameter_fed_call_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "o/Deobf.smali", HELPER);
    let source = MAIN.replace(
        "    return-void",
        "    invoke-static {p0, p1}, Lo/Deobf;->getString(J)Ljava/lang/String;\n    move-result-object v1\n    return-void",
    );
    let main = write_unit(dir.path(), "Main.smali", &source);

    let summary = deobfuscate_directory(dir.path(), &DeobfuscatorConfig::default()).unwrap();
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.strings, 1);
    let text = fs::read_to_string(main).unwrap();
    assert!(text.contains("const-string v0, \"foo\""));
    assert!(text.contains("invoke-static {p0, p1}"));
}

// =========================================================================
// Input shapes
// =========================================================================

#[test]
fn test_crlf_units() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "o/Deobf.smali", &HELPER.replace('\n', "\r\n"));
    let main = write_unit(dir.path(), "Main.smali", &MAIN.replace('\n', "\r\n"));

    let summary = deobfuscate_directory(dir.path(), &DeobfuscatorConfig::default()).unwrap();
    assert_eq!(summary.strings, 1);

    let text = fs::read_to_string(main).unwrap();
    assert!(text.contains("    const-string v0, \"foo\"\r\n"));
    assert_eq!(text.matches("\r\n").count(), MAIN.matches('\n').count());
    assert!(!text.replace("\r\n", "").contains('\n'));
}

#[test]
fn test_non_smali_files_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "o/Deobf.smali", HELPER);
    write_unit(dir.path(), "Main.smali", MAIN);
    let notes = write_unit(dir.path(), "Main.smali.bak", MAIN);
    write_unit(dir.path(), "AndroidManifest.xml", "<manifest/>\n");

    let summary = deobfuscate_directory(dir.path(), &DeobfuscatorConfig::default()).unwrap();
    assert_eq!(summary.units, 2);
    assert_eq!(fs::read_to_string(notes).unwrap(), MAIN);
}
