use std::fs;
use std::path::Path;
use tempfile::TempDir;

use supportkb_core::config::Config;
use supportkb_core::error::Error;
use supportkb_core::defaults::default_knowledge_base;
use supportkb_core::knowledge::load_source;
use supportkb_core::KnowledgeLoader;

const CSV: &str = "Key,Problem,Keywords,Solutions,Category
login_issues,Cannot login,\"login, password\",\"Reset password
Check email\",Account Issues
wifi,No wifi,wifi;router,Reboot router;Call ISP,
,Orphan row,orphan,Do nothing,Misc
empty_solutions,Nothing to do,empty,,Misc
";

#[test]
fn csv_source_applies_row_policy() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kb.csv");
    fs::write(&path, CSV).unwrap();

    let kb = KnowledgeLoader::new(Some(path)).load();

    assert_eq!(kb.len(), 2, "blank key and empty solutions rows are skipped");
    let login = kb.get("login_issues").expect("login row");
    assert_eq!(login.keywords, vec!["login", "password"]);
    assert_eq!(login.solutions, vec!["Reset password", "Check email"]);
    assert_eq!(login.category, "Account Issues");
    let wifi = kb.get("wifi").expect("wifi row");
    assert_eq!(wifi.solutions, vec!["Reboot router", "Call ISP"]);
    assert_eq!(wifi.category, "General", "blank category defaults");
    assert_eq!(kb.keys().collect::<Vec<_>>(), vec!["login_issues", "wifi"]);
}

#[test]
fn headers_match_case_insensitively() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kb.csv");
    fs::write(&path, " KEY ,PROBLEM,KEYWORDS,SOLUTIONS,CATEGORY\nk1,p,a,s1,C\n").unwrap();
    let kb = load_source(&path).expect("parse");
    assert_eq!(kb.get("k1").map(|e| e.category.as_str()), Some("C"));
}

#[test]
fn zero_usable_rows_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kb.csv");
    fs::write(&path, "key,problem,keywords,solutions,category\na,p,k,,C\nb,p,k, ; ,C\n").unwrap();

    let kb = KnowledgeLoader::new(Some(path)).load();

    assert!(!kb.is_empty());
    assert_eq!(kb, default_knowledge_base());
}

#[test]
fn missing_or_malformed_source_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let missing = KnowledgeLoader::new(Some(tmp.path().join("nope.csv"))).load();
    assert_eq!(missing, default_knowledge_base());

    let bad_json = tmp.path().join("kb.json");
    fs::write(&bad_json, "{ not json").unwrap();
    assert!(load_source(&bad_json).is_err());
    assert_eq!(KnowledgeLoader::new(Some(bad_json)).load(), default_knowledge_base());

    let not_a_workbook = tmp.path().join("kb.xlsx");
    fs::write(&not_a_workbook, "binary").unwrap();
    assert!(load_source(&not_a_workbook).is_err());
    assert_eq!(KnowledgeLoader::new(Some(not_a_workbook)).load(), default_knowledge_base());

    let unsupported = tmp.path().join("kb.txt");
    fs::write(&unsupported, "key,problem\n").unwrap();
    let err = load_source(&unsupported).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::KnowledgeSource(_))), "{err}");
    assert_eq!(KnowledgeLoader::new(Some(unsupported)).load(), default_knowledge_base());

    assert_eq!(KnowledgeLoader::new(None).load(), default_knowledge_base());
}

#[test]
fn spreadsheet_source_reads_first_sheet() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/knowledge_base.xlsx");

    let kb = KnowledgeLoader::new(Some(path)).load();

    assert_eq!(kb.keys().collect::<Vec<_>>(), vec!["login_issues", "wifi", "42"]);
    let login = kb.get("login_issues").unwrap();
    assert_eq!(login.problem, "Cannot login to account");
    assert_eq!(login.keywords, vec!["login", "password", "account"]);
    assert_eq!(login.solutions, vec!["Reset your password", "Clear your browser cache"]);
    assert_eq!(login.category, "Account Issues");
    let wifi = kb.get("wifi").unwrap();
    assert_eq!(wifi.keywords, vec!["wifi", "router"]);
    assert_eq!(wifi.solutions, vec!["Reboot router", "Call your ISP"]);
    assert_eq!(wifi.category, "General", "empty cell defaults");
    assert_eq!(kb.get("42").unwrap().problem, "Numbered entry");
}

#[test]
fn json_rows_accept_lists_and_strings() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kb.json");
    fs::write(
        &path,
        r#"[
            {"Key": "gps", "Problem": "GPS drift", "Keywords": ["GPS", "Location"], "Solutions": ["Enable precise location", "Calibrate compass"], "Category": "Phone - GPS"},
            {"id": "sms", "title": "SMS failing", "tags": "sms; text", "steps": "Check APN\nRestart", "type": null},
            {"key": "nothing", "solutions": []}
        ]"#,
    )
    .unwrap();

    let kb = load_source(&path).expect("parse");

    assert_eq!(kb.len(), 2);
    assert_eq!(kb.get("gps").unwrap().keywords, vec!["gps", "location"]);
    let sms = kb.get("sms").unwrap();
    assert_eq!(sms.solutions, vec!["Check APN", "Restart"]);
    assert_eq!(sms.category, "General");
}

#[test]
fn config_files_merge_over_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[search]\ntop_k = 5\n[index]\npath = \"idx\"\n[knowledge]\nsource = \"kb.csv\"\n",
    )
    .unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[search]\nscore_threshold = 0.5\n").unwrap();

    let config = Config::load_for_env(tmp.path(), "test").expect("load");

    assert_eq!(config.search.top_k, 5);
    assert!((config.search.score_threshold - 0.5).abs() < f32::EPSILON);
    assert!(config.search.enabled, "untouched keys keep defaults");
    assert_eq!(config.index.path, tmp.path().join("idx"));
    assert_eq!(config.knowledge.source, Some(tmp.path().join("kb.csv")));
    assert!((config.keyword.acceptance_threshold - 0.2).abs() < f32::EPSILON);
}

#[test]
fn invalid_config_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[keyword]\nacceptance_threshold = 3.0\n").unwrap();
    assert!(Config::load_for_env(tmp.path(), "prod").is_err());
}
