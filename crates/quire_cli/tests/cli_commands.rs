//! Integration tests for CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a command for the quire CLI
fn quire_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_quire"))
}

/// Creates a project with a config and the given templates under `views/`.
fn project(templates: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(".quire.jsonc"),
        r#"{ "root": "views", "out_dir": "build" }"#,
    )
    .unwrap();

    for (path, content) in templates {
        write(temp_dir.path(), &format!("views/{path}.html"), content);
    }
    temp_dir
}

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

mod init_command {
    use super::*;

    #[test]
    fn creates_new_config_file() {
        let temp_dir = TempDir::new().unwrap();

        quire_cmd()
            .current_dir(temp_dir.path())
            .arg("init")
            .assert()
            .success()
            .stderr(predicate::str::contains("Created .quire.jsonc"));

        let content = fs::read_to_string(temp_dir.path().join(".quire.jsonc")).unwrap();
        assert!(content.contains("\"root\""));
        assert!(content.contains("\"directives\""));
    }

    #[test]
    fn fails_when_config_exists_without_force() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".quire.jsonc"), "{}").unwrap();

        quire_cmd()
            .current_dir(temp_dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn overwrites_config_with_force() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".quire.jsonc");
        fs::write(&config_path, r#"{"root": "custom"}"#).unwrap();

        quire_cmd()
            .current_dir(temp_dir.path())
            .args(["init", "--force"])
            .assert()
            .success();

        let content = fs::read_to_string(config_path).unwrap();
        assert!(!content.contains("custom"));
        assert!(content.contains("out_dir"));
    }
}

mod compile_command {
    use super::*;

    #[test]
    fn compiles_all_templates() {
        let temp_dir = project(&[
            ("layout", "<html><block:body/></html>"),
            ("pages/home", "<extends:layout/><block:body>Hi {{ $name }}</block:body>"),
        ]);

        quire_cmd()
            .current_dir(temp_dir.path())
            .arg("compile")
            .assert()
            .success()
            .stdout(predicate::str::contains("Compiled 2 templates, 0 failed"));

        let home = fs::read_to_string(temp_dir.path().join("build/pages/home.php")).unwrap();
        assert!(home.starts_with("<html>Hi "));
        assert!(home.contains("htmlspecialchars((string) $name"));
        assert!(home.ends_with("</html>"));
        assert!(temp_dir.path().join("build/layout.php").exists());
    }

    #[test]
    fn compiles_selected_pattern() {
        let temp_dir = project(&[("a", "<b>a</b>"), ("sub/b", "<b>b</b>")]);

        quire_cmd()
            .current_dir(temp_dir.path())
            .args(["compile", "sub/*.html"])
            .assert()
            .success();

        assert!(temp_dir.path().join("build/sub/b.php").exists());
        assert!(!temp_dir.path().join("build/a.php").exists());
    }

    #[test]
    fn honors_out_dir_override() {
        let temp_dir = project(&[("a", "<b>a</b>")]);

        quire_cmd()
            .current_dir(temp_dir.path())
            .args(["compile", "--out-dir", "public"])
            .assert()
            .success();

        let content = fs::read_to_string(temp_dir.path().join("public/a.php")).unwrap();
        assert_eq!(content, "<b>a</b>");
    }

    #[test]
    fn writes_source_map() {
        let temp_dir = project(&[("a", "<p>\n  x\n</p>")]);

        quire_cmd()
            .current_dir(temp_dir.path())
            .args(["compile", "--source-map"])
            .assert()
            .success();

        let map = fs::read_to_string(temp_dir.path().join("build/a.php.map.json")).unwrap();
        let map: serde_json::Value = serde_json::from_str(&map).unwrap();
        assert_eq!(map["paths"], serde_json::json!(["a"]));
        assert_eq!(map["lines"][0]["line"], 1);
        assert_eq!(map["lines"][1]["line"], 2);
    }

    #[test]
    fn reports_failures_with_exit_code() {
        let temp_dir = project(&[("ok", "<b>ok</b>"), ("broken", "<p>\n  @bogus(1)</p>")]);

        quire_cmd()
            .current_dir(temp_dir.path())
            .arg("compile")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Directive error"))
            .stdout(predicate::str::contains("broken:2:3"))
            .stdout(predicate::str::contains("Compiled 1 templates, 1 failed"));

        assert!(temp_dir.path().join("build/ok.php").exists());
        assert!(!temp_dir.path().join("build/broken.php").exists());
    }

    #[test]
    fn outputs_json() {
        let temp_dir = project(&[("page", "<extends:missing/>")]);

        let output = quire_cmd()
            .current_dir(temp_dir.path())
            .args(["compile", "--format", "json"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report[0]["path"], "page");
        assert!(report[0]["error"].as_str().unwrap().starts_with("Extends error"));
        assert_eq!(report[0]["location"]["line"], 1);
        assert!(
            report[0]["causes"][0]
                .as_str()
                .unwrap()
                .contains("`missing` not found")
        );
    }

    #[test]
    fn uses_explicit_config() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "conf/quire.json", r#"{ "root": "../src" }"#);
        write(temp_dir.path(), "src/a.html", "<i>a</i>");

        quire_cmd()
            .current_dir(temp_dir.path())
            .args(["--config", "conf/quire.json", "compile"])
            .assert()
            .success();

        assert!(temp_dir.path().join("conf/compiled/a.php").exists());
    }

    #[test]
    fn rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".quire.json"), r#"{ "roots": "x" }"#).unwrap();

        quire_cmd()
            .current_dir(temp_dir.path())
            .arg("compile")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Config validation failed"));
    }
}

mod inspect_commands {
    use super::*;

    #[test]
    fn prints_tokens() {
        let temp_dir = project(&[("a", "<b>{{ $x }}</b>")]);

        quire_cmd()
            .current_dir(temp_dir.path())
            .args(["tokens", "a"])
            .assert()
            .success()
            .stdout(predicate::str::contains("HTML:OPEN_TAG"))
            .stdout(predicate::str::contains("DYNAMIC:OPEN_TAG"))
            .stdout(predicate::str::contains("DYNAMIC:BODY"))
            .stdout(predicate::str::contains("\" $x \""));
    }

    #[test]
    fn prints_ast() {
        let temp_dir = project(&[("a", "<b>x</b>")]);

        let output = quire_cmd()
            .current_dir(temp_dir.path())
            .args(["ast", "a"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let ast: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert!(ast["nodes"].is_array());
        assert!(String::from_utf8_lossy(&output.stdout).contains("\"name\": \"b\""));
    }

    #[test]
    fn prints_transformed_ast() {
        let temp_dir = project(&[
            ("base", "<main><block:body/></main>"),
            ("page", "<extends:base/><block:body>x</block:body>"),
        ]);

        quire_cmd()
            .current_dir(temp_dir.path())
            .args(["ast", "page", "--transformed"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"name\": \"main\""));
    }

    #[test]
    fn fails_on_missing_template() {
        let temp_dir = project(&[]);

        quire_cmd()
            .current_dir(temp_dir.path())
            .args(["ast", "missing"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Template `missing` not found"));
    }
}
