use lox_cli::{CheckOptions, CliError, OutputFormat, check_source, parse_source, tokens_source};

fn options() -> CheckOptions {
    CheckOptions::default()
}

#[test]
fn well_typed_program_reports_nothing() {
    let report = check_source("ok.lox", "var a = 1;\nprint a + 2;\n", options()).expect("check runs");
    assert!(!report.failed);
    assert!(report.stdout.is_empty());
    assert!(report.stderr.is_empty());
}

#[test]
fn type_errors_fail_with_rendered_diagnostics() {
    let report = check_source("bad.lox", "var a = 1;\na = \"x\";\n", options()).expect("check runs");
    assert!(report.failed);
    insta::assert_snapshot!(report.stderr.trim_end(), @r#"
    error[E3001] bad.lox:2:1
      Number != String
      |
    2 | a = "x";
      | ^^^^^^^ Number != String
    "#);
}

#[test]
fn types_flag_lists_every_expression() {
    let mut options = options();
    options.show_types = true;
    let report =
        check_source("types.lox", "var a = 1;\nprint a + 2;\n", options).expect("check runs");
    assert!(!report.failed);
    let lines: Vec<&str> = report.stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "1:9  1  : Number",
            "2:7  (+ a 2)  : Number",
            "2:7  a  : Number",
            "2:11  2  : Number",
        ]
    );
}

#[test]
fn ambiguity_warnings_can_be_silenced() {
    let source = "print true or 1;\n";
    let loud = check_source("amb.lox", source, options()).expect("check runs");
    assert!(!loud.failed);
    assert!(loud.stderr.contains("warning[W3100]"));

    let mut quiet = options();
    quiet.report_ambiguity = false;
    let report = check_source("amb.lox", source, quiet).expect("check runs");
    assert!(report.stderr.is_empty());
}

#[test]
fn json_report_carries_types_and_diagnostics() {
    let mut options = options();
    options.format = OutputFormat::Json;
    let report =
        check_source("bad.lox", "print 1 + 2;\nvar a = 1;\na = \"x\";\n", options).expect("check runs");
    assert!(report.failed);
    assert!(report.stderr.is_empty());
    let json: serde_json::Value = serde_json::from_str(&report.stdout).expect("valid json");
    assert_eq!(json["path"], "bad.lox");
    assert_eq!(json["ok"], false);
    let codes: Vec<&str> = json["diagnostics"]
        .as_array()
        .expect("diagnostics array")
        .iter()
        .filter_map(|d| d["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["E3001"]);
    assert_eq!(json["diagnostics"][0]["severity"], "error");
    assert_eq!(json["diagnostics"][0]["span"]["start"]["line"], 3);
    assert_eq!(json["types"][0]["expr"], "(+ 1 2)");
    assert_eq!(json["types"][0]["type"], "Number");
}

#[test]
fn syntax_errors_skip_type_checking() {
    let report =
        check_source("syntax.lox", "var a = ;\na = \"x\" + 1;\n", options()).expect("check runs");
    assert!(report.failed);
    assert!(report.stderr.contains("error[E1101]"));
    assert!(!report.stderr.contains("E3001"));
}

#[test]
fn undeclared_names_stop_the_checker() {
    let error = check_source("free.lox", "print missing;\n", options()).unwrap_err();
    assert!(matches!(error, CliError::Check(_)));
    assert_eq!(
        error.to_string(),
        "type checker stopped: no binding for `missing` at 1:7"
    );
}

#[test]
fn parse_prints_the_tree() {
    let report = parse_source("p.lox", "print 1 + 2;\nvar x = !true;\n", false);
    assert!(!report.failed);
    assert_eq!(report.stdout, "(print (+ 1 2))\n(var x (! true))\n");
}

#[test]
fn tokens_prints_one_per_line() {
    let report = tokens_source("t.lox", "var x = \"hi\";", false);
    assert!(!report.failed);
    insta::assert_snapshot!(report.stdout.trim_end(), @r#"
    1:1 Var var
    1:5 Identifier x
    1:7 Equal =
    1:9 String "hi"
    1:13 Semicolon ;
    1:14 Eof
    "#);
}

#[test]
fn lexer_errors_fail_the_tokens_command() {
    let report = tokens_source("t.lox", "var @;", false);
    assert!(report.failed);
    assert!(report.stderr.contains("error[E1001]"));
    assert!(report.stdout.ends_with("Eof\n"));
}
