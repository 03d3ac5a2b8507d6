use qt_core::config::Config;

#[test]
fn default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.general.log_level, "info");
    assert_eq!(cfg.general.log_format, "text");
    assert_eq!(cfg.memory.path, "four_agent_memory.json");
    assert_eq!(cfg.llm.model, "gpt-4o-mini");
    assert_eq!(cfg.llm.api_key_env, "OPENAI_API_KEY");
    assert_eq!(cfg.workflow.phase_message_limit, 6);
    assert_eq!(cfg.workflow.iterative_cycles, 3);
    assert_eq!(cfg.workflow.collaborative.planning, 5);
    assert_eq!(cfg.workflow.collaborative.execution, 10);
    assert_eq!(cfg.workflow.collaborative.review, 10);
    assert_eq!(cfg.workflow.collaborative.summary, 5);
    cfg.validate().expect("defaults validate");
}

#[test]
fn config_roundtrip() {
    let cfg = Config::default();
    let toml_str = cfg.to_toml().expect("serialize to toml");
    assert!(toml_str.contains("gpt-4o-mini"));

    let parsed: Config = toml::from_str(&toml_str).expect("parse toml back");
    assert_eq!(parsed.memory.path, cfg.memory.path);
    assert_eq!(parsed.llm.max_tokens, cfg.llm.max_tokens);
    assert_eq!(parsed.workflow.iterative_cycles, cfg.workflow.iterative_cycles);
    parsed.validate().expect("config validates");
}

#[test]
fn config_partial_toml() {
    let partial = r#"
[memory]
path = "/var/lib/quartet/memory.json"

[workflow.collaborative]
execution = 4
"#;
    let cfg: Config = toml::from_str(partial).expect("parse partial");
    assert_eq!(cfg.memory.path, "/var/lib/quartet/memory.json");
    assert_eq!(cfg.workflow.collaborative.execution, 4);
    // defaults should fill in the rest
    assert_eq!(cfg.workflow.collaborative.review, 10);
    assert_eq!(cfg.llm.model, "gpt-4o-mini");
    cfg.validate().expect("config validates");
}

#[test]
fn load_from_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[llm]\nmodel = \"local-model\"\nbase_url = \"http://127.0.0.1:8080\"\n")
        .unwrap();
    let cfg = Config::load_from(&path).expect("load");
    assert_eq!(cfg.llm.model, "local-model");
    assert_eq!(cfg.llm.base_url, "http://127.0.0.1:8080");
}

#[test]
fn load_from_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let err = Config::load_from(dir.path().join("nope.toml")).expect_err("missing file");
    assert!(err.to_string().starts_with("io:"));
}

#[test]
fn malformed_toml_is_parse_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[llm\nmodel = ").unwrap();
    let err = Config::load_from(&path).expect_err("malformed");
    assert!(err.to_string().starts_with("parse:"));
}

#[test]
fn zero_cycles_fails_validation() {
    let mut cfg = Config::default();
    cfg.workflow.iterative_cycles = 0;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("iterative_cycles"));
}

#[test]
fn zero_collaborative_budget_fails_validation() {
    let mut cfg = Config::default();
    cfg.workflow.collaborative.summary = 0;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("collaborative.summary"));
}

#[test]
fn unknown_log_format_fails_validation() {
    let mut cfg = Config::default();
    cfg.general.log_format = "xml".into();
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("log_format"));
}

#[test]
fn out_of_range_temperature_fails_validation() {
    let mut cfg = Config::default();
    cfg.llm.temperature = 3.5;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("temperature"));
}
