use turbotests::config::Config;

#[test]
fn test_default_config_values() {
    let config = Config::default();

    // Defaults target an RSpec suite run through bundler
    assert_eq!(config.general.processes, "auto");
    assert_eq!(config.general.default_path, "spec");
    assert_eq!(config.general.file_suffix, "_spec.rb");
    assert!(config.general.runtime_log.is_none());
    assert_eq!(config.worker.command, ["bundle", "exec", "rspec"]);
    assert_eq!(
        config.worker.format_args,
        ["--format", "TurboTests::JsonRowsFormatter"]
    );
    assert_eq!(config.worker.env_var, "TEST_ENV_NUMBER");
}

#[test]
fn test_init_config_writes_parsable_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(".turbotestsrc");

    turbotests::commands::handle_init_config(&path).expect("init config");

    let written = Config::load_from_file(&path).expect("load written config");
    assert_eq!(written.worker, Config::default().worker);
    assert_eq!(written.general.default_path, "spec");
}
