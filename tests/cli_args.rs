use awful_headlines::cli::Cli;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn no_output_flags_prints_to_stdout() {
    let cli = Cli::try_parse_from(["awful_headlines"]).unwrap();
    assert!(!cli.refresh);
    assert!(cli.prints_to_stdout());
}

#[test]
fn json_output_with_explicit_stdout() {
    let cli = Cli::try_parse_from([
        "awful_headlines",
        "--json-output-dir",
        "/srv/news/json",
        "--stdout",
        "--config",
        "/etc/awful_headlines.yaml",
    ])
    .unwrap();
    assert_eq!(cli.json_output_dir.as_deref(), Some("/srv/news/json"));
    assert_eq!(cli.config, Some(PathBuf::from("/etc/awful_headlines.yaml")));
    assert!(cli.prints_to_stdout());
}

#[test]
fn unknown_flag_is_rejected() {
    assert!(Cli::try_parse_from(["awful_headlines", "--markdown-output-dir", "x"]).is_err());
}
