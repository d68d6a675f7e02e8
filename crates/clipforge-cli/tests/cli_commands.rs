//! End-to-end dispatch against a temporary project directory.

use std::fs;
use std::path::Path;

use clap::Parser;
use clipforge_cli::{Cli, CliContext, bootstrap, dispatch};
use tempfile::TempDir;

fn context(dir: &Path, json: bool) -> CliContext {
    let mut args = vec!["clipforge", "-C", dir.to_str().unwrap(), "list"];
    if json {
        args.push("--json");
    }
    bootstrap(&Cli::parse_from(args)).unwrap()
}

fn command(args: &[&str]) -> clipforge_cli::Commands {
    let mut full = vec!["clipforge"];
    full.extend_from_slice(args);
    Cli::parse_from(full).command.unwrap()
}

fn write_source(dir: &Path, file: &str, name: &str) -> String {
    let path = dir.join(file);
    fs::write(
        &path,
        format!("import {{ AbsoluteFill }} from \"remotion\";\n\nexport const {name} = () => <AbsoluteFill />;\n"),
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn add_list_validate_remove() {
    let project = TempDir::new().unwrap();
    let ctx = context(project.path(), false);
    let source = write_source(project.path(), "intro-source.tsx", "Intro");

    dispatch(&ctx, command(&["add", "Intro", &source, "--frames", "90"]))
        .await
        .unwrap();
    assert!(project.path().join("src/components/Intro.tsx").exists());
    let root = fs::read_to_string(project.path().join("src/Root.tsx")).unwrap();
    assert!(root.contains("durationInFrames={90}"));

    dispatch(&ctx, command(&["list"])).await.unwrap();
    dispatch(&ctx, command(&["validate"])).await.unwrap();

    dispatch(&ctx, command(&["remove", "Intro"])).await.unwrap();
    assert!(!project.path().join("src/components/Intro.tsx").exists());
    let root = fs::read_to_string(project.path().join("src/Root.tsx")).unwrap();
    assert!(!root.contains("Intro"));
}

#[tokio::test]
async fn rejected_component_maps_to_data_error() {
    let project = TempDir::new().unwrap();
    let ctx = context(project.path(), true);
    let source = write_source(project.path(), "wrong.tsx", "Other");

    let err = dispatch(&ctx, command(&["add", "Intro", &source]))
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 65);
    assert!(!project.path().join("src/components").exists());
}

#[tokio::test]
async fn validate_fails_on_missing_aggregation_file() {
    let project = TempDir::new().unwrap();
    fs::create_dir_all(project.path().join("src/components")).unwrap();
    let ctx = context(project.path(), true);

    let err = dispatch(&ctx, command(&["validate"])).await.unwrap_err();
    assert_eq!(err.exit_code(), 1);

    dispatch(&ctx, command(&["repair"])).await.unwrap();
    dispatch(&ctx, command(&["validate"])).await.unwrap();
}

#[tokio::test]
async fn missing_component_directory_is_io_error() {
    let project = TempDir::new().unwrap();
    let ctx = context(project.path(), true);

    let err = dispatch(&ctx, command(&["list"])).await.unwrap_err();
    assert_eq!(err.exit_code(), 74);
}

#[tokio::test]
async fn fix_without_manifest_reports_skip() {
    let project = TempDir::new().unwrap();
    let ctx = context(project.path(), true);

    let err = dispatch(&ctx, command(&["fix"])).await.unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(!project.path().join("package.json").exists());
}

#[tokio::test]
async fn remove_unknown_component_is_not_found() {
    let project = TempDir::new().unwrap();
    fs::create_dir_all(project.path().join("src/components")).unwrap();
    let ctx = context(project.path(), true);

    let err = dispatch(&ctx, command(&["remove", "Ghost"])).await.unwrap_err();
    assert_eq!(err.exit_code(), 66);
}
