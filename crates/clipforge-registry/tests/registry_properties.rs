//! End-to-end registry behavior against a real temporary project.

use std::fs;

use clipforge_core::ComponentMetadata;
use clipforge_registry::{RegistryManager, parse_composition_ids};
use tempfile::TempDir;

fn component(name: &str) -> String {
    format!(
        "import {{ AbsoluteFill, useCurrentFrame }} from \"remotion\";\n\n\
         export const {name}: React.FC = () => {{\n  \
           const frame = useCurrentFrame();\n  \
           return <AbsoluteFill>{{frame}}</AbsoluteFill>;\n\
         }};\n"
    )
}

fn project() -> (TempDir, RegistryManager) {
    let dir = TempDir::new().unwrap();
    let registry = RegistryManager::new(
        dir.path().join("src/components"),
        dir.path().join("src/Root.tsx"),
    );
    fs::create_dir_all(registry.components_dir()).unwrap();
    (dir, registry)
}

#[test]
fn test_add_then_validate_is_healthy_with_one_more_component() {
    let (_dir, registry) = project();
    registry
        .add_component_safely("Intro", &component("Intro"), ComponentMetadata::default())
        .unwrap();
    let before = registry.validate().unwrap().components_found;

    registry
        .add_component_safely("Outro", &component("Outro"), ComponentMetadata::new(60, 1080, 1920))
        .unwrap();
    let report = registry.validate().unwrap();

    assert!(report.healthy, "issues: {:?}", report.issues);
    assert_eq!(report.components_found, before + 1);
}

#[test]
fn test_repair_twice_is_byte_identical() {
    let (_dir, registry) = project();
    for name in ["Gamma", "alpha", "Beta"] {
        fs::write(
            registry.components_dir().join(format!("{name}.tsx")),
            component(name),
        )
        .unwrap();
    }

    registry.repair().unwrap();
    let first = fs::read(registry.aggregation_file()).unwrap();
    registry.repair().unwrap();
    let second = fs::read(registry.aggregation_file()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_same_name_in_two_files_yields_one_entry() {
    let (_dir, registry) = project();
    fs::write(registry.components_dir().join("Title.jsx"), component("Title")).unwrap();
    fs::write(registry.components_dir().join("Title.tsx"), component("Title")).unwrap();

    let report = registry.repair().unwrap();

    assert_eq!(report.components_found, 1);
    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(report.duplicates[0].name, "Title");
    let root = fs::read_to_string(registry.aggregation_file()).unwrap();
    assert_eq!(parse_composition_ids(&root), vec!["Title"]);
    assert_eq!(root.matches("import { Title }").count(), 1);
}

#[test]
fn test_generated_ids_are_unique_and_sorted() {
    let (_dir, registry) = project();
    let names = ["Zeta", "delta", "Alpha", "Mu", "beta", "Omega", "kappa"];
    for name in names {
        fs::write(
            registry.components_dir().join(format!("{name}.tsx")),
            component(name),
        )
        .unwrap();
    }

    registry.repair().unwrap();
    let root = fs::read_to_string(registry.aggregation_file()).unwrap();
    let ids = parse_composition_ids(&root);

    assert_eq!(ids.len(), names.len());
    let mut expected: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();
    expected.sort_by_key(|n| n.to_lowercase());
    assert_eq!(ids, expected);
}

#[test]
fn test_file_corrupted_after_add_is_excluded_on_repair() {
    let (_dir, registry) = project();
    registry
        .add_component_safely("Intro", &component("Intro"), ComponentMetadata::default())
        .unwrap();
    registry
        .add_component_safely("Outro", &component("Outro"), ComponentMetadata::default())
        .unwrap();

    let path = registry.components_dir().join("Intro.tsx");
    let corrupted = fs::read_to_string(&path)
        .unwrap()
        .replace("export const Intro", "const Intro");
    fs::write(&path, corrupted).unwrap();

    let report = registry.repair().unwrap();

    assert_eq!(report.components_found, 1);
    assert_eq!(report.skipped.len(), 1);
    let root = fs::read_to_string(registry.aggregation_file()).unwrap();
    assert!(!root.contains("Intro"));
    assert_eq!(parse_composition_ids(&root), vec!["Outro"]);
}

#[test]
fn test_repair_heals_hand_corrupted_aggregation_file() {
    let (_dir, registry) = project();
    registry
        .add_component_safely("Intro", &component("Intro"), ComponentMetadata::default())
        .unwrap();
    let healthy = fs::read_to_string(registry.aggregation_file()).unwrap();

    let mut broken = healthy.clone();
    broken.push_str("import { Intro } from \"./components/Intro\";\n");
    fs::write(registry.aggregation_file(), broken).unwrap();
    assert!(!registry.validate().unwrap().healthy);

    let report = registry.repair().unwrap();

    assert!(report.success);
    assert_eq!(fs::read_to_string(registry.aggregation_file()).unwrap(), healthy);
    assert!(registry.validate().unwrap().healthy);
}

#[test]
fn test_entries_are_recomputed_from_headers() {
    let (_dir, registry) = project();
    registry
        .add_component_safely("Wide", &component("Wide"), ComponentMetadata::new(300, 3840, 1080))
        .unwrap();

    let entries = registry.list_components().unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].metadata, ComponentMetadata::new(300, 3840, 1080));
    let json = serde_json::to_value(&entries[0]).unwrap();
    assert_eq!(json["durationInFrames"], 300);
}
