use std::path::PathBuf;

use ism_cli::settings::Settings;
use ism_mapping::EditorMode;

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("ism-cli-test-{}", std::process::id()))
        .join(name)
        .join("settings.toml")
}

#[test]
fn saved_settings_load_back() {
    let path = scratch_path("round-trip");
    let mut settings = Settings::default();
    settings.server.url = "https://dashboards.example:5601".to_string();
    settings.server.data_source_id = Some("remote-1".to_string());
    settings.editor.mode = EditorMode::Json;

    settings.save_to(&path).unwrap();
    let loaded = Settings::load_from(&path);

    assert_eq!(loaded, settings);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("mode = \"json\""));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn missing_or_invalid_file_gives_defaults() {
    let path = scratch_path("missing");
    assert_eq!(Settings::load_from(&path), Settings::default());

    let path = scratch_path("invalid");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "server = 3").unwrap();
    assert_eq!(Settings::load_from(&path), Settings::default());
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
