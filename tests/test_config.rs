use std::fs;

use routegrader::config::GraderConfig;
use routegrader::models::ColorClass;

#[test]
fn defaults_round_trip_through_toml() -> anyhow::Result<()> {
    let defaults = GraderConfig::default();
    let text = toml::to_string(&defaults)?;
    let parsed: GraderConfig = toml::from_str(&text)?;
    parsed.validate()?;

    assert_eq!(parsed.image_dir, defaults.image_dir);
    assert_eq!(parsed.upload_slot_ttl_secs, defaults.upload_slot_ttl_secs);
    assert_eq!(parsed.detection.min_area_px, defaults.detection.min_area_px);
    assert_eq!(parsed.scoring.color_cutoff, defaults.scoring.color_cutoff);
    assert_eq!(parsed.timeouts.fetch_ms, defaults.timeouts.fetch_ms);
    assert_eq!(parsed.palette.len(), defaults.palette.len());
    let labels: Vec<&str> = parsed.buckets.iter().map(|b| b.label.as_str()).collect();
    let expected: Vec<&str> = defaults.buckets.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, expected);
    Ok(())
}

#[test]
fn partial_file_overrides_only_what_it_names() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("grader.toml");
    fs::write(
        &path,
        r#"
image_dir = "custom/images"

[detection]
min_area_px = 120

[scoring]
color_cutoff = 60.0
"#,
    )?;

    let config = GraderConfig::load(&path)?;
    assert_eq!(config.image_dir, std::path::PathBuf::from("custom/images"));
    assert_eq!(config.detection.min_area_px, 120);
    assert_eq!(config.scoring.color_cutoff, 60.0);
    // Everything unnamed keeps its default.
    let defaults = GraderConfig::default();
    assert_eq!(config.history_db, defaults.history_db);
    assert_eq!(config.detection.blur_sigma, defaults.detection.blur_sigma);
    assert_eq!(config.buckets.len(), defaults.buckets.len());
    assert!(config.palette.iter().any(|p| p.class == ColorClass::Red));
    Ok(())
}

#[test]
fn unordered_bucket_scale_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("grader.toml");
    fs::write(
        &path,
        r#"
[[buckets]]
upper = 0.5
label = "V0"

[[buckets]]
upper = 0.3
label = "V1"
"#,
    )?;

    assert!(GraderConfig::load(&path).is_err());
    Ok(())
}
