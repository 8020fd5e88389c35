use depth_parallax::config::{Configuration, WindowOptions};
use std::path::PathBuf;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
effects:
  - image: "/photos/hall.jpg"
    depth-map: "/photos/hall_depth.png"
    title: Hall
parallax-strength: 0.08
smoothing: 0.1
window:
  width: 640
  height: 480
  fullscreen: true
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.effects.len(), 1);
    assert_eq!(cfg.effects[0].image, PathBuf::from("/photos/hall.jpg"));
    assert_eq!(cfg.effects[0].depth_map, PathBuf::from("/photos/hall_depth.png"));
    assert_eq!(cfg.effects[0].display_title(), "Hall");
    assert!((cfg.parallax_strength - 0.08).abs() < f32::EPSILON);
    assert!((cfg.smoothing - 0.1).abs() < f32::EPSILON);
    assert_eq!(
        cfg.window,
        WindowOptions {
            width: 640,
            height: 480,
            fullscreen: true
        }
    );
}

#[test]
fn defaults_match_the_stock_effect() {
    let yaml = r#"
effects:
  - image: a.png
    depth-map: a_depth.png
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!((cfg.parallax_strength - 0.04).abs() < f32::EPSILON);
    assert!((cfg.smoothing - 0.05).abs() < f32::EPSILON);
    assert_eq!(cfg.window, WindowOptions::default());
    assert_eq!(cfg.effects[0].display_title(), "a");

    let params = cfg.effect_params();
    assert!((params.parallax_strength - 0.04).abs() < f32::EPSILON);
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
effects: []
parallax: 0.1
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());

    let yaml = r#"
effects:
  - image: a.png
    depth: a_depth.png
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn validation_rejects_bad_values() {
    let base = r#"
effects:
  - image: a.png
    depth-map: b.png
"#;
    let ok: Configuration = serde_yaml::from_str(base).unwrap();
    assert!(ok.clone().validated().is_ok());

    let empty = Configuration::default();
    let err = empty.validated().unwrap_err();
    assert!(err.to_string().contains("at least one effect"), "{err}");

    let mut neg = ok.clone();
    neg.parallax_strength = -0.01;
    assert!(neg.validated().is_err());

    let mut zero_smoothing = ok.clone();
    zero_smoothing.smoothing = 0.0;
    assert!(zero_smoothing.validated().is_err());

    let mut over = ok.clone();
    over.smoothing = 1.5;
    assert!(over.validated().is_err());

    let mut snap = ok.clone();
    snap.smoothing = 1.0;
    assert!(snap.validated().is_ok());

    let mut flat = ok;
    flat.window.height = 0;
    assert!(flat.validated().is_err());
}

#[test]
fn relative_paths_resolve_against_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parallax.yaml");
    std::fs::write(
        &path,
        r#"
effects:
  - image: photos/beach.jpg
    depth-map: /abs/beach_depth.png
"#,
    )
    .unwrap();

    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.effects[0].image, dir.path().join("photos/beach.jpg"));
    assert_eq!(cfg.effects[0].depth_map, PathBuf::from("/abs/beach_depth.png"));

    let bindings = cfg.bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].title, "beach");
    assert_eq!(bindings[0].sources.image, cfg.effects[0].image);
}

#[test]
fn missing_config_file_names_the_path() {
    let err = Configuration::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}
