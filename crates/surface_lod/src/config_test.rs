use super::*;

#[test]
fn test_default_surface_config() {
  let config = SurfaceConfig::default();
  assert_eq!(config.min_num_quaterna, 1024);
  assert_eq!(config.max_num_quaterna, 65536);
  assert!(config.min_score_distance > 0.0);
}

#[test]
fn test_clamp_num_quaterna() {
  let config = SurfaceConfig::default().with_quaterna_range(4, 256);
  assert_eq!(config.clamp_num_quaterna(0), 4);
  assert_eq!(config.clamp_num_quaterna(64), 64);
  assert_eq!(config.clamp_num_quaterna(usize::MAX), 256);
}

#[test]
fn test_reaction_coefficient_decays_to_base() {
  let config = RegulatorConfig::default();

  let at_start = config.frame_reaction_coefficient(0.0);
  let one_half_life = config.frame_reaction_coefficient(3.0);
  let much_later = config.frame_reaction_coefficient(300.0);

  assert!((at_start - 0.065).abs() < 1e-6);
  assert!((one_half_life - 0.04).abs() < 1e-6);
  assert!((much_later - config.frame_reaction_coefficient_base).abs() < 1e-6);
  assert!(at_start > one_half_life && one_half_life > much_later);
}

#[test]
fn test_scene_config_builders() {
  let config = SceneConfig::new()
    .with_threaded(false)
    .with_max_observer_distance(100.0)
    .with_regulator_enabled(false);

  assert!(!config.threaded);
  assert!(!config.regulator_enabled);
  assert_eq!(config.max_observer_distance, 100.0);
  assert_eq!(config.post_reset_freeze, SceneConfig::DEFAULT.post_reset_freeze);
}
