use super::*;

const START: Duration = Duration::ZERO;

#[test]
fn test_no_samples_is_a_no_op() {
  let mut regulator = Regulator::default();
  assert_eq!(regulator.get_adjusted_load_at(1000, START), 1000);
}

#[test]
fn test_idempotent_after_consult() {
  let mut regulator = Regulator::default();
  regulator.sample_frame_ratio(2.0);
  regulator.sample_mesh_generation_period(Duration::from_secs(5));

  let first = regulator.get_adjusted_load_at(1000, START);
  assert!(first < 1000);
  assert_eq!(regulator.get_adjusted_load_at(1000, START), 1000);
}

#[test]
fn test_slow_frames_reduce_load() {
  let mut regulator = Regulator::default();
  regulator.sample_frame_ratio(2.0);
  // 1000 * 2^-0.065
  assert_eq!(regulator.get_adjusted_load_at(1000, START), 955);
}

#[test]
fn test_fast_frames_increase_load() {
  let mut regulator = Regulator::default();
  regulator.sample_frame_ratio(0.5);
  assert_eq!(regulator.get_adjusted_load_at(1000, START), 1046);
}

#[test]
fn test_on_budget_still_creeps_up() {
  let mut regulator = Regulator::default();
  regulator.sample_frame_ratio(1.0);
  assert_eq!(regulator.get_adjusted_load_at(1000, START), 1001);

  regulator.sample_frame_ratio(0.0);
  assert_eq!(regulator.get_adjusted_load_at(1000, START), 1001);
}

#[test]
fn test_worst_frame_ratio_wins() {
  let mut a = Regulator::default();
  a.sample_frame_ratio(2.0);
  a.sample_frame_ratio(1.0);

  let mut b = Regulator::default();
  b.sample_frame_ratio(2.0);

  assert_eq!(a.get_adjusted_load_at(1000, START), b.get_adjusted_load_at(1000, START));
}

#[test]
fn test_boost_decays() {
  let mut early = Regulator::default();
  early.sample_frame_ratio(4.0);
  let mut late = Regulator::default();
  late.sample_frame_ratio(4.0);

  let early_load = early.get_adjusted_load_at(10_000, START);
  let late_load = late.get_adjusted_load_at(10_000, Duration::from_secs(60));
  assert!(early_load < late_load);
  assert!(late_load < 10_000);
}

#[test]
fn test_slow_mesh_generation_backs_off() {
  let mut regulator = Regulator::default();
  regulator.sample_mesh_generation_period(Duration::from_secs(2));
  // floor(1000 * 0.9975) - 1, and no frame sample to compete with.
  assert_eq!(regulator.get_adjusted_load_at(1000, START), 996);
}

#[test]
fn test_slow_mesh_generation_beats_fast_frames() {
  for ratio in [0.01, 0.25, 0.5, 0.9, 1.0] {
    for current in [0, 1, 5, 100, 65_536] {
      let mut regulator = Regulator::default();
      regulator.sample_frame_ratio(ratio);
      regulator.sample_mesh_generation_period(Duration::from_secs_f32(1.5));
      assert!(regulator.get_adjusted_load_at(current, START) <= current);
    }
  }
}

#[test]
fn test_mesh_back_off_floors_at_zero() {
  let mut regulator = Regulator::default();
  regulator.sample_mesh_generation_period(Duration::from_secs(10));
  assert_eq!(regulator.get_adjusted_load_at(0, START), 0);
}

#[test]
fn test_invalid_samples_are_ignored() {
  let mut regulator = Regulator::default();
  regulator.sample_frame_ratio(f32::NAN);
  regulator.sample_frame_ratio(-1.0);
  regulator.sample_frame_duration(Duration::from_millis(16), Duration::ZERO);
  assert_eq!(regulator.get_adjusted_load_at(1000, START), 1000);
}

#[test]
fn test_reset_drops_samples() {
  let mut regulator = Regulator::default();
  regulator.sample_frame_duration(Duration::from_millis(40), Duration::from_millis(20));
  regulator.reset();
  assert_eq!(regulator.get_adjusted_load(1000), 1000);
}
