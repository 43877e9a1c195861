// smbna_core/tests/pipeline.rs

use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use nalgebra::{DMatrix, DVector};
use smbna_core::prelude::*;

const DT: f64 = 0.1;

fn kalman_engine(id: &str, gps_sigma: Option<f64>) -> Box<dyn BeliefEngine> {
    let state = FilterState::new(planar_layout(), 1.0, 0.0);
    let dynamics = ConstantVelocityModel::for_state(&state);
    let model = gps_sigma.map(|sigma| {
        Box::new(PositionMeasurementModel::isotropic(2, sigma).unwrap()) as Box<dyn Measurement>
    });
    let filter =
        KalmanFilter::new(state, DMatrix::identity(5, 5) * 0.01, Box::new(dynamics), model).unwrap();
    let confidence = match gps_sigma {
        Some(_) => ConfidenceConfig::default(),
        None => ConfidenceConfig::dead_reckoning(),
    };
    Box::new(KalmanBeliefEngine::new(id, filter, confidence).unwrap())
}

fn two_belief_pipeline() -> NavigationPipeline {
    NavigationPipeline::new(
        NavigationConfig::default(),
        Box::new(UniformFieldModel::default()),
    )
    .unwrap()
    .with_engine(kalman_engine("gps", Some(2.0)))
    .unwrap()
    .with_engine(kalman_engine("ins", None))
    .unwrap()
}

fn input(step: usize, gps: Option<[f64; 2]>) -> StepInput {
    let input = StepInput::new(step as f64 * DT, DT, DVector::zeros(2));
    match gps {
        Some(z) => input.with_measurement(MeasurementData::GpsPosition(DVector::from_row_slice(&z))),
        None => input,
    }
}

#[test]
fn nominal_gps_is_selected() {
    let mut pipeline = two_belief_pipeline();
    for step in 1..=20 {
        let report = pipeline.step(&input(step, Some([0.0, 0.0]))).unwrap();
        assert_eq!(report.decision.selected().map(BeliefId::as_str), Some("gps"));
        assert!(!report.gate_vetoed);
        assert_eq!(report.innovation_norms[&BeliefId::from("gps")], 0.0);
        assert!(report.innovation_norms[&BeliefId::from("ins")].is_nan());
    }
    assert_eq!(pipeline.history(&BeliefId::from("ins")).map(BeliefHistory::len), Some(20));
}

#[test]
fn spoofed_jump_is_never_selected() {
    let mut pipeline = two_belief_pipeline();
    for step in 1..=20 {
        pipeline.step(&input(step, Some([0.0, 0.0]))).unwrap();
    }

    let report = pipeline.step(&input(21, Some([500.0, 0.0]))).unwrap();

    assert!(report.is_unsafe());
    assert!(report.selected_belief().is_none());
    let gps_penalties = &report.scores.per_invariant[&BeliefId::from("gps")];
    assert!(gps_penalties["temporal_smoothness"] > 0.0);
    assert!(gps_penalties["cross_belief_coherence"] > 0.0);
}

#[test]
fn full_chain_is_reproducible() {
    let mut a = two_belief_pipeline();
    let mut b = two_belief_pipeline();
    for step in 1..=30 {
        let gps = (step % 4 != 0).then(|| [0.1 * step as f64, -0.05 * step as f64]);
        let ra = a.step(&input(step, gps)).unwrap();
        let rb = b.step(&input(step, gps)).unwrap();
        assert_eq!(ra.decision, rb.decision);
        assert_eq!(ra.trust, rb.trust);
        assert_eq!(ra.scores, rb.scores);
    }
}

#[test]
fn single_filter_with_standalone_gate() {
    // Baseline usage: one filter and the gate, no arbitration.
    let state = FilterState::new(planar_layout(), 1.0, 0.0);
    let dynamics = ConstantVelocityModel::for_state(&state);
    let mut kf = KalmanFilter::new(
        state,
        DMatrix::identity(5, 5) * 0.01,
        Box::new(dynamics),
        Some(Box::new(PositionMeasurementModel::isotropic(2, 2.0).unwrap())),
    )
    .unwrap();
    let gate = RefusalGate::default();

    kf.predict(&DVector::zeros(2), DT).unwrap();
    let nominal = kf.update(&DVector::from_row_slice(&[1.0, -1.0])).unwrap();
    assert!(!gate.should_refuse(nominal.norm));

    kf.predict(&DVector::zeros(2), DT).unwrap();
    let spoofed = kf.update(&DVector::from_row_slice(&[80.0, 0.0])).unwrap();
    assert!(gate.should_refuse(spoofed.norm));
}

#[test]
fn zero_noise_predict_update_is_identity_on_the_mean() {
    let mut state = FilterState::new(spatial_layout(), 1.0, 0.0);
    state.vector = DVector::from_row_slice(&[1.0, 2.0, 3.0, 0.5, -0.5, 0.0]);
    let dynamics = ConstantVelocityModel::for_state(&state);
    let mut kf = KalmanFilter::new(
        state,
        DMatrix::zeros(6, 6),
        Box::new(dynamics),
        Some(Box::new(PositionMeasurementModel::new(DMatrix::zeros(3, 3)).unwrap())),
    )
    .unwrap();

    kf.predict(&DVector::zeros(3), DT).unwrap();
    let predicted = kf.get_state().vector.clone();
    let z = kf.get_state().position();
    let innovation = kf.update(&z).unwrap();

    assert_eq!(innovation.norm, 0.0);
    for i in 0..6 {
        assert_abs_diff_eq!(kf.get_state().vector[i], predicted[i], epsilon = 1e-12);
    }
}

#[test]
fn documented_decision_examples() {
    assert!(!should_refuse_navigation(20.0, 20.0));
    assert!(should_refuse_navigation(20.0001, 20.0));
    assert!(!should_refuse_navigation(f64::NAN, 20.0));

    let arbiter = TrustArbiter::new(ArbiterConfig::default()).unwrap();
    let confident =
        BeliefState::from_slices("gps", &[0.0, 0.0], &[0.0, 0.0], DMatrix::identity(2, 2), 0.95, 1.0)
            .unwrap();
    let penalties: BTreeMap<_, _> = [(BeliefId::from("gps"), 0.0)].into_iter().collect();
    let outcome = arbiter.evaluate(&[confident.clone()], &penalties).unwrap();
    assert_abs_diff_eq!(outcome.trust[&BeliefId::from("gps")], 0.95, epsilon = 1e-9);
    assert!(!outcome.decision.is_unsafe());
    assert_eq!(
        arbiter.arbitrate(&[confident], &penalties).unwrap(),
        outcome.decision
    );

    let weak =
        BeliefState::from_slices("gps", &[0.0, 0.0], &[0.0, 0.0], DMatrix::identity(2, 2), 0.1, 1.0)
            .unwrap();
    let heavy: BTreeMap<_, _> = [(BeliefId::from("gps"), 10.0)].into_iter().collect();
    let decision = arbiter.arbitrate(&[weak], &heavy).unwrap();
    assert_eq!(
        decision,
        Decision::NavUnsafe {
            reason: RefusalReason::ConfidenceCollapse
        }
    );
}
