use arm_ik::{end_effector, ArmConfig, Chain, DlsSolver, IkTarget, JointRole, PoseSolver};
use nalgebra::Point3;

/// Evenly spaced joint vectors strictly inside every link bound
fn grid(chain: &Chain, per_joint: usize) -> Vec<Vec<f64>> {
    let mut vectors = vec![chain.zero_joints()];
    for joint in chain.joints() {
        let (lower, upper) = match chain.links()[joint.link].bounds() {
            Some(bounds) => bounds,
            None => continue,
        };
        let mut next = Vec::new();
        for q in &vectors {
            for k in 0..per_joint {
                let t = (k as f64 + 0.5) / per_joint as f64;
                let mut v = q.clone();
                v[joint.link] = 0.9 * (lower + t * (upper - lower));
                next.push(v);
            }
        }
        vectors = next;
    }
    vectors
}

#[test]
fn test_forward_inverse_round_trip() {
    let solver = DlsSolver::default();

    for config in [ArmConfig::default(), ArmConfig::with_wrist()] {
        let chain = Chain::build(&config);
        let mut worst: f64 = 0.0;

        for q in grid(&chain, 3) {
            let expected = end_effector(&chain, &q).translation.vector;
            let target = IkTarget::Position(Point3::from(expected));
            let outcome = solver.solve(&chain, &target, &q);

            let achieved = end_effector(&chain, &outcome.joints).translation.vector;
            let err = (achieved - expected).norm();
            worst = worst.max(err);
            assert!(err < 1e-3, "round trip error {:.3e} for {:?}", err, q);
        }

        println!("wrist={} worst round trip error {:.3e}", chain.has_wrist(), worst);
    }
}

#[test]
fn test_solutions_stay_in_bounds() {
    let solver = DlsSolver::default();
    let chain = Chain::build(&ArmConfig::with_wrist());
    let targets = [
        Point3::new(5.0, 8.0, 0.0),
        Point3::new(-3.0, 20.0, 4.0),
        Point3::new(0.0, -10.0, 0.0),
        Point3::new(40.0, 40.0, 40.0),
    ];

    for target in targets {
        for seed in grid(&chain, 2) {
            let outcome = solver.solve(&chain, &IkTarget::Position(target), &seed);
            for joint in chain.joints() {
                let (lower, upper) = chain.links()[joint.link].bounds().unwrap();
                let value = outcome.joints[joint.link];
                assert!(value >= lower && value <= upper, "{:?} = {} outside [{}, {}]", joint.role, value, lower, upper);
            }
        }
    }
}

#[test]
fn test_shoulder_is_the_only_pitch_before_the_elbow() {
    let chain = Chain::build(&ArmConfig::default());
    let shoulder = chain.joint(JointRole::ShoulderPitch).unwrap();
    let forearm = chain.joint(JointRole::ForearmPitch).unwrap();
    assert!(shoulder.link < forearm.link);
    assert!(!shoulder.role.is_distal_pitch());
    assert!(forearm.role.is_distal_pitch());
}
