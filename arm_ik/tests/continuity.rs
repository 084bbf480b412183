use arm_ik::{
    end_effector, ArmConfig, Chain, ContinuitySelector, ContinuityState, DlsSolver, IkTarget, Pose, PoseSolver,
    SampleSpec, TrajectoryGenerator,
};

/// Sum over consecutive waypoints of the squared actuated-joint deltas
fn path_motion(chain: &Chain, path: &[Vec<f64>]) -> f64 {
    path.windows(2)
        .map(|pair| {
            chain
                .joints()
                .iter()
                .map(|j| (pair[1][j.link] - pair[0][j.link]).powi(2))
                .sum::<f64>()
        })
        .sum()
}

fn waypoints(chain: &Chain, solver: &DlsSolver, origin: [f64; 3], target: [f64; 3]) -> (ContinuityState, Vec<Pose>) {
    let mut seeding = ContinuitySelector::new(chain, solver);
    let origin_solution = seeding.select(&Pose::from_position(origin));
    let orientation = origin_solution.outcome.orientation();

    let generator = TrajectoryGenerator::default();
    let start = Pose::from_position(origin).with_orientation(orientation);
    let end = Pose::from_position(target).with_orientation(orientation);
    let mut poses = generator.interpolate(&start, &end, &SampleSpec::Steps(8)).unwrap();
    poses.push(end);

    (seeding.state().clone(), poses)
}

fn assert_no_jumpier_than_zero_seeded(origin: [f64; 3], target: [f64; 3]) {
    let chain = Chain::build(&ArmConfig::default());
    let solver = DlsSolver::default();
    let (state, poses) = waypoints(&chain, &solver, origin, target);
    assert_eq!(poses.len(), 7);

    let mut selector = ContinuitySelector::new(&chain, &solver).with_state(state);
    let continuous: Vec<Vec<f64>> = selector.solve_path(&poses).into_iter().map(|s| s.outcome.joints).collect();

    // every waypoint solved on its own from the zero vector
    let independent: Vec<Vec<f64>> = poses
        .iter()
        .map(|pose| {
            solver
                .solve(&chain, &IkTarget::Position(pose.position), &chain.zero_joints())
                .joints
        })
        .collect();

    for (pose, joints) in poses.iter().zip(&continuous) {
        let err = (end_effector(&chain, joints).translation.vector - pose.position.coords).norm();
        assert!(err < 1e-3, "waypoint missed by {:.3e}", err);
    }

    let selected = path_motion(&chain, &continuous);
    let baseline = path_motion(&chain, &independent);
    println!(
        "{:?} -> {:?}: selector motion {:.6}, independent motion {:.6}",
        origin, target, selected, baseline
    );
    assert!(selected <= baseline + 1e-3);
}

#[test]
fn test_selector_path_through_yaw_axis_is_no_jumpier_than_independent_solves() {
    assert_no_jumpier_than_zero_seeded([0.0, 10.0, 0.0], [10.0, 10.0, 0.0]);
}

#[test]
fn test_selector_diagonal_path_is_no_jumpier_than_independent_solves() {
    assert_no_jumpier_than_zero_seeded([6.0, 10.0, 0.0], [10.0, 6.0, 0.0]);
}

#[test]
fn test_state_is_not_shared_between_selectors() {
    let chain = Chain::build(&ArmConfig::default());
    let solver = DlsSolver::default();

    let mut first = ContinuitySelector::new(&chain, &solver);
    first.select(&Pose::from_position([5.0, 8.0, 0.0]));

    let second = ContinuitySelector::new(&chain, &solver);
    assert_eq!(second.state().joints, chain.zero_joints());
    assert!(second.state().orientation.is_none());
    assert_ne!(first.state().joints, chain.zero_joints());
}
