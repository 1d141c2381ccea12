use approx::assert_relative_eq;
use curve_collapse::io::{read_result_json, write_result_json};
use curve_collapse::{
    CollapseError, Dataset, ErrorKind, EvalError, ParamSet, RefPoints, ScalingPoints, SearchConfig,
    SearchReport, Strategy, infallible, optimize_arguments,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `x` against `x + a - 3`: collapses at `a = 3`.
fn offset_case() -> (Vec<Dataset>, ParamSet, SearchConfig) {
    let xs = vec![0.0, 1.0, 2.0, 3.0];
    let datasets = vec![
        Dataset::new(xs.clone()),
        Dataset::new(xs).with_fn(["a"], infallible(|xs, a| xs.iter().map(|x| x + a[0] - 3.0).collect())),
    ];
    let trial = ParamSet::from_pairs([("a", 0.0)]);
    let config = SearchConfig::default().with_delta("a", 10.0);
    (datasets, trial, config)
}

/// `x`, `x + s` and `x + 2`: the spread is smallest at `s = 1`.
fn midpoint_case() -> (Vec<Dataset>, ParamSet) {
    let xs = vec![1.0, 2.0, 3.0, 4.0];
    let datasets = vec![
        Dataset::new(xs.clone()),
        Dataset::new(xs.clone()).with_fn(["s"], infallible(|xs, a| xs.iter().map(|x| x + a[0]).collect())),
        Dataset::new(xs).with_fn(Vec::<String>::new(), infallible(|xs, _| xs.iter().map(|x| x + 2.0).collect())),
    ];
    (datasets, ParamSet::from_pairs([("s", 0.0)]))
}

#[test]
fn grid_search_lands_on_the_exact_offset() {
    init_tracing();
    let (datasets, trial, config) = offset_case();
    let out = optimize_arguments(&datasets, &trial, &config).unwrap();

    assert_eq!(out.args.get("a"), Some(3.0));
    assert_eq!(out.dispersion, 0.0);
    assert_eq!(out.curves.len(), 2);
    assert_eq!(out.curves[0].ys, out.curves[1].ys);
    assert_eq!(out.strategy, Strategy::Grid);
}

#[test]
fn both_strategies_agree_on_a_smooth_problem() {
    init_tracing();
    let (datasets, trial) = midpoint_case();
    let base = SearchConfig::default().with_delta("s", 5.0);

    let grid = optimize_arguments(&datasets, &trial, &base).unwrap();
    let gradient = optimize_arguments(&datasets, &trial, &base.clone().with_strategy(Strategy::Gradient)).unwrap();

    let s_grid = grid.args.get("s").unwrap();
    let s_gradient = gradient.args.get("s").unwrap();
    assert_relative_eq!(s_grid, 1.0, epsilon = 1e-6);
    assert_relative_eq!(s_gradient, 1.0, epsilon = 1e-3);
    // Population std of {x, x + 1, x + 2} is sqrt(2/3) at each of 4 positions.
    assert_relative_eq!(grid.dispersion, 4.0 * (2.0f64 / 3.0).sqrt(), epsilon = 1e-9);
    assert_relative_eq!(gradient.dispersion, grid.dispersion, epsilon = 1e-6);

    assert!(matches!(grid.report, SearchReport::Grid { .. }));
    assert!(matches!(gradient.report, SearchReport::Gradient(_)));
    assert_eq!(gradient.strategy, Strategy::Gradient);
}

#[test]
fn unscaled_datasets_report_identity_maps() {
    let (datasets, trial, config) = offset_case();
    let out = optimize_arguments(&datasets, &trial, &config).unwrap();
    for curve in &out.curves {
        assert_eq!((curve.x_slope, curve.x_offset), (1.0, 0.0));
        assert_eq!((curve.y_slope, curve.y_offset), (1.0, 0.0));
    }
    // Untransformed datasets echo their domain.
    assert_eq!(out.curves[0].ys, vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn scaled_outputs_come_back_in_home_units() {
    // Domain doubles on the way in; outputs map away y (0, 10) -> home y (0, 1).
    let scaling = ScalingPoints::new(RefPoints::new(0.0, 0.0, 1.0, 1.0), RefPoints::new(0.0, 0.0, 2.0, 10.0));
    let datasets = vec![
        Dataset::new(vec![1.0, 2.0, 3.0]).with_scaling(scaling),
        Dataset::new(vec![2.0, 4.0, 6.0]),
    ];
    let out = optimize_arguments(&datasets, &ParamSet::new(), &SearchConfig::default().with_prec_iters(1)).unwrap();

    let scaled = &out.curves[0];
    assert_eq!((scaled.x_slope, scaled.x_offset), (2.0, 0.0));
    assert_relative_eq!(scaled.y_slope, 0.1, epsilon = 1e-15);
    assert_eq!(scaled.y_offset, 0.0);
    assert_relative_eq!(scaled.ys[2], 0.6, epsilon = 1e-12);
    // Scaled domain [2, 4, 6] matches the second dataset exactly.
    assert_eq!(out.dispersion, 0.0);
}

#[test]
fn domains_are_truncated_and_jointly_filtered() {
    let datasets = vec![
        Dataset::new(vec![1.0, f64::NAN, 3.0, 4.0]),
        Dataset::new(vec![1.0, 2.0, 3.0]),
        Dataset::new(vec![1.0, 2.0, f64::INFINITY, 4.0, 5.0]),
    ];
    let out = optimize_arguments(&datasets, &ParamSet::new(), &SearchConfig::default()).unwrap();
    assert_eq!(out.finite_indices, vec![0]);
    for curve in &out.curves {
        assert_eq!(curve.ys, vec![1.0]);
    }
}

#[test]
fn parallel_and_sequential_runs_are_identical() {
    let (datasets, trial) = midpoint_case();
    let config = SearchConfig::default().with_delta("s", 3.7).with_prec_iters(6);

    let parallel = optimize_arguments(&datasets, &trial, &config).unwrap();
    let sequential = optimize_arguments(&datasets, &trial, &config.clone().with_parallel(false)).unwrap();
    let again = optimize_arguments(&datasets, &trial, &config).unwrap();

    assert_eq!(parallel, sequential);
    assert_eq!(parallel, again);
}

#[test]
fn results_round_trip_through_json() {
    let (datasets, trial, config) = offset_case();
    let out = optimize_arguments(&datasets, &trial, &config.with_prec_iters(2)).unwrap();

    let path = std::env::temp_dir().join(format!("curve-collapse-result-{}.json", std::process::id()));
    write_result_json(&path, &out).unwrap();
    let back = read_result_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(back.args, out.args);
    assert_eq!(back.curves, out.curves);
    assert_eq!(back.finite_indices, out.finite_indices);
    assert_eq!(back.strategy, Strategy::Grid);
    let SearchReport::Grid { rounds } = back.report else {
        panic!("expected grid report");
    };
    assert_eq!(rounds.len(), 2);
}

#[test]
fn config_json_drives_the_search() {
    let (datasets, trial, _) = offset_case();
    let config = curve_collapse::io::config_from_json_str(r#"{"deltas": {"a": 10.0}, "parallel": false}"#).unwrap();
    let out = optimize_arguments(&datasets, &trial, &config).unwrap();
    assert_eq!(out.args.get("a"), Some(3.0));
}

fn kind_of(result: Result<curve_collapse::FitOutput, CollapseError>) -> ErrorKind {
    result.unwrap_err().kind()
}

#[test]
fn error_categories() {
    let config = SearchConfig::default();
    let trial = ParamSet::from_pairs([("a", 1.0)]);

    let unknown = vec![Dataset::new(vec![1.0]).with_fn(["b"], infallible(|xs, _| xs.to_vec()))];
    assert_eq!(kind_of(optimize_arguments(&unknown, &trial, &config)), ErrorKind::UnknownParameter);

    let flat = ScalingPoints::new(RefPoints::new(1.0, 0.0, 1.0, 1.0), RefPoints::new(0.0, 0.0, 1.0, 1.0));
    let degenerate = vec![Dataset::new(vec![1.0]).with_scaling(flat)];
    assert_eq!(kind_of(optimize_arguments(&degenerate, &trial, &config)), ErrorKind::DegenerateScaling);

    let empty = vec![Dataset::new(vec![f64::NAN]), Dataset::new(vec![1.0])];
    assert_eq!(kind_of(optimize_arguments(&empty, &trial, &config)), ErrorKind::EmptyDomain);

    let failing = vec![Dataset::new(vec![1.0, 2.0]).with_fn(
        ["a"],
        |_: &[f64], _: &[f64]| -> Result<Vec<f64>, EvalError> { Err(EvalError::new("model undefined")) },
    )];
    assert_eq!(
        kind_of(optimize_arguments(&failing, &trial, &config)),
        ErrorKind::AllCandidatesFailed
    );

    assert_eq!(kind_of(optimize_arguments(&[], &trial, &config)), ErrorKind::InvalidConfig);
}
