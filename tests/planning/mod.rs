use crate::{access, dictionary, mission, Canned, ScriptedChecker, DAY_S};
use approx::assert_abs_diff_eq;
use satplan::checker::CheckerError;
use satplan::io::export::to_csv;
use satplan::io::{ConfigRepr, InputError};
use satplan::mdp::{ModelError, Objectives};
use satplan::pareto::CombinationPolicy;
use satplan::planner::{index_mission, Decomposition};
use satplan::{MissionPlanner, PlannerConfig, PlanningError, Team};
use std::path::Path;

const AQUA: &str = "Aqua:\n  - AMSR:\n      Sea ice: 0.8\n";

const AQUA_TERRA_SAME: &str = "\
Aqua:
  - AMSR:
      Sea ice: 0.9
Terra:
  - MODIS:
      Sea ice: 0.7
";

const AQUA_TERRA_BOTH: &str = "\
Aqua:
  - AMSR:
      Sea ice: 0.9
Terra:
  - MODIS:
      Cloud type: 0.7
";

fn config(scratch: &Path) -> PlannerConfig {
    PlannerConfig::builder()
        .scratch_dir(scratch)
        .show_progress(false)
        .build()
}

fn optimal(report: &satplan::PlanReport) -> Vec<(f64, u32)> {
    report
        .frontier
        .optimal()
        .iter()
        .map(|fp| (fp.point.probability, fp.point.agents))
        .collect()
}

fn single_sensor_canned(flag: &str, action: &str, t: i64, p: f64) -> Canned {
    Canned {
        log: format!("Result: [(0.0, 0.0), ({p}, 1.0)] (value in the initial state)\n"),
        strategies: vec![
            format!("3 2 3\n0 0 1 {p} {action}\n0 0 2 {} {action}\n", 1.0 - p),
            "3 1 1\n0 0 2 1 NOAGENTS\n".to_string(),
        ],
        states: format!(
            "({flag},m4,t)\n0:(1,1,{t})\n1:(1,1,{})\n2:(0,0,{})\n",
            t + 1,
            t + 1
        ),
    }
}

#[test]
fn single_satellite() {
    let _ = pretty_env_logger::try_init();
    let scratch = tempfile::tempdir().unwrap();
    let cfg = config(scratch.path());

    let team = Team::loads(AQUA).unwrap();
    let (index, horizon) = index_mission(
        &team,
        &mission(1),
        &access(&[("Aqua", "AMSR", 0.0, 3_600.0)]),
        &dictionary(),
        &cfg,
    )
    .unwrap();
    assert_eq!(horizon, 1);

    let checker = ScriptedChecker::new([(
        0,
        single_sensor_canned("a27424_s31__1", "A27424S31__1", 0, 0.8),
    )]);
    let planner = MissionPlanner::new(cfg, checker);
    let report = planner.plan(&index, horizon).unwrap();

    let model = planner.checker.model(0).unwrap();
    assert!(model.contains("const double P1 = 0.8;"));
    assert!(model.contains("[NOAGENTS] t < finalTime ->"));
    assert!(model.contains("[A27424S31__1] ((t >= 0) & (t < 1)) & t < finalTime ->"));

    assert_eq!(optimal(&report), [(0.0, 0), (0.8, 1)]);
    let best = report.frontier.best_within(1).unwrap();
    assert!(best.plan[&0].contains("Aqua"));
    assert!(report.frontier.optimal()[0].plan[&0].is_empty());

    let csv = scratch.path().join("frontier.csv");
    to_csv(&report.frontier, &csv).unwrap();
    let text = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("1,0.8,false,t0: Aqua"));
}

#[test]
fn two_independent_agents() {
    let _ = pretty_env_logger::try_init();
    let scratch = tempfile::tempdir().unwrap();
    let cfg = config(scratch.path());

    let team = Team::loads(AQUA_TERRA_BOTH).unwrap();
    let (index, horizon) = index_mission(
        &team,
        &mission(1),
        &access(&[
            ("Aqua", "AMSR", 0.0, DAY_S),
            ("Terra", "MODIS", 0.0, DAY_S),
        ]),
        &dictionary(),
        &cfg,
    )
    .unwrap();

    let both = "A25994S12__1_A27424S31__1";
    let checker = ScriptedChecker::new([(
        0,
        Canned {
            log: "Result: [(0.0, 0.0), (0.5, 2.0), (0.63, 2.0)] (value in the initial state)\n".to_string(),
            strategies: vec![
                format!("4 2 3\n0 0 1 0.63 {both}\n0 0 2 0.27 {both}\n"),
                "4 1 1\n0 0 3 1 NOAGENTS\n".to_string(),
            ],
            states: "(a25994_s12__1,a27424_s31__1,m4,m7,t)\n\
                     0:(1,1,1,1,0)\n1:(1,1,1,1,1)\n2:(1,1,0,1,1)\n3:(0,0,0,0,1)\n"
                .to_string(),
        },
    )]);
    let planner = MissionPlanner::new(cfg, checker);
    let report = planner.plan(&index, horizon).unwrap();

    // Neither agent alone can detect both measurements
    let model = planner.checker.model(0).unwrap();
    assert!(model.contains(&format!("[{both}]")));
    assert!(!model.contains("[A25994S12__1] "));
    assert!(!model.contains("[A27424S31__1] "));
    assert!(model.contains("formula allM = (m4=1 & m7=1);"));

    let optimal = optimal(&report);
    assert_eq!(optimal.len(), 2);
    assert_eq!(optimal[0], (0.0, 0));
    assert_abs_diff_eq!(optimal[1].0, 0.63, epsilon = 1e-12);
    assert_eq!(optimal[1].1, 2);
    assert!(!optimal.contains(&(0.5, 2)));

    let plan = &report.frontier.optimal()[1].plan;
    assert_eq!(plan[&0].len(), 2);
}

#[test]
fn two_timesteps_combined() {
    let _ = pretty_env_logger::try_init();
    let scratch = tempfile::tempdir().unwrap();

    let team = Team::loads(AQUA_TERRA_SAME).unwrap();
    let passes = access(&[
        ("Aqua", "AMSR", 0.0, 3_600.0),
        ("Terra", "MODIS", DAY_S, DAY_S + 3_600.0),
    ]);

    for combination in [
        CombinationPolicy::Incremental,
        CombinationPolicy::Exhaustive,
        CombinationPolicy::Sampled { draws: 32, seed: 11 },
    ] {
        let cfg = PlannerConfig::builder()
            .scratch_dir(scratch.path())
            .show_progress(false)
            .combination(combination.clone())
            .build();
        let (index, horizon) =
            index_mission(&team, &mission(2), &passes, &dictionary(), &cfg).unwrap();
        assert_eq!(horizon, 2);

        let checker = ScriptedChecker::new([
            (0, single_sensor_canned("a27424_s31__1", "A27424S31__1", 0, 0.9)),
            (1, single_sensor_canned("a25994_s12__1", "A25994S12__1", 1, 0.7)),
        ]);
        let planner = MissionPlanner::new(cfg, checker);
        let report = planner.plan(&index, horizon).unwrap();

        assert_eq!(planner.checker.checked(), [0, 1]);
        // Each timestep only sees its own agent
        let t1 = planner.checker.model(1).unwrap();
        assert!(t1.contains("t : [1..finalTime] init 1;"));
        assert!(!t1.contains("a27424"));

        assert_eq!(report.fronts.len(), 2);
        assert_eq!(report.fronts[0].timestep, 0);
        assert_eq!(report.fronts[1].timestep, 1);

        let optimal = optimal(&report);
        assert_eq!(optimal.len(), 2, "{combination:?}");
        assert_abs_diff_eq!(optimal[1].0, 0.63, epsilon = 1e-12);
        assert_eq!(optimal[1].1, 2);

        let plan = &report.frontier.optimal()[1].plan;
        assert!(plan[&0].contains("Aqua"));
        assert!(plan[&1].contains("Terra"));
    }
}

#[test]
fn uncovered_timesteps_fail_before_checking() {
    let scratch = tempfile::tempdir().unwrap();
    let team = Team::loads(AQUA_TERRA_BOTH).unwrap();

    // Nobody sees the target at t = 1, or only Aqua does, which misses the cloud type: both end the run the same way
    let blind = access(&[
        ("Aqua", "AMSR", 0.0, 3_600.0),
        ("Terra", "MODIS", 0.0, 3_600.0),
        ("Aqua", "AMSR", 2.0 * DAY_S, 2.0 * DAY_S + 60.0),
        ("Terra", "MODIS", 2.0 * DAY_S, 2.0 * DAY_S + 60.0),
    ]);
    let partial = access(&[
        ("Aqua", "AMSR", 0.0, 3.0 * DAY_S),
        ("Terra", "MODIS", 0.0, 3_600.0),
        ("Terra", "MODIS", 2.0 * DAY_S, 2.0 * DAY_S + 60.0),
    ]);

    for passes in [blind, partial] {
        let cfg = config(scratch.path());
        let (index, horizon) = index_mission(&team, &mission(3), &passes, &dictionary(), &cfg).unwrap();
        assert_eq!(horizon, 3);

        let planner = MissionPlanner::new(cfg, ScriptedChecker::default());
        let err = planner.plan(&index, horizon).unwrap_err();
        assert!(
            matches!(
                err,
                PlanningError::PlanModel {
                    timestep: 1,
                    source: ModelError::UnsatisfiableMission { timestep: 1 }
                }
            ),
            "{err}"
        );
        assert!(planner.checker.checked().is_empty());
    }
}

#[test]
fn out_of_range_probability_rejected() {
    let cfg = PlannerConfig::default();
    let passes = access(&[("Aqua", "AMSR", 0.0, 3_600.0)]);
    for p in ["1.5", ".nan"] {
        let team = Team::loads(&format!("Aqua:\n  - AMSR:\n      Sea ice: {p}\n")).unwrap();
        let err = index_mission(&team, &mission(1), &passes, &dictionary(), &cfg).unwrap_err();
        assert!(matches!(err, InputError::InvalidProbability { .. }), "{err}");
    }
}

#[test]
fn empty_visibility_is_reported() {
    let cfg = PlannerConfig::default();
    let team = Team::loads(AQUA).unwrap();
    let passes = satplan::io::AccessIntervals::from_value(serde_json::json!({
        "output": {"Aqua": {"AMSR": {"Lake Erie": {"timeArray": []}}}}
    }));
    let err = index_mission(&team, &mission(1), &passes, &dictionary(), &cfg).unwrap_err();
    assert!(matches!(err, InputError::EmptyVisibility { .. }), "{err}");
}

#[test]
fn failing_timestep_aborts() {
    let scratch = tempfile::tempdir().unwrap();
    let cfg = config(scratch.path());

    let team = Team::loads(AQUA_TERRA_SAME).unwrap();
    let passes = access(&[
        ("Aqua", "AMSR", 0.0, 3_600.0),
        ("Terra", "MODIS", DAY_S, DAY_S + 3_600.0),
    ]);
    let (index, horizon) = index_mission(&team, &mission(2), &passes, &dictionary(), &cfg).unwrap();

    // Nothing canned for t = 1: its log holds no result
    let checker = ScriptedChecker::new([(
        0,
        single_sensor_canned("a27424_s31__1", "A27424S31__1", 0, 0.9),
    )]);
    let planner = MissionPlanner::new(cfg, checker);
    let err = planner.plan(&index, horizon).unwrap_err();
    assert!(
        matches!(
            err,
            PlanningError::PlanChecker {
                timestep: 1,
                source: CheckerError::CheckerExecution { .. }
            }
        ),
        "{err}"
    );
}

#[test]
fn unsatisfiable_before_checking() {
    let scratch = tempfile::tempdir().unwrap();
    let cfg = config(scratch.path());

    let team = Team::loads(AQUA_TERRA_BOTH).unwrap();
    let passes = access(&[
        ("Aqua", "AMSR", 0.0, 3_600.0),
        ("Terra", "MODIS", DAY_S, DAY_S + 3_600.0),
    ]);
    let (index, horizon) = index_mission(&team, &mission(2), &passes, &dictionary(), &cfg).unwrap();

    let planner = MissionPlanner::new(cfg, ScriptedChecker::default());
    let err = planner.plan(&index, horizon).unwrap_err();
    assert!(
        matches!(
            err,
            PlanningError::PlanModel {
                timestep: 0,
                source: ModelError::UnsatisfiableMission { timestep: 0 }
            }
        ),
        "{err}"
    );
    assert!(planner.checker.checked().is_empty());
}

#[test]
fn whole_horizon_single_objective() {
    let scratch = tempfile::tempdir().unwrap();
    let cfg = PlannerConfig::builder()
        .scratch_dir(scratch.path())
        .show_progress(false)
        .decomposition(Decomposition::WholeHorizon)
        .objectives(Objectives::Success)
        .build();

    let team = Team::loads(AQUA_TERRA_SAME).unwrap();
    let passes = access(&[
        ("Aqua", "AMSR", 0.0, 3_600.0),
        ("Terra", "MODIS", DAY_S, DAY_S + 3_600.0),
    ]);
    let (index, horizon) = index_mission(&team, &mission(2), &passes, &dictionary(), &cfg).unwrap();

    let checker = ScriptedChecker::new([(
        0,
        Canned {
            log: "Result: 0.63 (value in the initial state)\n".to_string(),
            strategies: vec!["5 2 4\n\
                 0 0 1 0.9 A27424S31__1\n\
                 0 0 3 0.1 A27424S31__1\n\
                 1 0 2 0.7 A25994S12__1\n\
                 1 0 4 0.3 A25994S12__1\n"
                .to_string()],
            states: "(a25994_s12__1,a27424_s31__1,m4,t)\n\
                     0:(0,1,1,0)\n1:(0,1,1,1)\n2:(1,0,1,2)\n3:(0,1,0,1)\n4:(1,0,0,2)\n"
                .to_string(),
        },
    )]);
    let planner = MissionPlanner::new(cfg, checker);
    let report = planner.plan(&index, horizon).unwrap();

    let model = planner.checker.model(0).unwrap();
    assert!(model.contains("const int finalTime = 2;"));
    assert!(model.contains("a25994_s12__1 : [0..1] init 0;"));
    assert!(model.contains("a27424_s31__1 : [0..1] init 1;"));
    // The two windows never overlap
    assert!(!model.contains("A25994S12__1_A27424S31__1"));

    assert_eq!(report.fronts.len(), 1);
    let optimal = optimal(&report);
    assert_eq!(optimal.len(), 2);
    assert_abs_diff_eq!(optimal[1].0, 0.63, epsilon = 1e-12);
    assert_eq!(optimal[1].1, 2);
    let plan = &report.frontier.optimal()[1].plan;
    assert!(plan[&0].contains("Aqua"));
    assert!(plan[&1].contains("Terra"));
}

#[test]
fn encode_only_writes_models() {
    let out = tempfile::tempdir().unwrap();
    let cfg = config(out.path());

    let team = Team::loads(AQUA_TERRA_SAME).unwrap();
    let passes = access(&[
        ("Aqua", "AMSR", 0.0, 3_600.0),
        ("Terra", "MODIS", DAY_S, DAY_S + 3_600.0),
    ]);
    let (index, horizon) = index_mission(&team, &mission(2), &passes, &dictionary(), &cfg).unwrap();

    let planner = MissionPlanner::new(cfg, ScriptedChecker::default());
    let models = planner.encode_only(&index, horizon, out.path()).unwrap();
    assert_eq!(models.len(), 2);
    assert!(planner.checker.checked().is_empty());

    let t1 = std::fs::read_to_string(out.path().join("t1").join("model.prism")).unwrap();
    assert!(t1.contains("[A25994S12__1] ((t >= 1) & (t < 2)) & t < finalTime ->"));
    let property = std::fs::read_to_string(out.path().join("t1").join("property.props")).unwrap();
    assert_eq!(
        property,
        "multi(Pmax=? [ G allM ], R{\"numAgents\"}min=? [ C ])\n"
    );
}

#[test]
fn scratch_directories() {
    let team = Team::loads(AQUA).unwrap();
    let passes = access(&[("Aqua", "AMSR", 0.0, 3_600.0)]);

    for keep_scratch in [false, true] {
        let scratch = tempfile::tempdir().unwrap();
        let cfg = PlannerConfig::builder()
            .scratch_dir(scratch.path())
            .show_progress(false)
            .keep_scratch(keep_scratch)
            .build();
        let (index, horizon) = index_mission(&team, &mission(1), &passes, &dictionary(), &cfg).unwrap();

        let checker = ScriptedChecker::new([(
            0,
            single_sensor_canned("a27424_s31__1", "A27424S31__1", 0, 0.8),
        )]);
        MissionPlanner::new(cfg, checker).plan(&index, horizon).unwrap();

        let left: Vec<_> = std::fs::read_dir(scratch.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        if keep_scratch {
            assert_eq!(left.len(), 1);
            assert!(left[0].file_name().unwrap().to_string_lossy().starts_with("t0-"));
            assert!(left[0].join("checker.log").exists());
            assert!(left[0].join("adv1.tra").exists());
        } else {
            assert!(left.is_empty());
        }
    }
}
