use crate::{access, dictionary, mission};
use approx::assert_abs_diff_eq;
use rstest::*;
use satplan::io::ConfigRepr;
use satplan::mdp::{Assignment, EncodedModel, Naming, ProbabilityModel, StateSpace};
use satplan::planner::index_mission;
use satplan::team::{VisibilitySchedule, VisibilityWindow};
use satplan::{PlannerConfig, Team, TeamIndex};

fn two_agents(p_aqua: f64, p_terra: f64) -> TeamIndex {
    let team = Team::loads(&format!(
        "Aqua:\n  - AMSR:\n      Sea ice: {p_aqua}\nTerra:\n  - MODIS:\n      Sea ice: {p_terra}\n      Cloud type: 0.5\n"
    ))
    .unwrap();
    let passes = access(&[
        ("Aqua", "AMSR", 0.0, 7_200.0),
        ("Terra", "MODIS", 3_600.0, 10_800.0),
    ]);
    let cfg = PlannerConfig::builder()
        .time_unit(satplan::io::TimeUnit::Hour)
        .build();
    index_mission(&team, &mission(1), &passes, &dictionary(), &cfg)
        .unwrap()
        .0
}

#[rstest]
#[case(0.8)]
#[case(0.35)]
#[case(1.0)]
fn single_cell_success_is_detection(#[case] p: f64) {
    let team = Team::loads(&format!("Aqua:\n  - AMSR:\n      Sea ice: {p}\n")).unwrap();
    let passes = access(&[("Aqua", "AMSR", 0.0, 3_600.0)]);
    let (index, _) =
        index_mission(&team, &mission(1), &passes, &dictionary(), &PlannerConfig::default()).unwrap();

    let space = StateSpace::enumerate(&index, true, 16).unwrap();
    assert_eq!(space.len(), 2);
    let model = ProbabilityModel::build(&index, &space, 0).unwrap();
    assert_eq!(model.retained().len(), 2);
    let single = Assignment::new(vec![(0, 0)]);
    assert_abs_diff_eq!(model.success_probability(&single).unwrap(), p, epsilon = 1e-12);
    assert_eq!(model.success_probability(&Assignment::empty()).unwrap(), 0.0);
}

#[rstest]
#[case(0.9, 0.7)]
#[case(0.1, 0.999)]
#[case(0.5, 0.5)]
fn probabilities_are_bounded(#[case] p_aqua: f64, #[case] p_terra: f64) {
    let index = two_agents(p_aqua, p_terra);
    let space = StateSpace::enumerate(&index, false, 16).unwrap();
    let model = ProbabilityModel::build(&index, &space, 0).unwrap();

    for assignment in space.iter() {
        let table = model.table(assignment).unwrap();
        let mut total = 0.0;
        for (_, expr) in &table.outcomes {
            let p = expr.evaluate(model.bindings()).unwrap();
            assert!((0.0..=1.0).contains(&p), "{expr} = {p}");
            total += p;
        }
        // Outcomes of an assignment are exhaustive
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn preprocessing_is_idempotent() {
    let first = two_agents(0.9, 0.7);
    let second = two_agents(0.9, 0.7);
    assert_eq!(first, second);
    let ids: Vec<&str> = first.sensors().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["s12__1", "s31__1"]);
}

#[test]
fn pruning_follows_overlap() {
    let index = two_agents(0.9, 0.7);
    // Hourly windows [0, 2) and [1, 3) overlap
    let pruned = StateSpace::enumerate(&index, true, 16).unwrap();
    assert_eq!(pruned.len(), 4);

    let rendered = {
        let model = ProbabilityModel::build(&index, &pruned, 0).unwrap();
        EncodedModel::new(&index, &model, 0, 3).render(Naming::Global)
    };
    assert!(rendered.contains("const int finalTime = 3;"));
    // Guards are sorted by schedule
    assert!(rendered.contains(
        "[A25994S12__1_A27424S31__1] ((t >= 0) & (t < 2)) & ((t >= 1) & (t < 3)) & t < finalTime ->"
    ));
}

#[rstest]
#[case(vec![(0, 2)], vec![(1, 3)])]
#[case(vec![(0, 2), (5, 9)], vec![(1, 6), (8, 10)])]
#[case(vec![(3, 4)], vec![(0, 1), (6, 7)])]
fn overlap_is_symmetric(#[case] a: Vec<(i64, i64)>, #[case] b: Vec<(i64, i64)>) {
    let schedule = |w: Vec<(i64, i64)>| {
        VisibilitySchedule::new(w.into_iter().map(|(s, e)| VisibilityWindow::new(s, e)).collect())
    };
    let (a, b) = (schedule(a), schedule(b));
    assert_eq!(a.overlap(&b), b.overlap(&a));
    assert_eq!(a.overlap(&a), a.duration());
    assert_eq!(b.overlap(&b), b.duration());
}
