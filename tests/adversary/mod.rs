use crate::{access, dictionary, mission};
use satplan::adversary::{summarize_strategies, AdversaryError, StateDecoder, StrategyFile};
use satplan::io::ConfigRepr;
use satplan::mdp::Naming;
use satplan::planner::index_mission;
use satplan::{PlannerConfig, Team, TeamIndex};
use std::path::{Path, PathBuf};

fn aqua() -> TeamIndex {
    let team = Team::loads("Aqua:\n  - AMSR:\n      Sea ice: 0.8\n").unwrap();
    let passes = access(&[("Aqua", "AMSR", 0.0, 3_600.0)]);
    index_mission(&team, &mission(1), &passes, &dictionary(), &PlannerConfig::default())
        .unwrap()
        .0
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn deterministic_step() {
    let dir = tempfile::tempdir().unwrap();
    let tra = write(dir.path(), "adv.tra", "2 1 1\n0 0 1 1.0 A1S1\n");
    let sta = write(dir.path(), "prod.sta", "(a1_s1,m1,t)\n0:(1,1,0)\n1:(1,1,1)\n");

    let path = StrategyFile::load(&tra).unwrap().most_likely_path().unwrap();
    assert_eq!(path.steps.len(), 1);
    assert_eq!(path.probability(), 1.0);

    let decoder = StateDecoder::new(&aqua(), Naming::Local);
    let summaries = summarize_strategies(&[tra], &sta, &decoder).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].probability, 1.0);
    assert_eq!(summaries[0].reward, 1.0);
    assert_eq!(summaries[0].actions, ["A1S1"]);
    assert!(summaries[0].plan[&0].contains("Aqua"));
}

#[test]
fn equivalent_strategies_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let sta = write(
        dir.path(),
        "prod.sta",
        "(a27424_s31__1,m4,t)\n0:(1,1,0)\n1:(1,1,1)\n2:(0,0,1)\n",
    );
    let strategies = vec![
        write(dir.path(), "adv1.tra", "0 0 1 0.8 A27424S31__1\n0 0 2 0.2 A27424S31__1\n"),
        write(dir.path(), "adv2.tra", "0 0 2 0.2 A27424S31__1\n0 0 1 0.8 A27424S31__1\n"),
        write(dir.path(), "adv3.tra", "0 0 2 1 NOAGENTS\n"),
    ];

    let decoder = StateDecoder::new(&aqua(), Naming::Global);
    let summaries = summarize_strategies(&strategies, &sta, &decoder).unwrap();
    let sources: Vec<&Path> = summaries.iter().map(|s| s.source.as_path()).collect();
    assert_eq!(sources, [strategies[0].as_path(), strategies[2].as_path()]);
    assert!(summaries[1].plan[&0].is_empty());
}

#[test]
fn unknown_state() {
    let dir = tempfile::tempdir().unwrap();
    let tra = write(dir.path(), "adv.tra", "0 0 5 1 A1S1\n");
    let sta = write(dir.path(), "prod.sta", "(a1_s1,m1,t)\n0:(1,1,0)\n");

    let decoder = StateDecoder::new(&aqua(), Naming::Local);
    let err = summarize_strategies(&[tra.clone()], &sta, &decoder).unwrap_err();
    assert!(matches!(err, AdversaryError::UnknownState { state: 5, .. }), "{err}");

    let err = summarize_strategies(&[tra], &dir.path().join("missing.sta"), &decoder).unwrap_err();
    assert!(matches!(err, AdversaryError::MissingStateFile { .. }), "{err}");
}
