use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use rand::prelude::*;
use rand_pcg::Pcg64;

use dag_lower_bound::config::EstimatorConfig;
use dag_lower_bound::critical_path::{critical_path, CriticalPathMode};
use dag_lower_bound::dag::DAG;
use dag_lower_bound::error::LowerBoundError;
use dag_lower_bound::experiment::{Experiment, Outcome};
use dag_lower_bound::lower_bound::{makespan_lower_bound, Bound};
use dag_lower_bound::modcp::ModCpMode;
use dag_lower_bound::parsers::{ResourceRecord, TraceSubject};
use dag_lower_bound::partition::cut_dags;
use dag_lower_bound::resource::{read_capacities, ResourceCapacity};
use dag_lower_bound::run_stats::{percentile, ResultSummary};
use dag_lower_bound::stages::Stages;

const PRECISION: f64 = 1e-9;

fn assert_float_eq(x: f64, y: f64) {
    assert!(
        (x - y).abs() < PRECISION || (x.max(y) - x.min(y)) / x.min(y) < PRECISION,
        "Values do not match: {:.15} vs {:.15}",
        x,
        y
    );
}

const RESOURCES: [&str; 3] = ["core", "memory", "nic"];

fn gen_capacities(rng: &mut Pcg64) -> ResourceCapacity {
    RESOURCES
        .iter()
        .map(|kind| (kind.to_string(), rng.gen_range(1..100) as f64))
        .collect()
}

/// Generates a random DAG, dependencies always go from a smaller to a larger id in a random permutation.
fn gen_dag(rng: &mut Pcg64, num_tasks: usize, edge_probability: f64) -> DAG {
    let mut dag = DAG::new();
    for i in 0..num_tasks {
        let mut resources = BTreeMap::new();
        for kind in RESOURCES {
            if rng.gen_bool(0.7) {
                resources.insert(kind.to_string(), rng.gen_range(0.0..10.0));
            }
        }
        dag.add_task(&i.to_string(), rng.gen_range(0.0..100.0), resources, rng.gen_range(1..5));
    }

    let mut tasks_topsort: Vec<usize> = (0..num_tasks).collect();
    tasks_topsort.shuffle(rng);
    for i in 0..num_tasks {
        for j in i + 1..num_tasks {
            if rng.gen_bool(edge_probability) {
                dag.add_dependency(tasks_topsort[i], tasks_topsort[j]);
            }
        }
    }
    dag
}

fn gen_chain_of_blocks(rng: &mut Pcg64, num_blocks: usize) -> DAG {
    // blocks of parallel tasks joined through single tasks, so that the DAG has many cut points
    let mut dag = DAG::new();
    let mut joint: Option<usize> = None;
    for block in 0..num_blocks {
        let width = rng.gen_range(1..4);
        let next_joint = dag.add_task(&format!("j{}", block), rng.gen_range(0.0..10.0), BTreeMap::new(), 1);
        for i in 0..width {
            let resources = BTreeMap::from([("core".to_string(), rng.gen_range(0.0..4.0))]);
            let task = dag.add_task(&format!("b{}_{}", block, i), rng.gen_range(0.0..10.0), resources, 1);
            if let Some(joint) = joint {
                dag.add_dependency(joint, task);
            }
            dag.add_dependency(task, next_joint);
        }
        joint = Some(next_joint);
    }
    dag
}

#[test]
fn test_critical_path_modes_agree() {
    let mut rng = Pcg64::seed_from_u64(123);
    for _ in 0..50 {
        let num_tasks = rng.gen_range(1..10);
        let dag = gen_dag(&mut rng, num_tasks, 0.3);
        let dp = critical_path(&dag, CriticalPathMode::Dp, None).unwrap();
        let enumeration = critical_path(&dag, CriticalPathMode::Enumeration, None).unwrap();
        assert_float_eq(dp.length, enumeration.length);

        // the witness path is a real path of the reported length
        for pair in dp.path.windows(2) {
            assert!(dag.successors(pair[0]).contains(&pair[1]));
        }
        let length: f64 = dp.path.iter().map(|&t| dag.get_task(t).duration).sum();
        assert_float_eq(length, dp.length);
    }
}

#[test]
fn test_stages_are_deterministic() {
    let mut rng = Pcg64::seed_from_u64(7);
    for _ in 0..20 {
        let dag = gen_dag(&mut rng, 30, 0.1);
        let stages = Stages::new(&dag).unwrap();
        assert_eq!(Stages::new(&dag).unwrap(), stages);

        let mut seen = vec![false; dag.task_count()];
        for (index, tasks) in stages.iter() {
            for &task in tasks {
                assert!(!seen[task]);
                seen[task] = true;
                // the stage index is the number of tasks in the longest chain ending at the task
                let expected = dag
                    .predecessors(task)
                    .iter()
                    .map(|&pred| stages.stage_of(pred) + 1)
                    .max()
                    .unwrap_or(1);
                assert_eq!(index, expected);
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }
}

#[test]
fn test_partition_properties() {
    let mut rng = Pcg64::seed_from_u64(42);
    for iteration in 0..40 {
        let size = rng.gen_range(1..15);
        let dag = if iteration % 2 == 0 {
            gen_chain_of_blocks(&mut rng, size / 3 + 1)
        } else {
            gen_dag(&mut rng, size, 0.4)
        };
        let pieces = cut_dags(&dag).unwrap();

        let mut piece_of: HashMap<String, usize> = HashMap::new();
        for (i, piece) in pieces.iter().enumerate() {
            assert!(!piece.is_empty());
            for task in piece.get_tasks() {
                assert!(piece_of.insert(task.name.clone(), i).is_none(), "task {} is duplicated", task.name);
            }
        }
        assert_eq!(piece_of.len(), dag.task_count());

        for task in 0..dag.task_count() {
            let name = &dag.get_task(task).name;
            let ancestors = dag.ancestors(task).unwrap();
            for &succ in dag.successors(task) {
                assert!(piece_of[name] <= piece_of[&dag.get_task(succ).name]);
            }
            // every task of an earlier piece must precede every task of a later one
            for other in 0..dag.task_count() {
                if piece_of[&dag.get_task(other).name] < piece_of[name] {
                    assert!(ancestors.contains(&other));
                }
            }
        }

        let inner_edges: usize = pieces.iter().map(|p| p.edge_count()).sum();
        assert!(inner_edges <= dag.edge_count());
    }
}

#[test]
fn test_partition_never_lowers_bound() {
    let mut rng = Pcg64::seed_from_u64(2024);
    let modes = [
        (ModCpMode::Staged, ModCpMode::Path),
        (ModCpMode::Path, ModCpMode::Staged),
        (ModCpMode::Staged, ModCpMode::Staged),
    ];
    for iteration in 0..60 {
        let size = rng.gen_range(1..10);
        let dag = if iteration % 2 == 0 {
            gen_chain_of_blocks(&mut rng, size / 2 + 1)
        } else {
            gen_dag(&mut rng, size, 0.5)
        };
        let capacities = gen_capacities(&mut rng);
        let (modcp_mode, piece_modcp_mode) = modes[iteration % modes.len()];
        let config = EstimatorConfig {
            modcp_mode,
            piece_modcp_mode,
            ..EstimatorConfig::default()
        };
        let plain = makespan_lower_bound(&dag, &capacities, &config).unwrap();
        let partitioned = makespan_lower_bound(
            &dag,
            &capacities,
            &EstimatorConfig {
                partition: true,
                ..config
            },
        )
        .unwrap();
        assert_eq!(plain.bound, partitioned.bound);

        let whole = partitioned.bound.value();
        let new_lb = partitioned.new_lb.unwrap();
        assert!(
            new_lb >= whole - PRECISION * whole.max(1.),
            "NewLB {} is below the whole DAG bound {} ({} pieces)",
            new_lb,
            whole,
            partitioned.pieces
        );
        assert_float_eq(partitioned.lower_bound, new_lb.max(whole));
    }
}

#[test]
fn test_chain_new_lb() {
    let mut rng = Pcg64::seed_from_u64(5);
    let mut dag = DAG::new();
    for i in 0..8 {
        let resources = BTreeMap::from([("core".to_string(), rng.gen_range(0.0..2.0))]);
        dag.add_task(&i.to_string(), rng.gen_range(0.0..10.0), resources, 1);
        if i > 0 {
            dag.add_dependency(i - 1, i);
        }
    }
    let capacities = ResourceCapacity::from([("core".to_string(), 1.)]);
    let report = makespan_lower_bound(&dag, &capacities, &EstimatorConfig::with_partition()).unwrap();
    assert_eq!(report.pieces, 8);
    assert!(report.new_lb.unwrap() >= report.bound.value() - PRECISION);

    let whole = Bound::new(&dag, &capacities, CriticalPathMode::Dp, ModCpMode::Staged, None).unwrap();
    assert_eq!(whole, report.bound);
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn write_trace(dir: &Path) {
    write(
        dir,
        "adjacency_lists.json",
        r#"{
            "t1": {"a": ["b", "c"], "b": ["d"], "c": ["d"]},
            "t2": {"x": ["y"], "y": ["x"]},
            "t3": {"1": [2]}
        }"#,
    );
    write(
        dir,
        "duration_dict.json",
        r#"{
            "t1": {"a": 1, "b": 2, "c": 3, "d": 1},
            "t2": {"x": 1, "y": 1},
            "t3": {"1": 5}
        }"#,
    );
    write(
        dir,
        "duration_resource_dict.json",
        r#"{
            "t1": [
                {"task": "a", "details": {"duration": 1, "resources": {"core": 2, "memory": 1}}},
                {"task": "b", "duration": 2, "resources": {"core": 1}, "task_count": 3}
            ],
            "t3": [{"task": 1, "details": {"duration": 5, "resources": {"core": 1}}}]
        }"#,
    );
    write(dir, "resource_dict.json", r#"{"core": 4, "memory": 0}"#);
    write(dir, "tenant_ids.txt", "t1\nt2\n\nt3\nt4\n");
}

#[test]
fn test_experiment() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path());
    write(
        dir.path(),
        "experiment.yaml",
        "adjacency: adjacency_lists.json\n\
         durations: duration_dict.json\n\
         resources: duration_resource_dict.json\n\
         capacities: resource_dict.json\n\
         subjects: tenant_ids.txt\n\
         estimator:\n  partition: true\n",
    );

    let experiment = Experiment::load(dir.path().join("experiment.yaml")).unwrap();
    assert_eq!(experiment.len(), 4);
    assert!(experiment.config().partition);
    let results = experiment.run(2);
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2", "t3", "t4"]);

    let t1 = results[0].report().unwrap();
    assert_eq!(results[0].tasks, 4);
    assert_eq!(results[0].edges, 4);
    // c and d have durations but no resource records
    assert_eq!(results[0].missing_tasks, 2);
    assert_eq!(results[0].missing_durations, 0);
    assert_eq!(results[0].missing_resources, 2);
    assert_eq!(results[0].depth, Some(3));
    assert_eq!(results[0].width, Some(2));
    assert_eq!(t1.bound.cplen, 5.);
    // core: (1 * 2 + 2 * 1 * 3) / 4, memory has zero capacity
    assert_eq!(t1.bound.twork, 2.);
    assert_eq!(t1.bound.modcp, 5.);
    assert_eq!(t1.pieces, 2);
    assert_eq!(t1.new_lb, Some(5.));
    assert_eq!(t1.lower_bound, 5.);

    assert!(results[1].is_failed());
    match &results[1].outcome {
        Outcome::Failed { error } => assert!(error.contains("Cycle")),
        Outcome::Ok(_) => unreachable!(),
    }

    let t3 = results[2].report().unwrap();
    assert_eq!(results[2].tasks, 2);
    assert_eq!(results[2].missing_tasks, 1);
    assert_eq!(results[2].missing_durations, 1);
    assert_eq!(results[2].missing_resources, 1);
    assert_eq!(results[2].depth, Some(2));
    assert_eq!(t3.bound.cplen, 5.);
    assert_eq!(t3.bound.twork, 1.25);

    assert!(results[3].is_failed());

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json[0]["id"], "t1");
    assert_eq!(json[0]["CPLen"], 5.);
    assert_eq!(json[0]["LowerBound"], 5.);
    assert_eq!(json[0]["NewLB"], 5.);
    assert!(json[1]["error"].as_str().is_some());
    assert!(json[1].get("LowerBound").is_none());
    assert!(json[1].get("depth").is_none());
    assert_eq!(json[0]["missing_resources"], 2);

    let summary = ResultSummary::new(&results);
    assert_eq!(summary.subjects, 4);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.incomplete, 2);
    assert_eq!(summary.missing_tasks, 3);
    assert_eq!(summary.missing_durations, 1);
    assert_eq!(summary.missing_resources, 3);
    assert_eq!(summary.depth.avg, 2.5);
    assert_eq!(summary.improved_by_partition, 0);
    assert_eq!(summary.lower_bound.avg, 5.);
    assert_eq!(summary.lower_bound_p95, 5.);
    assert_eq!(summary.cplen.max, 5.);
}

#[test]
fn test_trace_subject_partial_records() {
    let subject = TraceSubject {
        id: "s".to_string(),
        adjacency: [
            ("a".to_string(), vec!["b".to_string()]),
            ("b".to_string(), vec!["c".to_string()]),
        ]
        .into_iter()
        .collect::<IndexMap<_, _>>(),
        durations: HashMap::from([("a".to_string(), 2.), ("b".to_string(), 3.)]),
        resources: vec![
            ResourceRecord {
                task: "a".to_string(),
                duration: Some(2.),
                resources: BTreeMap::from([("core".to_string(), 1.)]),
                task_count: 1,
            },
            ResourceRecord {
                task: "c".to_string(),
                duration: None,
                resources: BTreeMap::from([("core".to_string(), 4.)]),
                task_count: 2,
            },
        ],
    };
    let dag = subject.to_dag();
    assert_eq!(dag.task_names(), vec!["a", "b", "c"]);

    let a = dag.get_task(dag.task_id("a").unwrap());
    assert!(!a.is_incomplete());
    let b = dag.get_task(dag.task_id("b").unwrap());
    assert_eq!(b.duration, 3.);
    assert_eq!(b.demand("core"), 0.);
    assert!(!b.missing_duration);
    assert!(b.missing_resources);
    let c = dag.get_task(dag.task_id("c").unwrap());
    assert_eq!(c.duration, 0.);
    assert_eq!(c.task_count, 2);
    assert!(c.missing_duration);
    assert!(!c.missing_resources);

    assert_eq!(dag.missing_task_count(), 2);
    assert_eq!(dag.missing_duration_count(), 1);
    assert_eq!(dag.missing_resources_count(), 1);
}

#[test]
fn test_experiment_all_subjects() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path());
    write(
        dir.path(),
        "experiment.yaml",
        "adjacency: adjacency_lists.json\n\
         durations: duration_dict.json\n\
         resources: duration_resource_dict.json\n\
         capacities: resource_dict.json\n",
    );
    let results = Experiment::load(dir.path().join("experiment.yaml")).unwrap().run(1);
    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().filter(|r| r.is_failed()).count(), 1);
    assert_eq!(results[0].report().unwrap().new_lb, None);
}

#[test]
fn test_experiment_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "experiment.yaml", "adjacency: a.json\ndurations: d.json\nresources: r.json\ncapacities: c.json\n");
    assert!(matches!(
        Experiment::load(dir.path().join("experiment.yaml")),
        Err(LowerBoundError::Io { .. })
    ));
}

#[test]
fn test_dag_from_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "dag.yaml",
        "tasks:\n\
         - name: extract\n  duration: 2\n  resources: {core: 0.1}\n  task_count: 50\n\
         - name: transform\n  duration: 10\n  dependencies: [extract]\n\
         - name: load\n  duration: 1\n  dependencies: [transform, extract]\n",
    );
    let dag = DAG::from_file(dir.path().join("dag.yaml")).unwrap();
    assert_eq!(dag.task_names(), vec!["extract", "transform", "load"]);
    assert_eq!(dag.edge_count(), 3);
    assert_eq!(dag.get_task(0).task_count, 50);
    assert_eq!(dag.get_task(0).demand("core"), 0.1);
    assert_eq!(dag.get_task(1).demand("core"), 0.);

    write(
        dir.path(),
        "dag.json",
        r#"{"tasks": [{"name": "a", "duration": 1}, {"name": "b", "duration": 2, "dependencies": ["a"]}]}"#,
    );
    let dag = DAG::from_file(dir.path().join("dag.json")).unwrap();
    assert_eq!(critical_path(&dag, CriticalPathMode::Dp, None).unwrap().length, 3.);

    write(dir.path(), "broken.yaml", "tasks:\n- name: a\n  dependencies: [ghost]\n");
    assert!(matches!(
        DAG::from_file(dir.path().join("broken.yaml")),
        Err(LowerBoundError::UnknownTask(name)) if name == "ghost"
    ));
    assert!(matches!(
        DAG::from_file(dir.path().join("dag.txt")),
        Err(LowerBoundError::UnsupportedFormat(_))
    ));
    write(dir.path(), "invalid.json", "{");
    assert!(matches!(
        DAG::from_file(dir.path().join("invalid.json")),
        Err(LowerBoundError::Json { .. })
    ));
}

#[test]
fn test_read_capacities() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "capacities.yaml", "core: 16\nmemory: 64.5\n");
    let capacities = read_capacities(dir.path().join("capacities.yaml")).unwrap();
    assert_eq!(capacities.get("core"), Some(&16.));
    assert_eq!(capacities.get("memory"), Some(&64.5));
}

#[test]
fn test_estimator_config_load() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "estimator.yaml",
        "partition: true\ncritical_path_mode: enumeration\nmax_enumerated_paths: 3\n",
    );
    let config = EstimatorConfig::load(dir.path().join("estimator.yaml")).unwrap();
    assert!(config.partition);
    assert_eq!(config.critical_path_mode, CriticalPathMode::Enumeration);
    assert_eq!(config.modcp_mode, ModCpMode::Staged);
    assert_eq!(config.max_enumerated_paths, Some(3));

    // the loaded path budget applies to the whole DAG
    let mut dag = DAG::new();
    for i in 0..3 {
        dag.add_task(&i.to_string(), 1., BTreeMap::new(), 1);
        if i > 0 {
            dag.add_dependency(i - 1, i);
        }
    }
    assert!(matches!(
        makespan_lower_bound(&dag, &ResourceCapacity::new(), &config),
        Err(LowerBoundError::EnumerationLimitExceeded { limit: 3 })
    ));

    write(dir.path(), "broken.yaml", "critical_path_mode: fastest\n");
    assert!(matches!(
        EstimatorConfig::load(dir.path().join("broken.yaml")),
        Err(LowerBoundError::Yaml { .. })
    ));
}

#[test]
fn test_percentile() {
    assert_eq!(percentile(&[], 95.), 0.);
    assert_eq!(percentile(&[3.], 95.), 3.);
    assert_eq!(percentile(&[1., 2., 3., 4., 5.], 50.), 3.);
    assert_float_eq(percentile(&[0., 10.], 95.), 9.5);
}
