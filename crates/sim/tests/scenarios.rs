//! End-to-end runs of complete configurations.

use mabe_sim::errors::{MabeError, SetupError};
use mabe_sim::modules::{AnnotatePlacement, EvalCountBits, EvalNk, SelectElite};
use mabe_sim::orgs::BitsOrg;
use mabe_sim::simulation::{Mabe, OrgPosition};

/// An NK run: one population, bit organisms of length `n`, NK evaluation
/// and elite selection filling the population each generation.
fn nk_run(seed: u64, n: usize, k: usize, pop_size: usize, mut_prob: f64) -> Mabe {
    let mut mabe = Mabe::new(seed);
    mabe.add_population("main_pop", pop_size).unwrap();
    mabe.add_organism_type::<BitsOrg>("bits_org").unwrap();
    mabe.add_module(EvalNk::new("eval_nk")).unwrap();
    mabe.add_module(SelectElite::new("elite")).unwrap();
    mabe.set_option("bits_org", "init_length", n).unwrap();
    mabe.set_option("bits_org", "mut_prob", mut_prob).unwrap();
    mabe.set_option("eval_nk", "N", n).unwrap();
    mabe.set_option("eval_nk", "K", k).unwrap();
    mabe.set_option("elite", "top_k", 1).unwrap();
    mabe.set_option("elite", "copies_per_winner", pop_size).unwrap();
    mabe
}

#[test]
fn test_nk_smoke_best_constant_without_mutation() {
    let mut mabe = nk_run(100, 30, 4, 100, 0.0);
    mabe.setup().unwrap();
    mabe.inject("main_pop", "bits_org", 100).unwrap();
    let summary = mabe.update(10).unwrap();

    let scores = summary.best_scores("eval_nk");
    assert_eq!(scores.len(), 10);
    assert!(scores[0] > 0.0);
    for score in &scores {
        assert_eq!(*score, scores[0]);
    }
    assert_eq!(summary.births(), 1000);
    assert_eq!(mabe.world().population(0).unwrap().num_alive(), 100);
}

#[test]
fn test_nk_converges_on_smooth_landscape() {
    let mut mabe = nk_run(1, 30, 0, 200, 1.0 / 30.0);
    mabe.setup().unwrap();
    mabe.inject("main_pop", "bits_org", 200).unwrap();
    let summary = mabe.update(100).unwrap();

    let scores = summary.best_scores("eval_nk");
    assert!(scores.windows(2).any(|w| w[1] > w[0]));
    let optimum = mabe
        .module::<EvalNk>("eval_nk")
        .unwrap()
        .landscape()
        .unwrap()
        .locus_max_bound();
    let last = *scores.last().unwrap();
    assert!(last <= optimum + 1e-12);
    assert!(optimum - last < 0.01, "best {last} vs optimum {optimum}");
}

#[test]
fn test_two_owners_fail_verification() {
    let mut mabe = nk_run(1, 10, 1, 0, 0.0);
    mabe.add_module(EvalCountBits::new("count")).unwrap();
    mabe.set_option("count", "score_trait", "fitness").unwrap();

    let err = mabe.setup().unwrap_err();
    assert!(matches!(err, MabeError::Setup(SetupError::DuplicateOwner { .. })));
    assert!(err.to_string().contains("duplicate owner: fitness"), "{err}");
    assert_eq!(err.name(), Some("fitness"));
    assert!(!mabe.is_setup());
}

#[test]
fn test_missing_bits_owner_fails_verification() {
    let mut mabe = Mabe::new(1);
    mabe.add_population("main_pop", 10).unwrap();
    mabe.add_module(EvalNk::new("eval_nk")).unwrap();

    let err = mabe.setup().unwrap_err();
    assert!(err.to_string().contains("no owner for trait: bits"), "{err}");
    assert_eq!(mabe.world().total_alive(), 0);
}

#[test]
fn test_placement_annotation_after_one_generation() {
    let mut mabe = nk_run(5, 20, 2, 50, 0.01);
    mabe.add_module(AnnotatePlacement::new("annotate")).unwrap();
    mabe.set_option("annotate", "target_pop", "main_pop").unwrap();
    mabe.setup().unwrap();
    mabe.inject("main_pop", "bits_org", 50).unwrap();
    mabe.update(1).unwrap();

    let pop = mabe.world().population(0).unwrap();
    assert_eq!(pop.num_alive(), 50);
    for (index, org) in pop.iter_alive() {
        let pos = org.get_trait::<OrgPosition>("org_pos").unwrap();
        assert_eq!(*pos, OrgPosition::new(0, index));
    }
}

#[test]
fn test_empty_collection_scores_zero_and_writes_nothing() {
    let mut mabe = nk_run(3, 12, 2, 0, 0.01);
    mabe.add_population("empty_pop", 5).unwrap();
    mabe.setup().unwrap();
    mabe.inject("main_pop", "bits_org", 4).unwrap();

    let best = mabe
        .call_function("eval_nk", "EVAL", &["empty_pop".into()])
        .unwrap();
    assert_eq!(best.as_f64(), Some(0.0));
    assert_eq!(mabe.world().eval_error_count(), 0);
    for (_, org) in mabe.world().population(0).unwrap().iter_alive() {
        assert_eq!(*org.get_trait::<f64>("fitness").unwrap(), 0.0);
    }
}

#[test]
fn test_failed_setup_clears_populations() {
    let mut mabe = nk_run(1, 10, 10, 8, 0.0);
    assert!(matches!(
        mabe.setup(),
        Err(MabeError::Setup(SetupError::InvalidOption { ref option, .. })) if option == "K"
    ));
    assert_eq!(mabe.world().total_alive(), 0);
}
