//! Integration tests for properties that must hold across a whole run.

use mabe_sim::base::{BitVector, Random};
use mabe_sim::data::Access;
use mabe_sim::modules::{AnnotatePlacement, EvalNk, SelectElite};
use mabe_sim::orgs::BitsOrg;
use mabe_sim::simulation::{Mabe, OrgPosition};

fn elite_run(seed: u64, mut_prob: f64) -> Mabe {
    elite_run_with(seed, mut_prob, 3, 4)
}

fn elite_run_with(seed: u64, mut_prob: f64, top_k: usize, copies: usize) -> Mabe {
    let mut mabe = Mabe::new(seed);
    mabe.add_population("main_pop", 0).unwrap();
    mabe.add_population("side_pop", 0).unwrap();
    mabe.add_organism_type::<BitsOrg>("bits_org").unwrap();
    mabe.add_module(EvalNk::new("eval_nk").with_nk(24, 3)).unwrap();
    mabe.add_module(SelectElite::new("elite").with_counts(top_k, copies)).unwrap();
    mabe.add_module(AnnotatePlacement::new("annotate")).unwrap();
    mabe.set_option("bits_org", "init_length", 24).unwrap();
    mabe.set_option("bits_org", "mut_prob", mut_prob).unwrap();
    mabe.setup().unwrap();
    mabe.inject("main_pop", "bits_org", 30).unwrap();
    mabe.inject("side_pop", "bits_org", 5).unwrap();
    mabe
}

fn bits_of(mabe: &Mabe, pos: OrgPosition) -> BitVector {
    mabe.world()
        .org(pos)
        .unwrap()
        .genome::<BitsOrg>()
        .unwrap()
        .bits()
        .clone()
}

#[test]
fn test_every_organism_shares_the_run_layout() {
    let mut mabe = elite_run(11, 0.05);
    mabe.update(5).unwrap();

    let layout_id = mabe.traits().layout().unwrap().id();
    for pop in mabe.world().populations() {
        assert_eq!(pop.layout().unwrap().id(), layout_id);
        for (_, org) in pop.iter_alive() {
            assert_eq!(org.data_map().layout_id(), Some(layout_id));
        }
    }
}

#[test]
fn test_every_trait_has_a_single_writer() {
    let mabe = elite_run(11, 0.05);
    for info in mabe.traits().iter() {
        let writers = info.count(Access::Owned) + info.count(Access::Generated);
        assert_eq!(writers, 1, "trait {}", info.name());
        let owner = info.owner().unwrap();
        for decl in info.declarations() {
            if decl.access() == Access::Required {
                assert_eq!(decl.trait_type(), owner.trait_type(), "trait {}", info.name());
            }
        }
    }
    let owner = |name: &str| {
        mabe.traits()
            .iter()
            .find(|info| info.name() == name)
            .and_then(|info| info.owner())
            .map(|decl| decl.module().to_string())
    };
    assert_eq!(owner("bits").as_deref(), Some("bits_org"));
    assert_eq!(owner("fitness").as_deref(), Some("eval_nk"));
    assert_eq!(owner("org_pos").as_deref(), Some("annotate"));
}

#[test]
fn test_births_match_requests_and_sizes_hold() {
    let mut mabe = elite_run(4, 0.05);
    let summary = mabe.update(6).unwrap();

    for report in &summary.reports {
        assert_eq!(report.births, 12);
    }
    assert_eq!(summary.births(), 72);
    assert_eq!(mabe.world().population(0).unwrap().size(), 30);
    assert_eq!(mabe.world().population(0).unwrap().num_alive(), 30);
    assert_eq!(mabe.world().population(1).unwrap().num_alive(), 5);
}

#[test]
fn test_nk_fitness_is_deterministic_for_a_seed() {
    let scores = |seed: u64| {
        let mut mabe = elite_run(seed, 0.05);
        mabe.call_function("eval_nk", "EVAL", &[]).unwrap();
        mabe.world()
            .population(0)
            .unwrap()
            .iter_alive()
            .map(|(_, org)| org.get_trait::<f64>("fitness").unwrap().to_bits())
            .collect::<Vec<_>>()
    };
    assert_eq!(scores(99), scores(99));
    assert_ne!(scores(99), scores(100));
}

#[test]
fn test_elite_best_never_drops_without_mutation() {
    let mut mabe = elite_run_with(23, 0.0, 1, 10);
    let summary = mabe.update(8).unwrap();
    let scores = summary.best_scores("eval_nk");
    assert_eq!(scores.len(), 8);
    for pair in scores.windows(2) {
        assert!(pair[1] >= pair[0], "{scores:?}");
    }
}

#[test]
fn test_mutation_count_matches_hamming_distance() {
    let mut mabe = elite_run(31, 0.3);
    let manager = mabe.world().manager("bits_org").unwrap().clone();
    let mut rng = Random::new(5);
    for _ in 0..50 {
        let mut org = manager.make_random(&mut rng);
        let before = org.genome::<BitsOrg>().unwrap().bits().clone();
        let changed = org.mutate(&mut rng);
        let after = org.genome::<BitsOrg>().unwrap().bits();
        assert_eq!(before.hamming(after), changed);
    }

    // Offspring produced during a run obey the same rule.
    let parent = OrgPosition::new(0, 0);
    let before = bits_of(&mabe, parent);
    let (child, changed) = mabe.world_mut().make_offspring(parent).unwrap();
    assert_eq!(before.hamming(child.genome::<BitsOrg>().unwrap().bits()), changed);
}

#[test]
fn test_clone_and_offspring_identity() {
    let mut mabe = elite_run(37, 0.2);
    mabe.update(1).unwrap();
    let manager = mabe.world().manager("bits_org").unwrap().clone();
    let parent = mabe.world().org(OrgPosition::new(0, 0)).unwrap().clone();

    let copy = manager.clone_org(&parent);
    assert_eq!(copy.genome::<BitsOrg>(), parent.genome::<BitsOrg>());
    assert_eq!(
        *copy.get_trait::<f64>("fitness").unwrap(),
        *parent.get_trait::<f64>("fitness").unwrap()
    );
    assert_eq!(
        *copy.get_trait::<OrgPosition>("org_pos").unwrap(),
        *parent.get_trait::<OrgPosition>("org_pos").unwrap()
    );

    let mut rng = Random::new(77);
    let mut replay = rng.clone();
    let (child, _) = manager.make_offspring(&parent, &mut rng);
    let mut expected = manager.clone_org(&parent);
    expected.mutate(&mut replay);
    assert_eq!(child.genome::<BitsOrg>(), expected.genome::<BitsOrg>());
}
