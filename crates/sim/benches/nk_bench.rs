use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mabe_sim::base::{BitVector, Random};
use mabe_sim::modules::{EvalNk, NkLandscape, SelectElite};
use mabe_sim::orgs::BitsOrg;
use mabe_sim::simulation::Mabe;

fn nk_run(pop_size: usize, parallel: bool) -> Mabe {
    let mut mabe = Mabe::new(42);
    mabe.add_population("main_pop", 0).unwrap();
    mabe.add_organism_type::<BitsOrg>("bits_org").unwrap();
    mabe.add_module(EvalNk::new("eval_nk")).unwrap();
    mabe.add_module(SelectElite::new("elite").with_counts(5, pop_size / 5)).unwrap();
    mabe.set_option("eval_nk", "parallel", parallel).unwrap();
    mabe.setup().unwrap();
    mabe.inject("main_pop", "bits_org", pop_size).unwrap();
    mabe
}

fn bench_landscape(c: &mut Criterion) {
    let mut group = c.benchmark_group("nk_landscape");
    let mut rng = Random::new(7);

    for k in [0, 2, 8] {
        let landscape = NkLandscape::new(100, k, &mut rng);
        let mut bits = BitVector::new(100);
        bits.randomize(&mut rng);
        group.bench_with_input(BenchmarkId::new("fitness", k), &k, |b, _| {
            b.iter(|| black_box(landscape.fitness(black_box(&bits))))
        });
    }

    group.bench_function("build_n100_k8", |b| {
        b.iter(|| black_box(NkLandscape::new(100, 8, &mut rng)))
    });

    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("nk_evaluation");
    let pop_size = 1000;
    group.throughput(Throughput::Elements(pop_size as u64));

    for parallel in [false, true] {
        let mut mabe = nk_run(pop_size, parallel);
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| black_box(mabe.call_function("eval_nk", "EVAL", &[]).unwrap()))
        });
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("nk_generation");
    let pop_size = 200;
    let generations = 10;
    group.throughput(Throughput::Elements((pop_size * generations) as u64));

    group.bench_with_input(
        BenchmarkId::new("update", generations),
        &generations,
        |b, &gens| {
            b.iter_batched(
                || nk_run(pop_size, true),
                |mut mabe| {
                    mabe.update(gens).unwrap();
                    black_box(mabe)
                },
                criterion::BatchSize::SmallInput,
            )
        },
    );

    group.finish();
}

criterion_group!(benches, bench_landscape, bench_evaluation, bench_generation);
criterion_main!(benches);
