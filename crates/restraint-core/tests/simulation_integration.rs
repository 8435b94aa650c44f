use restraint_core::{
    rng::create_rng, EvolveError, Multicell, MulticellConfig, Population, SampleCache,
};
use std::fs::File;
use std::io::Write;

fn quick_config() -> MulticellConfig {
    MulticellConfig {
        cells_side: 4,
        time_range: 10.0,
        neighbors: 4,
        restrain: 0,
        start_ones: 5,
        genome_size: 10,
        mut_prob: 0.0,
        ..MulticellConfig::default()
    }
}

#[test]
fn seeded_multicell_runs_are_reproducible_across_configs() {
    for neighbors in [0, 2, 4, 6, 8] {
        let cfg = MulticellConfig {
            neighbors,
            ..quick_config()
        };
        let mut rng_a = create_rng(0xDEAD);
        let mut rng_b = create_rng(0xDEAD);
        let mut mc_a = Multicell::new(cfg.clone()).expect("mc_a");
        let mut mc_b = Multicell::new(cfg).expect("mc_b");
        let middle = mc_a.middle_pos();
        mc_a.inject_ancestor(&mut rng_a, middle);
        mc_b.inject_ancestor(&mut rng_b, middle);
        let a = mc_a.run(&mut rng_a);
        let b = mc_b.run(&mut rng_b);
        assert_eq!(a.run_time, b.run_time, "neighbors={neighbors}");
        assert_eq!(a.cell_counts, b.cell_counts, "neighbors={neighbors}");
        assert_eq!(a.count_cells(), 16.0, "neighbors={neighbors}");
    }
}

#[test]
fn evolution_over_a_shared_kernel_is_reproducible() {
    let run = |seed: u64| {
        let mut rng = create_rng(seed);
        let mut multicell = Multicell::new(quick_config()).expect("multicell");
        multicell.cfg.mut_prob = 0.5;
        let mut population = Population::new(6, 5, SampleCache::new(3, false));
        population
            .run(&mut rng, &mut multicell, 4.0, None, false)
            .expect("evolution run");
        population.orgs().to_vec()
    };
    assert_eq!(run(0xBEEF), run(0xBEEF));
}

#[test]
fn preloaded_single_sample_drives_the_whole_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut file = File::create(dir.path().join("5.dat")).expect("sample file");
    writeln!(file, "250.0").expect("write sample");

    let mut cache = SampleCache::new(1, false);
    cache.load_dir(dir.path(), 5, 5).expect("load samples");

    let mut rng = create_rng(7);
    let mut multicell = Multicell::new(quick_config()).expect("multicell");
    let mut population = Population::new(2, 5, cache);
    population
        .run(&mut rng, &mut multicell, 2.0, None, false)
        .expect("evolution run");

    // With one sample slot every draw hits the preloaded 250.0, so no live
    // simulation ever runs and every scheduled time is a multiple of it.
    assert_eq!(population.cache().len_for(5), 1);
    assert_eq!(multicell.num_cells(), 0);
    for org in population.orgs() {
        assert!(
            (org.repro_time % 250.0).abs() < 1e-9,
            "repro_time {} is not a multiple of 250",
            org.repro_time
        );
    }
}

#[test]
fn enforced_bounds_eventually_fail_on_a_partial_preload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut file = File::create(dir.path().join("5.dat")).expect("sample file");
    writeln!(file, "250.0").expect("write sample");

    let mut cache = SampleCache::new(5, true);
    cache.load_dir(dir.path(), 5, 5).expect("load samples");

    let mut rng = create_rng(8);
    let mut multicell = Multicell::new(quick_config()).expect("multicell");
    let mut population = Population::new(2, 5, cache);

    let mut saw_missing = false;
    for _ in 0..50 {
        match population.repro_duration(&mut rng, &mut multicell, 5) {
            Ok(duration) => assert_eq!(duration, 250.0),
            Err(EvolveError::MissingSample { num_ones }) => {
                assert_eq!(num_ones, 5);
                saw_missing = true;
                break;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(saw_missing, "a 4-in-5 miss chance never fired in 50 draws");
    assert_eq!(multicell.num_cells(), 0, "enforcement must block simulation");
}

#[test]
fn independent_runs_on_one_population_share_or_reset_the_cache() {
    let mut rng = create_rng(9);
    let mut multicell = Multicell::new(quick_config()).expect("multicell");
    let mut population = Population::new(3, 5, SampleCache::new(4, false));

    population
        .run(&mut rng, &mut multicell, 2.0, None, false)
        .expect("first run");
    let observed = population.cache().len_for(5);
    assert!(observed > 0);

    population.reset(3, 5, false);
    assert_eq!(population.cache().len_for(5), observed, "shared cache kept");

    population.reset(3, 5, true);
    assert_eq!(population.cache().len_for(5), 0, "independent cache cleared");
}
