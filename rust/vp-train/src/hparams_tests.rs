use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::hparams::{get_int, get_real, get_text, sample_config, HpDomain, HpSpec, HpValue};

fn space() -> Vec<HpSpec> {
    vec![
        HpSpec::discrete_ints("layer_a_size", [128, 192, 256]),
        HpSpec::int_range("epochs_warmup", 1, 4),
        HpSpec::real_range("dropout", 0.1, 0.33),
        HpSpec::discrete_texts("optimizer", ["adam", "rmsprop"]),
    ]
}

#[test]
fn sampled_values_stay_inside_their_domains() {
    let space = space();
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for _ in 0..200 {
        let cfg = sample_config(&space, &mut rng);
        assert!(matches!(
            cfg["layer_a_size"],
            HpValue::Int(128) | HpValue::Int(192) | HpValue::Int(256)
        ));
        match cfg["epochs_warmup"] {
            HpValue::Int(v) => assert!((1..=4).contains(&v)),
            ref other => panic!("int range sampled {other:?}"),
        }
        match cfg["dropout"] {
            HpValue::Real(v) => assert!((0.1..0.33).contains(&v)),
            ref other => panic!("real range sampled {other:?}"),
        }
        match &cfg["optimizer"] {
            HpValue::Text(v) => assert!(v == "adam" || v == "rmsprop"),
            other => panic!("discrete sampled {other:?}"),
        }
    }
}

#[test]
fn sampling_is_deterministic_per_seed() {
    let space = space();
    let a: Vec<_> = {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        (0..10).map(|_| sample_config(&space, &mut rng)).collect()
    };
    let b: Vec<_> = {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        (0..10).map(|_| sample_config(&space, &mut rng)).collect()
    };
    assert_eq!(a, b);
}

#[test]
fn discrete_sampling_covers_the_whole_set() {
    let space = vec![HpSpec::discrete_ints("x", [1, 2, 3])];
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..100 {
        if let HpValue::Int(v) = sample_config(&space, &mut rng)["x"] {
            seen.insert(v);
        }
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn int_range_is_inclusive_of_both_ends() {
    let spec = HpSpec::int_range("x", 0, 1);
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..100 {
        if let HpValue::Int(v) = spec.domain.sample(&mut rng) {
            seen.insert(v);
        }
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn degenerate_domains_fail_validation() {
    assert!(HpDomain::Discrete { values: vec![] }.validate().is_err());
    assert!(HpDomain::IntRange { lo: 5, hi: 4 }.validate().is_err());
    assert!(HpDomain::RealRange { lo: 1.0, hi: 1.0 }.validate().is_err());
    assert!(HpDomain::IntRange { lo: 4, hi: 4 }.validate().is_ok());
}

#[test]
fn typed_getters_enforce_kinds() {
    let space = space();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let cfg = sample_config(&space, &mut rng);
    assert!(get_int(&cfg, "layer_a_size").is_ok());
    assert!(get_real(&cfg, "dropout").is_ok());
    // Integers widen to reals.
    assert!(get_real(&cfg, "layer_a_size").is_ok());
    assert!(get_text(&cfg, "optimizer").is_ok());
    assert!(get_int(&cfg, "dropout").is_err());
    assert!(get_int(&cfg, "missing").is_err());
}
