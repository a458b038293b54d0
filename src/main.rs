use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rb_tree_map::RbTreeMap;

const DEFAULT_WORKLOAD: usize = 1000;
const SEED: u64 = 0x5eed;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    walkthrough();

    let n = workload_size();
    if !random_workload(n) {
        std::process::exit(1);
    }
}

fn workload_size() -> usize {
    match std::env::args().nth(1) {
        None => DEFAULT_WORKLOAD,
        Some(arg) => arg.parse().unwrap_or_else(|e| {
            warn!("ignoring workload size {:?}: {}", arg, e);
            DEFAULT_WORKLOAD
        }),
    }
}

fn walkthrough() {
    let mut map = RbTreeMap::new();

    info!("Start insertion:");
    let inserts = [
        (0, 'a'), // first node becomes the black root
        (5, 'b'),
        (10, 'c'), // right-right: rotate grandparent left
        (-5, 'd'), // red uncle: re-color up to the root
        (-10, 'e'), // left-left: rotate grandparent right
        (-3, 'f'), // red uncle: re-color
        (-2, 'g'), // left-right: rotate parent left, then left-left
        (-1, 'h'), // re-color, then left-right
        (-7, 'i'),
        (-9, 'j'), // right-left: rotate parent right, then right-right
        (0, 'k'), // overwrite, no rebalancing
    ];
    for (key, value) in inserts {
        info!("Before set({}, {}):\n{}", key, value, map.dump());
        map.insert(key, value);
        info!("After set({}, {}):\n{}", key, value, map.dump());
    }

    info!("Do search:");
    for key in [0, 5, 10, -5, -10, -3, -2, -1, -7, -9, 31] {
        info!("get({}) = {:?}", key, map.get(&key));
    }

    let ascending: Vec<String> = map.keys().map(|k| k.to_string()).collect();
    info!("Keys in increasing order: {}", ascending.join(" "));
    let descending: Vec<String> = map.keys_rev().map(|k| k.to_string()).collect();
    info!("Keys in decreasing order: {}", descending.join(" "));

    info!("Start deletion:");
    for key in [0, -10, -9, -2] {
        info!("Before removal of {}:\n{}", key, map.dump());
        map.remove(&key);
        info!("After removal of {}:\n{}", key, map.dump());
    }
}

fn random_workload(n: usize) -> bool {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut keys: Vec<usize> = (0..n).collect();
    keys.shuffle(&mut rng);

    let mut map: RbTreeMap<usize, usize> = keys.iter().map(|&k| (k, k * k)).collect();
    let bound = 2.0 * ((n + 1) as f64).log2();
    match map.check_invariants() {
        Ok(black_height) => info!(
            "{} random keys: height {} (bound {:.1}), black-height {}",
            map.len(),
            map.height(),
            bound,
            black_height
        ),
        Err(e) => {
            error!("invariant violated after random inserts: {}", e);
            return false;
        }
    }

    for &k in keys.iter().step_by(2) {
        map.remove(&k);
    }
    match map.check_invariants() {
        Ok(black_height) => {
            info!(
                "after removing half: {} keys, height {}, black-height {}",
                map.len(),
                map.height(),
                black_height
            );
            true
        }
        Err(e) => {
            error!("invariant violated after random removals: {}", e);
            false
        }
    }
}
