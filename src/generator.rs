//! Seeded package generation. Same seed, same pile.

use std::ops::RangeInclusive;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::types::{Package, PackageId, STATION_COUNT, StationKind};

/// Draw the number of packages for this run from the configured bounds.
pub fn package_count<R: Rng + ?Sized>(rng: &mut R, bounds: &RangeInclusive<usize>) -> usize {
    if bounds.start() == bounds.end() {
        return *bounds.start();
    }
    rng.gen_range(bounds.clone())
}

/// Build `count` packages with ids `1..=count`, each with 1 to 4 distinct stations.
pub fn generate_packages<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Package> {
    (1..=count as PackageId)
        .map(|id| {
            let steps = rng.gen_range(1..=STATION_COUNT);
            let mut kinds = StationKind::ALL;
            let (picked, _) = kinds.partial_shuffle(&mut *rng, steps);
            let instructions = picked.to_vec();
            let fragile = rng.gen_bool(0.5);
            Package::new(id, instructions, fragile)
        })
        .collect()
}
