use std::collections::HashSet;

use carsure_core::DamageRegion;

/// Concatenates model-declared regions with detector regions so that every
/// id in the result is unique.
///
/// The first model region with a given id keeps it; later repeats become
/// `{id}_2`, `{id}_3`, ... A detector region whose id is already taken is
/// renamed `{id}_cnn`, then `{id}_cnn2`, `{id}_cnn3`, ... Overlapping boxes
/// are not deduplicated.
#[must_use]
pub fn merge_regions(llm: Vec<DamageRegion>, detector: Vec<DamageRegion>) -> Vec<DamageRegion> {
    let mut taken: HashSet<String> = HashSet::with_capacity(llm.len() + detector.len());
    let mut merged = Vec::with_capacity(llm.len() + detector.len());

    for mut region in llm {
        if taken.contains(&region.id) {
            region.id = next_free(&taken, &region.id, |n| format!("_{n}"), 2);
        }
        taken.insert(region.id.clone());
        merged.push(region);
    }
    for mut region in detector {
        if taken.contains(&region.id) {
            region.id = next_free(&taken, &region.id, cnn_suffix, 1);
        }
        taken.insert(region.id.clone());
        merged.push(region);
    }
    merged
}

fn cnn_suffix(n: u32) -> String {
    if n == 1 {
        "_cnn".to_string()
    } else {
        format!("_cnn{n}")
    }
}

fn next_free(taken: &HashSet<String>, base: &str, suffix: impl Fn(u32) -> String, first: u32) -> String {
    let mut n = first;
    loop {
        let candidate = format!("{base}{}", suffix(n));
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
