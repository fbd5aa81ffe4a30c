use crate::engines::generation::genome::{Gene, Genome};
use crate::functions::registry::OperationCatalog;
use rand::Rng;

/// Operators stop opening blocks below this depth and treat them as
/// opaque genes instead.
pub const MAX_OPERATOR_DEPTH: usize = 32;

/// Mutation: a fair coin picks point mutation or 1-5 structural edits.
pub fn mutate<R: Rng>(
    genes: &mut Vec<Gene>,
    mutation_rate: f64,
    catalog: &OperationCatalog,
    rng: &mut R,
) {
    if rng.gen_bool(0.5) {
        point_mutate(genes, mutation_rate, catalog, rng, 0);
    } else {
        structural_mutate(genes, catalog, rng);
    }
}

/// Every flat gene at every depth is redrawn with probability `mutation_rate`.
pub fn point_mutate<R: Rng>(
    genes: &mut [Gene],
    mutation_rate: f64,
    catalog: &OperationCatalog,
    rng: &mut R,
    depth: usize,
) {
    for gene in genes.iter_mut() {
        match gene {
            Gene::Block(inner) => {
                if depth < MAX_OPERATOR_DEPTH {
                    point_mutate(inner, mutation_rate, catalog, rng, depth + 1);
                }
            }
            Gene::Op(value) => {
                if rng.gen::<f64>() < mutation_rate {
                    *value = catalog.random_index(rng);
                }
            }
        }
    }
}

/// One to five rounds, each applying one uniformly chosen edit.
pub fn structural_mutate<R: Rng>(genes: &mut Vec<Gene>, catalog: &OperationCatalog, rng: &mut R) {
    let rounds = rng.gen_range(1..=5);
    for _ in 0..rounds {
        match rng.gen_range(0..4) {
            0 => insert_random_gene(genes, catalog, rng, 0),
            1 => remove_random_gene(genes, rng, 0),
            2 => swap_random_gene(genes, catalog, rng, 0),
            _ => modify_random_gene(genes, catalog, rng, 0),
        }
    }
}

/// Scans left to right, stopping at the first position picked with
/// probability `2 / len`.
fn pick_position<R: Rng>(len: usize, rng: &mut R) -> Option<usize> {
    let chance = 2.0 / len as f64;
    (0..len).find(|_| rng.gen::<f64>() < chance)
}

/// Inserts a random gene before the picked flat gene, or recurses into the
/// picked block. Appends at the end when nothing is picked.
pub fn insert_random_gene<R: Rng>(
    genes: &mut Vec<Gene>,
    catalog: &OperationCatalog,
    rng: &mut R,
    depth: usize,
) {
    match pick_position(genes.len(), rng) {
        Some(i) => {
            if depth < MAX_OPERATOR_DEPTH {
                if let Gene::Block(inner) = &mut genes[i] {
                    insert_random_gene(inner, catalog, rng, depth + 1);
                    return;
                }
            }
            genes.insert(i, Gene::Op(catalog.random_index(rng)));
        }
        None => genes.push(Gene::Op(catalog.random_index(rng))),
    }
}

/// Deletes the picked flat gene. A picked block is deleted whole or
/// recursed into with equal probability.
pub fn remove_random_gene<R: Rng>(genes: &mut Vec<Gene>, rng: &mut R, depth: usize) {
    let Some(i) = pick_position(genes.len(), rng) else {
        return;
    };
    if depth < MAX_OPERATOR_DEPTH && rng.gen_bool(0.5) {
        if let Gene::Block(inner) = &mut genes[i] {
            remove_random_gene(inner, rng, depth + 1);
            return;
        }
    }
    genes.remove(i);
}

/// Replaces the picked flat gene with a fresh catalog index.
pub fn swap_random_gene<R: Rng>(
    genes: &mut [Gene],
    catalog: &OperationCatalog,
    rng: &mut R,
    depth: usize,
) {
    let Some(i) = pick_position(genes.len(), rng) else {
        return;
    };
    match &mut genes[i] {
        Gene::Block(inner) if depth < MAX_OPERATOR_DEPTH => {
            swap_random_gene(inner, catalog, rng, depth + 1);
        }
        gene => *gene = Gene::Op(catalog.random_index(rng)),
    }
}

/// Nudges the picked flat gene by -1, 0 or +1 within the catalog range.
pub fn modify_random_gene<R: Rng>(
    genes: &mut [Gene],
    catalog: &OperationCatalog,
    rng: &mut R,
    depth: usize,
) {
    let Some(i) = pick_position(genes.len(), rng) else {
        return;
    };
    match &mut genes[i] {
        Gene::Block(inner) => {
            if depth < MAX_OPERATOR_DEPTH {
                modify_random_gene(inner, catalog, rng, depth + 1);
            }
        }
        Gene::Op(value) => {
            let nudged = value.saturating_add(rng.gen_range(-1..=1));
            *value = nudged.clamp(0, catalog.max_index());
        }
    }
}

/// Single-point crossover: swap top-level tails at a cut drawn from
/// `[0, min_len - 1]`. Blocks are never opened.
pub fn crossover<R: Rng>(
    parent1: &[Gene],
    parent2: &[Gene],
    rng: &mut R,
) -> (Vec<Gene>, Vec<Gene>) {
    let len = parent1.len().min(parent2.len());
    let point = if len == 0 { 0 } else { rng.gen_range(0..len) };

    let mut child1 = parent1[..point].to_vec();
    child1.extend_from_slice(&parent2[point..]);
    let mut child2 = parent2[..point].to_vec();
    child2.extend_from_slice(&parent1[point..]);

    (child1, child2)
}

/// Element-wise recombination over the aligned prefix of both parents.
/// Paired blocks are recombined recursively; anything else picks one
/// parent's gene by a fair coin.
pub fn crossover_splits<R: Rng>(
    parent1: &[Gene],
    parent2: &[Gene],
    rng: &mut R,
    depth: usize,
) -> Vec<Gene> {
    parent1
        .iter()
        .zip(parent2)
        .map(|pair| match pair {
            (Gene::Block(a), Gene::Block(b)) if depth < MAX_OPERATOR_DEPTH => {
                Gene::Block(crossover_splits(a, b, rng, depth + 1))
            }
            (a, b) => {
                if rng.gen_bool(0.5) {
                    a.clone()
                } else {
                    b.clone()
                }
            }
        })
        .collect()
}

/// Tournament selection: pick best of K random candidates
pub fn tournament_selection<'a, R: Rng>(
    population: &'a [Genome],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Genome {
    let score = |g: &Genome| g.cached_fitness().unwrap_or(f64::MIN);
    let mut best = &population[rng.gen_range(0..population.len())];

    for _ in 1..tournament_size {
        let candidate = &population[rng.gen_range(0..population.len())];
        if score(candidate) > score(best) {
            best = candidate;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::genome::gene_count;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat(values: &[i64]) -> Vec<Gene> {
        values.iter().map(|v| Gene::Op(*v)).collect()
    }

    fn single_block() -> Vec<Gene> {
        vec![Gene::Block(flat(&[16, 8, 8]))]
    }

    fn inner_values(genes: &[Gene]) -> Vec<i64> {
        match genes {
            [Gene::Block(inner)] => inner
                .iter()
                .map(|gene| match gene {
                    Gene::Op(value) => *value,
                    Gene::Block(_) => panic!("unexpected nested block"),
                })
                .collect(),
            other => panic!("expected a single block, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_mutate_applies_at_most_five_edits() {
        let catalog = OperationCatalog::sage();
        let original = flat(&[2; 20]);
        let mut changed = 0;
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut genes = original.clone();
            structural_mutate(&mut genes, &catalog, &mut rng);

            let delta = gene_count(&genes) as i64 - gene_count(&original) as i64;
            assert!(delta.abs() <= 5, "seed {} changed size by {}", seed, delta);
            assert!(genes.iter().all(|gene| !gene.is_block()));
            if genes != original {
                changed += 1;
            }
        }
        assert!(changed > 50);
    }

    #[test]
    fn test_remove_deletes_block_or_recurses() {
        let mut whole = 0;
        let mut inner = 0;
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut genes = single_block();
            remove_random_gene(&mut genes, &mut rng, 0);
            if genes.is_empty() {
                whole += 1;
                continue;
            }
            match inner_values(&genes).len() {
                2 => inner += 1,
                3 => {}
                len => panic!("block shrank to {}", len),
            }
        }
        assert!(whole > 0);
        assert!(inner > 0);
    }

    #[test]
    fn test_swap_recurses_into_blocks() {
        let catalog = OperationCatalog::sage();
        let mut swapped = 0;
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut genes = single_block();
            swap_random_gene(&mut genes, &catalog, &mut rng, 0);

            let values = inner_values(&genes);
            assert_eq!(values.len(), 3);
            assert!(values.iter().all(|v| (0..=catalog.max_index()).contains(v)));
            if values != [16, 8, 8] {
                swapped += 1;
            }
        }
        assert!(swapped > 0);
    }

    #[test]
    fn test_modify_nudges_inside_blocks() {
        let catalog = OperationCatalog::sage();
        let mut nudged = 0;
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut genes = single_block();
            modify_random_gene(&mut genes, &catalog, &mut rng, 0);

            let values = inner_values(&genes);
            let differences: Vec<i64> = values
                .iter()
                .zip([16, 8, 8])
                .map(|(new, old)| new - old)
                .filter(|d| *d != 0)
                .collect();
            assert!(differences.len() <= 1);
            assert!(differences.iter().all(|d| d.abs() == 1));
            nudged += differences.len();
        }
        assert!(nudged > 0);
    }

    #[test]
    fn test_crossover_preserves_total_length() {
        let a = flat(&[1, 2, 3, 4, 5]);
        let b = flat(&[10, 11, 12, 13, 14, 15, 16]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let (c1, c2) = crossover(&a, &b, &mut rng);
            assert_eq!(c1.len() + c2.len(), 12);
        }
    }

    #[test]
    fn test_crossover_with_empty_parent() {
        let mut rng = StdRng::seed_from_u64(0);
        let (c1, c2) = crossover(&[], &flat(&[1, 2]), &mut rng);
        assert_eq!(c1, flat(&[1, 2]));
        assert!(c2.is_empty());
    }

    #[test]
    fn test_crossover_splits_truncates_to_shorter() {
        let a = vec![Gene::Op(1), Gene::Block(flat(&[16, 2, 3]))];
        let b = vec![Gene::Op(9), Gene::Block(flat(&[14, 5])), Gene::Op(7), Gene::Op(8)];
        let mut rng = StdRng::seed_from_u64(11);
        let child = crossover_splits(&a, &b, &mut rng, 0);
        assert_eq!(child.len(), 2);
        match &child[1] {
            Gene::Block(inner) => assert_eq!(inner.len(), 2),
            other => panic!("expected block, got {}", other),
        }
    }

    #[test]
    fn test_modify_stays_in_catalog_range() {
        let catalog = OperationCatalog::sage();
        let mut rng = StdRng::seed_from_u64(5);
        let mut genes = flat(&[0, 26, 0, 26]);
        for _ in 0..200 {
            modify_random_gene(&mut genes, &catalog, &mut rng, 0);
        }
        for gene in &genes {
            match gene {
                Gene::Op(v) => assert!((0..=26).contains(v)),
                Gene::Block(_) => panic!("modify must not create blocks"),
            }
        }
    }

    #[test]
    fn test_insert_on_empty_appends() {
        let catalog = OperationCatalog::sage();
        let mut rng = StdRng::seed_from_u64(1);
        let mut genes = Vec::new();
        insert_random_gene(&mut genes, &catalog, &mut rng, 0);
        assert_eq!(genes.len(), 1);
    }

    #[test]
    fn test_insert_adds_exactly_one_leaf() {
        let catalog = OperationCatalog::sage();
        let mut rng = StdRng::seed_from_u64(21);
        let mut genes = vec![Gene::Op(1), Gene::Block(flat(&[16, 8, 8])), Gene::Op(2)];
        for expected in 6..40 {
            insert_random_gene(&mut genes, &catalog, &mut rng, 0);
            assert_eq!(gene_count(&genes), expected);
        }
    }

    #[test]
    fn test_remove_and_swap_on_empty_are_noops() {
        let catalog = OperationCatalog::sage();
        let mut rng = StdRng::seed_from_u64(2);
        let mut genes: Vec<Gene> = Vec::new();
        remove_random_gene(&mut genes, &mut rng, 0);
        swap_random_gene(&mut genes, &catalog, &mut rng, 0);
        modify_random_gene(&mut genes, &catalog, &mut rng, 0);
        assert!(genes.is_empty());
    }

    #[test]
    fn test_point_mutation_rate_zero_is_identity() {
        let catalog = OperationCatalog::sage();
        let mut rng = StdRng::seed_from_u64(4);
        let original = vec![Gene::Op(3), Gene::Block(flat(&[16, 2, 9]))];
        let mut genes = original.clone();
        point_mutate(&mut genes, 0.0, &catalog, &mut rng, 0);
        assert_eq!(genes, original);
    }
}
