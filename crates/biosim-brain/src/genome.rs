//! Genomes and the operators that mutate and recombine them.

use biosim_core::BioSimConfig;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::GenomeError;
use crate::gene::Gene;

/// Genetic parameters extracted from the run configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeneticParams {
    pub genome_initial_length_min: usize,
    pub genome_initial_length_max: usize,
    pub genome_max_length: usize,
    pub point_mutation_rate: f32,
    pub gene_insertion_deletion_rate: f32,
    pub deletion_ratio: f32,
    pub sexual_reproduction: bool,
    pub choose_parents_by_fitness: bool,
}

impl From<&BioSimConfig> for GeneticParams {
    fn from(config: &BioSimConfig) -> Self {
        Self {
            genome_initial_length_min: config.genome_initial_length_min,
            genome_initial_length_max: config.genome_initial_length_max,
            genome_max_length: config.genome_max_length,
            point_mutation_rate: config.point_mutation_rate,
            gene_insertion_deletion_rate: config.gene_insertion_deletion_rate,
            deletion_ratio: config.deletion_ratio,
            sexual_reproduction: config.sexual_reproduction,
            choose_parents_by_fitness: config.choose_parents_by_fitness,
        }
    }
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self::from(&BioSimConfig::default())
    }
}

/// Ordered list of genes owned by one agent. Never empty once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Genome(Vec<Gene>);

impl Genome {
    #[must_use]
    pub fn new(genes: Vec<Gene>) -> Self {
        Self(genes)
    }

    /// Generation-zero genome with a length drawn from the configured initial range.
    pub fn random(params: &GeneticParams, rng: &mut dyn RngCore) -> Self {
        let len = rng.random_range(
            params.genome_initial_length_min..=params.genome_initial_length_max,
        );
        Self((0..len).map(|_| Gene::random(rng)).collect())
    }

    #[must_use]
    pub fn genes(&self) -> &[Gene] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Trim to `length` genes, dropping from the front or the back with equal odds.
    ///
    /// Does nothing when the genome is already short enough or `length` is zero.
    pub fn crop_length(&mut self, length: usize, rng: &mut dyn RngCore) {
        if self.0.len() <= length || length == 0 {
            return;
        }
        let excess = self.0.len() - length;
        if rng.random::<f32>() < 0.5 {
            self.0.drain(..excess);
        } else {
            self.0.truncate(length);
        }
    }

    /// With probability `gene_insertion_deletion_rate`, either delete a random
    /// gene (when more than one remains) or append a fresh random one (when
    /// below the maximum length).
    pub fn random_insert_deletion(&mut self, params: &GeneticParams, rng: &mut dyn RngCore) {
        if rng.random::<f32>() >= params.gene_insertion_deletion_rate {
            return;
        }
        if rng.random::<f32>() < params.deletion_ratio {
            if self.0.len() > 1 {
                let idx = rng.random_range(0..self.0.len());
                self.0.remove(idx);
            }
        } else if self.0.len() < params.genome_max_length {
            self.0.push(Gene::random(rng));
        }
    }

    /// Roll once per gene; every hit flips one bit somewhere in the genome.
    pub fn apply_point_mutations(&mut self, rate: f32, rng: &mut dyn RngCore) {
        for _ in 0..self.0.len() {
            if rng.random::<f32>() < rate {
                self.random_bit_flip(rng);
            }
        }
    }

    fn random_bit_flip(&mut self, rng: &mut dyn RngCore) {
        if self.0.is_empty() {
            return;
        }
        let idx = rng.random_range(0..self.0.len());
        let bit: u16 = 1 << rng.random_range(0..8u32);
        let chance = rng.random::<f32>();
        let gene = &mut self.0[idx];
        if chance < 0.2 {
            gene.source_type = gene.source_type.flipped();
        } else if chance < 0.4 {
            gene.sink_type = gene.sink_type.flipped();
        } else if chance < 0.6 {
            gene.source_num ^= bit;
        } else if chance < 0.8 {
            gene.sink_num ^= bit;
        } else {
            gene.weight ^= bit as i16;
        }
    }

    /// Hex rendering of every gene, `genes_per_line` per line.
    #[must_use]
    pub fn hex_dump(&self, genes_per_line: usize) -> String {
        let per_line = genes_per_line.max(1);
        self.0
            .chunks(per_line)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(Gene::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Build a child genome from the ranked parent pool.
///
/// With fitness bias, parent 1 comes from `[1, n-1]` and parent 2 from
/// `[0, parent1)`, so entries near the front of the pool are favoured. Sexual
/// reproduction overlays a slice of the shorter parent onto a copy of the
/// longer one and crops to the average length; otherwise parent 2 is copied.
/// Insertion/deletion and point mutation are applied last.
pub fn generate_child(
    parents: &[Genome],
    params: &GeneticParams,
    rng: &mut dyn RngCore,
) -> Result<Genome, GenomeError> {
    if parents.is_empty() {
        return Err(GenomeError::NoParents);
    }
    let n = parents.len();
    let (idx1, idx2) = if params.choose_parents_by_fitness && n > 1 {
        let idx1 = rng.random_range(1..n);
        (idx1, rng.random_range(0..idx1))
    } else {
        (rng.random_range(0..n), rng.random_range(0..n))
    };
    let g1 = &parents[idx1];
    let g2 = &parents[idx2];
    if g1.is_empty() || g2.is_empty() {
        return Err(GenomeError::EmptyGenome);
    }

    let mut child = if params.sexual_reproduction {
        let (longer, shorter) = if g1.len() > g2.len() { (g1, g2) } else { (g2, g1) };
        let mut child = longer.clone();
        let mut start = rng.random_range(0..shorter.len());
        let mut end = rng.random_range(0..=shorter.len());
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        child.0[start..end].copy_from_slice(&shorter.0[start..end]);

        let mut sum = g1.len() + g2.len();
        if sum % 2 == 1 && rng.random::<bool>() {
            sum += 1;
        }
        child.crop_length(sum / 2, rng);
        child
    } else {
        g2.clone()
    };
    debug_assert!(!child.is_empty());

    child.random_insert_deletion(params, rng);
    child.apply_point_mutations(params.point_mutation_rate, rng);
    if child.is_empty() {
        return Err(GenomeError::EmptyGenome);
    }
    debug_assert!(child.len() <= params.genome_max_length);
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{SinkKind, SourceKind};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn params() -> GeneticParams {
        GeneticParams {
            genome_initial_length_min: 2,
            genome_initial_length_max: 8,
            genome_max_length: 10,
            point_mutation_rate: 0.01,
            gene_insertion_deletion_rate: 0.05,
            deletion_ratio: 0.5,
            sexual_reproduction: true,
            choose_parents_by_fitness: true,
        }
    }

    fn marked(len: usize, mark: u16) -> Genome {
        Genome::new(
            (0..len)
                .map(|i| Gene::new(SourceKind::Sensor, mark, SinkKind::Action, i as u16, 0))
                .collect(),
        )
    }

    #[test]
    fn random_genome_respects_initial_range() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            let genome = Genome::random(&params(), &mut rng);
            assert!((2..=8).contains(&genome.len()));
        }
    }

    #[test]
    fn crossover_length_stays_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        let params = params();
        let pool: Vec<Genome> = (0..6).map(|_| Genome::random(&params, &mut rng)).collect();
        for _ in 0..1_000 {
            let child = generate_child(&pool, &params, &mut rng).expect("child");
            assert!(!child.is_empty());
            assert!(child.len() <= params.genome_max_length);
        }
    }

    #[test]
    fn asexual_child_copies_second_parent() {
        let mut rng = SmallRng::seed_from_u64(3);
        let params = GeneticParams {
            sexual_reproduction: false,
            point_mutation_rate: 0.0,
            gene_insertion_deletion_rate: 0.0,
            ..params()
        };
        let pool = vec![marked(3, 1), marked(4, 2)];
        // Fitness bias with two parents always picks parent 2 = index 0.
        let child = generate_child(&pool, &params, &mut rng).expect("child");
        assert_eq!(child, pool[0]);
    }

    #[test]
    fn sexual_child_mixes_parents_and_averages_length() {
        let mut rng = SmallRng::seed_from_u64(5);
        let params = GeneticParams {
            point_mutation_rate: 0.0,
            gene_insertion_deletion_rate: 0.0,
            ..params()
        };
        let pool = vec![marked(4, 1), marked(8, 2)];
        for _ in 0..200 {
            let child = generate_child(&pool, &params, &mut rng).expect("child");
            assert_eq!(child.len(), 6);
            assert!(child.genes().iter().all(|g| g.source_num == 1 || g.source_num == 2));
        }
    }

    #[test]
    fn empty_inputs_are_contract_errors() {
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(
            generate_child(&[], &params(), &mut rng),
            Err(GenomeError::NoParents)
        );
        let pool = vec![Genome::default(), Genome::default()];
        assert_eq!(
            generate_child(&pool, &params(), &mut rng),
            Err(GenomeError::EmptyGenome)
        );
    }

    #[test]
    fn crop_keeps_a_contiguous_end() {
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..20 {
            let mut genome = marked(6, 0);
            genome.crop_length(2, &mut rng);
            let sinks: Vec<u16> = genome.genes().iter().map(|g| g.sink_num).collect();
            assert!(sinks == [0, 1] || sinks == [4, 5]);
        }
        let mut genome = marked(3, 0);
        genome.crop_length(0, &mut rng);
        assert_eq!(genome.len(), 3);
    }

    #[test]
    fn insertion_never_exceeds_max_length() {
        let mut rng = SmallRng::seed_from_u64(13);
        let params = GeneticParams {
            gene_insertion_deletion_rate: 1.0,
            deletion_ratio: 0.0,
            genome_max_length: 5,
            ..params()
        };
        let mut genome = marked(3, 0);
        for _ in 0..10 {
            genome.random_insert_deletion(&params, &mut rng);
        }
        assert_eq!(genome.len(), 5);
    }

    #[test]
    fn deletion_keeps_one_gene() {
        let mut rng = SmallRng::seed_from_u64(17);
        let params = GeneticParams {
            gene_insertion_deletion_rate: 1.0,
            deletion_ratio: 1.0,
            ..params()
        };
        let mut genome = marked(3, 0);
        for _ in 0..10 {
            genome.random_insert_deletion(&params, &mut rng);
        }
        assert_eq!(genome.len(), 1);
    }

    #[test]
    fn point_mutation_flips_exactly_one_bit_per_hit() {
        let mut rng = SmallRng::seed_from_u64(19);
        let original = marked(1, 0);
        let mut genome = original.clone();
        genome.apply_point_mutations(1.0, &mut rng);
        let (a, b) = (original.genes()[0], genome.genes()[0]);
        let changed = usize::from(a.source_type != b.source_type)
            + usize::from(a.sink_type != b.sink_type)
            + (a.source_num ^ b.source_num).count_ones() as usize
            + (a.sink_num ^ b.sink_num).count_ones() as usize
            + (a.weight ^ b.weight).count_ones() as usize;
        assert_eq!(changed, 1);
    }

    #[test]
    fn hex_dump_wraps_lines() {
        let dump = marked(3, 0).hex_dump(2);
        assert_eq!(dump.lines().count(), 2);
        assert_eq!(dump.lines().next().map(str::len), Some(21));
    }
}
