//! Genome similarity measures.

use biosim_core::GenomeComparison;

use crate::GenomeError;
use crate::genome::Genome;

/// Only this many leading genes take part in a comparison.
const MAX_GENES_TO_COMPARE: usize = 20;

/// Jaro similarity over the first 20 genes of each genome, in `[0, 1]`.
///
/// Genes match when all five fields are equal. Returns 0 when either genome
/// is empty or nothing matches.
#[must_use]
pub fn jaro_winkler(genome1: &Genome, genome2: &Genome) -> f32 {
    let s = &genome1.genes()[..genome1.len().min(MAX_GENES_TO_COMPARE)];
    let a = &genome2.genes()[..genome2.len().min(MAX_GENES_TO_COMPARE)];
    let (sl, al) = (s.len(), a.len());
    if sl == 0 || al == 0 {
        return 0.0;
    }

    let range = (sl.max(al) / 2).saturating_sub(1);
    let mut s_flags = vec![false; sl];
    let mut a_flags = vec![false; al];
    let mut matches = 0usize;

    for (i, gene) in a.iter().enumerate() {
        let lo = i.saturating_sub(range);
        let hi = (i + range + 1).min(sl);
        for j in lo..hi {
            if !s_flags[j] && s[j] == *gene {
                s_flags[j] = true;
                a_flags[i] = true;
                matches += 1;
                break;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let mut out_of_order = 0usize;
    let mut cursor = 0usize;
    for (i, gene) in a.iter().enumerate() {
        if !a_flags[i] {
            continue;
        }
        if let Some(j) = (cursor..sl).find(|&j| s_flags[j]) {
            cursor = j + 1;
            if s[j] != *gene {
                out_of_order += 1;
            }
        }
    }
    // Half of an odd count stays fractional.
    let transpositions = out_of_order as f32 / 2.0;

    let m = matches as f32;
    (m / sl as f32 + m / al as f32 + (m - transpositions) / m) / 3.0
}

/// Compare two genomes with the selected method.
///
/// The Hamming variants are not available and report
/// [`GenomeError::Unsupported`].
pub fn genome_similarity(
    method: GenomeComparison,
    genome1: &Genome,
    genome2: &Genome,
) -> Result<f32, GenomeError> {
    match method {
        GenomeComparison::JaroWinkler => Ok(jaro_winkler(genome1, genome2)),
        GenomeComparison::HammingBits => Err(GenomeError::Unsupported(
            "hamming-bits genome comparison",
        )),
        GenomeComparison::HammingBytes => Err(GenomeError::Unsupported(
            "hamming-bytes genome comparison",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{Gene, SinkKind, SourceKind};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use crate::genome::GeneticParams;

    fn gene(n: u16) -> Gene {
        Gene::new(SourceKind::Sensor, n, SinkKind::Action, n, n as i16)
    }

    #[test]
    fn identical_genomes_are_fully_similar() {
        let mut rng = SmallRng::seed_from_u64(21);
        let genome = Genome::random(&GeneticParams::default(), &mut rng);
        assert!(jaro_winkler(&genome, &genome) >= 0.99);
    }

    #[test]
    fn disjoint_genomes_score_zero() {
        let g1 = Genome::new((0..5).map(gene).collect());
        let g2 = Genome::new((10..15).map(gene).collect());
        assert_eq!(jaro_winkler(&g1, &g2), 0.0);
        assert_eq!(jaro_winkler(&g1, &Genome::default()), 0.0);
    }

    #[test]
    fn transposed_genes_reduce_score() {
        let g1 = Genome::new(vec![gene(1), gene(2), gene(3), gene(4)]);
        let g2 = Genome::new(vec![gene(2), gene(1), gene(3), gene(4)]);
        // range 1, four matches, one transposition: (1 + 1 + 3/4) / 3
        let score = jaro_winkler(&g1, &g2);
        assert!((score - 11.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn rotated_genes_count_half_transpositions() {
        let tail = (10..15).map(gene);
        let rotated = Genome::new([2, 3, 1].map(gene).into_iter().chain(tail.clone()).collect());
        let ordered = Genome::new([1, 2, 3].map(gene).into_iter().chain(tail).collect());
        // range 3, eight matches, three out of order: t = 1.5
        let expected = (1.0 + 1.0 + (8.0 - 1.5) / 8.0) / 3.0;
        let score = jaro_winkler(&rotated, &ordered);
        assert!((score - expected).abs() < 1e-6, "score {score}");
    }

    #[test]
    fn hamming_methods_are_unsupported() {
        let genome = Genome::new(vec![gene(1)]);
        assert!(matches!(
            genome_similarity(GenomeComparison::HammingBits, &genome, &genome),
            Err(GenomeError::Unsupported(_))
        ));
        assert_eq!(
            genome_similarity(GenomeComparison::JaroWinkler, &genome, &genome),
            Ok(1.0)
        );
    }
}
