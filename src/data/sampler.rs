// ============================================================
// Layer 4 — Drop-last batch plan
// ============================================================
// Burn's DataLoader keeps the final partial batch. Training
// must drop it, so the epoch is planned here instead:
//
//   indices 0..N  ──shuffle(seed + epoch)──▶  chunks_exact(B)
//
// Each item of DropLastBatches is one whole batch. Fed to a
// DataLoader with batch_size(1), the loader's workers still
// decode images in parallel while the batch count stays
// exactly floor(N / B).

use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::{marker::PhantomData, sync::Arc};

/// Number of full batches an epoch yields
pub fn batches_per_epoch(num_samples: usize, batch_size: usize) -> usize {
    if batch_size == 0 { 0 } else { num_samples / batch_size }
}

pub struct DropLastBatches<D, I> {
    inner:  Arc<D>,
    groups: Vec<Vec<usize>>,
    _item:  PhantomData<fn() -> I>,
}

impl<D: Dataset<I>, I> DropLastBatches<D, I> {
    pub fn new(inner: Arc<D>, batch_size: usize, seed: u64, epoch: usize) -> Self {
        let mut order: Vec<usize> = (0..inner.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch as u64));
        order.shuffle(&mut rng);

        let groups = match batch_size {
            0 => Vec::new(),
            b => order.chunks_exact(b).map(|c| c.to_vec()).collect(),
        };
        Self { inner, groups, _item: PhantomData }
    }
}

impl<D, I> Dataset<Vec<I>> for DropLastBatches<D, I>
where
    D: Dataset<I>,
    I: Send + Sync,
{
    /// None when any member of the batch fails to load.
    fn get(&self, index: usize) -> Option<Vec<I>> {
        self.groups
            .get(index)?
            .iter()
            .map(|&i| self.inner.get(i))
            .collect()
    }

    fn len(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::InMemDataset;

    fn numbers(n: usize) -> Arc<InMemDataset<usize>> {
        Arc::new(InMemDataset::new((0..n).collect()))
    }

    fn batches(plan: &DropLastBatches<InMemDataset<usize>, usize>) -> Vec<Vec<usize>> {
        (0..plan.len()).map(|i| plan.get(i).unwrap()).collect()
    }

    #[test]
    fn partial_batch_is_dropped() {
        let plan = DropLastBatches::new(numbers(5), 2, 0, 0);
        assert_eq!(plan.len(), 2);
        assert_eq!(batches_per_epoch(5, 2), 2);
        assert!(batches(&plan).iter().all(|g| g.len() == 2));
    }

    #[test]
    fn batch_larger_than_dataset_yields_nothing() {
        let plan = DropLastBatches::new(numbers(3), 4, 0, 0);
        assert_eq!(plan.len(), 0);
        assert_eq!(batches_per_epoch(3, 4), 0);
    }

    #[test]
    fn each_sample_used_at_most_once_per_epoch() {
        let plan = DropLastBatches::new(numbers(10), 3, 7, 1);
        let mut seen: Vec<usize> = (0..plan.len()).flat_map(|i| plan.get(i).unwrap()).collect();
        assert_eq!(seen.len(), 9);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn shuffle_is_reproducible_and_varies_by_epoch() {
        let a = DropLastBatches::new(numbers(20), 4, 42, 0);
        let b = DropLastBatches::new(numbers(20), 4, 42, 0);
        let c = DropLastBatches::new(numbers(20), 4, 42, 1);
        assert_eq!(batches(&a), batches(&b));
        assert_ne!(batches(&a), batches(&c));
    }
}
