use rand::rngs::StdRng;
use rand::Rng;

use crate::error::IndexError;

const BATCHES: usize = 10;

/// Cyclic pool of pre-drawn slot indices used to pick sweep candidates without
/// reshuffling the table every round.
#[derive(Debug, Clone)]
pub struct SlotSampler {
    pool: Vec<usize>,
    cursor: usize,
}

impl SlotSampler {
    /// Draws `BATCHES` sorted batches of `no_randoms / BATCHES` indices in `0..capacity`.
    pub fn new(no_randoms: usize, capacity: usize, rng: &mut StdRng) -> Result<Self, IndexError> {
        if capacity == 0 {
            return Err(IndexError::ZeroCapacity);
        }
        let per_batch = no_randoms / BATCHES;
        if per_batch == 0 {
            return Err(IndexError::EmptySlotPool(no_randoms));
        }
        let mut pool = Vec::with_capacity(per_batch * BATCHES);
        for _ in 0..BATCHES {
            let mut batch: Vec<usize> = (0..per_batch).map(|_| rng.gen_range(0..capacity)).collect();
            batch.sort_unstable();
            pool.extend(batch);
        }
        Ok(Self { pool, cursor: 0 })
    }

    pub fn current(&self) -> usize {
        self.pool[self.cursor]
    }

    pub fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor == self.pool.len() {
            self.cursor = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    pub(crate) fn from_pool(pool: Vec<usize>) -> Self {
        Self { pool, cursor: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn pool_is_sorted_per_batch_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = SlotSampler::new(5000, 1000, &mut rng).unwrap();
        assert_eq!(s.len(), 5000);
        for batch in s.pool.chunks(500) {
            assert!(batch.windows(2).all(|w| w[0] <= w[1]));
            assert!(batch.iter().all(|i| *i < 1000));
        }
    }

    #[test]
    fn same_seed_same_pool() {
        let a = SlotSampler::new(100, 50, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = SlotSampler::new(100, 50, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a.pool, b.pool);
    }

    #[test]
    fn cursor_wraps() {
        let mut s = SlotSampler::from_pool(vec![3, 1]);
        assert_eq!(s.current(), 3);
        s.advance();
        assert_eq!(s.current(), 1);
        s.advance();
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn too_few_randoms_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(SlotSampler::new(9, 10, &mut rng).unwrap_err(), IndexError::EmptySlotPool(9));
        assert_eq!(SlotSampler::new(100, 0, &mut rng).unwrap_err(), IndexError::ZeroCapacity);
    }
}
