//! Curvature history for L-BFGS.
//!
//! The buffer keeps the last `M` position differences `s` and gradient
//! differences `y`, the reciprocals `rho = 1 / <s, y>`, and a scalar
//! estimate `h0` of the inverse Hessian diagonal.
//!
//! Pairs live in a ring of fixed capacity `M`. The counter `k` is the number
//! of updates since construction or the last [`MemoryBuffer::reset`]. The
//! first update after a reset only records the reference point, so `k - 1`
//! pairs have been stored and the most recent `min(k - 1, M)` of them are
//! valid, at slots `i mod M` for `i` in `[max(0, k - 1 - M), k - 1)`.

use quenchopt_core::{
    error::{OptimizerError, Result},
    logging::Logger,
    types::{DVector, Scalar},
};

/// A deep copy of the L-BFGS history, sufficient to resume a run exactly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemorySnapshot<T: Scalar> {
    /// Position differences, one per ring slot
    pub s: Vec<DVector<T>>,
    /// Gradient differences, one per ring slot
    pub y: Vec<DVector<T>>,
    /// `1 / <s, y>` per ring slot
    pub rho: Vec<T>,
    /// Updates since the last reset
    pub k: usize,
    /// Diagonal inverse-Hessian scale
    pub h0: T,
    /// Position passed to the last update
    pub previous_position: DVector<T>,
    /// Gradient passed to the last update
    pub previous_gradient: DVector<T>,
}

/// Fixed-capacity ring buffer of curvature pairs.
#[derive(Debug, Clone)]
pub struct MemoryBuffer<T: Scalar> {
    s: Vec<DVector<T>>,
    y: Vec<DVector<T>>,
    rho: Vec<T>,
    h0: T,
    k: usize,
    previous_position: DVector<T>,
    previous_gradient: DVector<T>,
}

impl<T: Scalar> MemoryBuffer<T> {
    /// Creates an empty history of `capacity` pairs.
    ///
    /// `position` and `gradient` seed the reference point; they are
    /// overwritten by the first update.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or the vectors differ in length.
    pub fn new(capacity: usize, position: &DVector<T>, gradient: &DVector<T>, h0: T) -> Self {
        assert!(capacity > 0, "L-BFGS memory needs at least one slot");
        assert_eq!(position.len(), gradient.len());

        let n = position.len();
        Self {
            s: vec![DVector::zeros(n); capacity],
            y: vec![DVector::zeros(n); capacity],
            rho: vec![T::zero(); capacity],
            h0,
            k: 0,
            previous_position: position.clone(),
            previous_gradient: gradient.clone(),
        }
    }

    /// Maximum number of stored pairs (`M`).
    pub fn capacity(&self) -> usize {
        self.rho.len()
    }

    /// Dimension of the stored vectors (`N`).
    pub fn dimension(&self) -> usize {
        self.previous_position.len()
    }

    /// Updates performed since construction or the last reset.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Current diagonal inverse-Hessian scale.
    pub fn h0(&self) -> T {
        self.h0
    }

    /// Number of valid curvature pairs.
    pub fn stored_pairs(&self) -> usize {
        self.k.saturating_sub(1).min(self.capacity())
    }

    /// Returns `true` if no update has happened since the last reset.
    pub fn is_fresh(&self) -> bool {
        self.k == 0
    }

    /// Ring slots of the valid pairs, oldest first.
    pub fn slots(&self) -> impl DoubleEndedIterator<Item = usize> + ExactSizeIterator {
        let m = self.capacity();
        let pairs = self.k.saturating_sub(1);
        (pairs.saturating_sub(m)..pairs).map(move |i| i % m)
    }

    /// Position difference at ring slot `slot`.
    pub fn s(&self, slot: usize) -> &DVector<T> {
        &self.s[slot]
    }

    /// Gradient difference at ring slot `slot`.
    pub fn y(&self, slot: usize) -> &DVector<T> {
        &self.y[slot]
    }

    /// `1 / <s, y>` at ring slot `slot`.
    pub fn rho(&self, slot: usize) -> T {
        self.rho[slot]
    }

    /// Records a new point.
    ///
    /// Unless this is the first update since a reset, stores the pair
    /// `s = position - previous_position`, `y = gradient - previous_gradient`
    /// in the ring and rescales `h0 = <s, y> / <y, y>`. Zero inner products
    /// are replaced by one and reported through `logger`.
    pub fn update(&mut self, position: &DVector<T>, gradient: &DVector<T>, logger: &dyn Logger) {
        debug_assert_eq!(position.len(), self.dimension());
        debug_assert_eq!(gradient.len(), self.dimension());

        if self.k > 0 {
            let slot = (self.k - 1) % self.capacity();

            let s = &mut self.s[slot];
            s.copy_from(position);
            *s -= &self.previous_position;

            let y = &mut self.y[slot];
            y.copy_from(gradient);
            *y -= &self.previous_gradient;

            let mut ys = self.y[slot].dot(&self.s[slot]);
            if ys == T::zero() {
                logger.warn(&format!("resetting YS to 1 in lbfgs: {ys}"));
                ys = T::one();
            }
            self.rho[slot] = T::one() / ys;

            // Liu & Nocedal scaling, taking the previous H0 as the identity.
            let mut yy = self.y[slot].dot(&self.y[slot]);
            if yy == T::zero() {
                logger.warn(&format!("resetting YY to 1 in lbfgs: {yy}"));
                yy = T::one();
            }
            self.h0 = ys / yy;
        }

        self.previous_position.copy_from(position);
        self.previous_gradient.copy_from(gradient);
        self.k += 1;
    }

    /// Forgets the history: `h0 = 1`, `k = 0`.
    ///
    /// The ring contents are left in place; they are ignored until
    /// overwritten.
    pub fn reset(&mut self) {
        self.h0 = T::one();
        self.k = 0;
    }

    /// Deep copy of the buffer state.
    pub fn snapshot(&self) -> MemorySnapshot<T> {
        MemorySnapshot {
            s: self.s.clone(),
            y: self.y.clone(),
            rho: self.rho.clone(),
            k: self.k,
            h0: self.h0,
            previous_position: self.previous_position.clone(),
            previous_gradient: self.previous_gradient.clone(),
        }
    }

    /// Replaces the buffer state with `snapshot`.
    ///
    /// The snapshot must have this buffer's capacity and dimension.
    pub fn restore(&mut self, snapshot: MemorySnapshot<T>) -> Result<()> {
        let m = self.capacity();
        let n = self.dimension();

        if snapshot.s.len() != m || snapshot.y.len() != m || snapshot.rho.len() != m {
            return Err(OptimizerError::dimension_mismatch(
                format!("{m} history slots"),
                format!(
                    "s: {}, y: {}, rho: {}",
                    snapshot.s.len(),
                    snapshot.y.len(),
                    snapshot.rho.len()
                ),
            ));
        }

        let vectors = snapshot
            .s
            .iter()
            .chain(&snapshot.y)
            .chain([&snapshot.previous_position, &snapshot.previous_gradient]);
        for v in vectors {
            if v.len() != n {
                return Err(OptimizerError::dimension_mismatch(n, v.len()));
            }
        }

        self.s = snapshot.s;
        self.y = snapshot.y;
        self.rho = snapshot.rho;
        self.k = snapshot.k;
        self.h0 = snapshot.h0;
        self.previous_position = snapshot.previous_position;
        self.previous_gradient = snapshot.previous_gradient;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use quenchopt_core::logging::{Level, MemoryLogger, NoOpLogger};

    fn v(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    #[test]
    fn test_first_update_stores_no_pair() {
        let mut memory = MemoryBuffer::new(4, &v(&[1.0, 1.0]), &v(&[2.0, 2.0]), 1.0);
        assert!(memory.is_fresh());

        memory.update(&v(&[1.0, 1.0]), &v(&[2.0, 2.0]), &NoOpLogger);
        assert_eq!(memory.k(), 1);
        assert_eq!(memory.stored_pairs(), 0);
        assert_eq!(memory.slots().count(), 0);
        assert_eq!(memory.h0(), 1.0);
    }

    #[test]
    fn test_update_computes_pair_and_scale() {
        let mut memory = MemoryBuffer::new(4, &v(&[0.0, 0.0]), &v(&[0.0, 0.0]), 1.0);
        memory.update(&v(&[1.0, 1.0]), &v(&[2.0, 2.0]), &NoOpLogger);
        memory.update(&v(&[0.5, 0.0]), &v(&[1.0, 0.0]), &NoOpLogger);

        assert_eq!(memory.stored_pairs(), 1);
        let slot = memory.slots().next().unwrap();
        assert_eq!(slot, 0);
        assert_eq!(memory.s(slot), &v(&[-0.5, -1.0]));
        assert_eq!(memory.y(slot), &v(&[-1.0, -2.0]));

        // <s, y> = 2.5, <y, y> = 5
        assert_relative_eq!(memory.rho(slot), 1.0 / 2.5);
        assert_relative_eq!(memory.h0(), 0.5);
    }

    #[test]
    fn test_ring_keeps_most_recent_pairs() {
        let m = 3;
        let mut memory = MemoryBuffer::new(m, &v(&[0.0]), &v(&[0.0]), 1.0);
        for i in 0..10 {
            let x = f64::from(i);
            memory.update(&v(&[x]), &v(&[x * x]), &NoOpLogger);
        }

        assert_eq!(memory.k(), 10);
        assert_eq!(memory.stored_pairs(), m);

        // Nine pairs were stored (updates 2..=10); the last three are valid.
        let slots: Vec<usize> = memory.slots().collect();
        assert_eq!(slots, vec![6 % m, 7 % m, 8 % m]);

        // The newest pair comes from x: 8 -> 9.
        let newest = *slots.last().unwrap();
        assert_eq!(memory.s(newest)[0], 1.0);
        assert_eq!(memory.y(newest)[0], 81.0 - 64.0);
    }

    #[test]
    fn test_degenerate_pair_is_substituted_and_logged() {
        let logger = MemoryLogger::new();
        let mut memory = MemoryBuffer::new(4, &v(&[0.0, 0.0]), &v(&[0.0, 0.0]), 1.0);
        memory.update(&v(&[0.0, 0.0]), &v(&[0.0, 0.0]), &logger);

        // s = (1, 0), y = (0, 1): orthogonal.
        memory.update(&v(&[1.0, 0.0]), &v(&[0.0, 1.0]), &logger);

        let slot = memory.slots().next().unwrap();
        assert_eq!(memory.rho(slot), 1.0);
        assert_eq!(memory.h0(), 1.0);
        assert!(logger.contains(Level::Warn, "resetting YS to 1"));
        assert!(!logger.contains(Level::Warn, "resetting YY to 1"));
    }

    #[test]
    fn test_zero_gradient_change_is_substituted() {
        let logger = MemoryLogger::new();
        let mut memory = MemoryBuffer::new(2, &v(&[0.0]), &v(&[1.0]), 1.0);
        memory.update(&v(&[0.0]), &v(&[1.0]), &logger);
        memory.update(&v(&[0.3]), &v(&[1.0]), &logger);

        assert_eq!(memory.rho(0), 1.0);
        assert_eq!(memory.h0(), 1.0);
        assert_eq!(logger.messages_at(Level::Warn).len(), 2);
    }

    #[test]
    fn test_reset_keeps_arrays() {
        let mut memory = MemoryBuffer::new(2, &v(&[0.0]), &v(&[0.0]), 1.0);
        memory.update(&v(&[1.0]), &v(&[3.0]), &NoOpLogger);
        memory.update(&v(&[2.0]), &v(&[4.0]), &NoOpLogger);
        let s_before = memory.s(0).clone();

        memory.reset();
        assert_eq!(memory.k(), 0);
        assert_eq!(memory.h0(), 1.0);
        assert_eq!(memory.stored_pairs(), 0);
        assert_eq!(memory.s(0), &s_before);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut memory = MemoryBuffer::new(2, &v(&[0.0, 0.0]), &v(&[0.0, 0.0]), 1.0);
        memory.update(&v(&[1.0, 2.0]), &v(&[2.0, 4.0]), &NoOpLogger);
        memory.update(&v(&[0.5, 1.0]), &v(&[1.0, 2.0]), &NoOpLogger);
        let snapshot = memory.snapshot();

        memory.update(&v(&[0.0, 0.0]), &v(&[0.0, 0.0]), &NoOpLogger);
        memory.reset();
        assert_ne!(memory.snapshot(), snapshot);

        memory.restore(snapshot.clone()).unwrap();
        assert_eq!(memory.snapshot(), snapshot);
    }

    #[test]
    fn test_restore_rejects_wrong_shapes() {
        let mut memory = MemoryBuffer::new(2, &v(&[0.0, 0.0]), &v(&[0.0, 0.0]), 1.0);

        let other = MemoryBuffer::new(3, &v(&[0.0, 0.0]), &v(&[0.0, 0.0]), 1.0);
        let err = memory.restore(other.snapshot()).unwrap_err();
        assert!(matches!(err, OptimizerError::DimensionMismatch { .. }));

        let other = MemoryBuffer::new(2, &v(&[0.0]), &v(&[0.0]), 1.0);
        assert!(memory.restore(other.snapshot()).is_err());

        // A failed restore leaves the buffer untouched.
        assert_eq!(memory.dimension(), 2);
        assert_eq!(memory.capacity(), 2);
    }
}
