//! L-BFGS two-loop recursion.
//!
//! Computes `-H * g` for the limited-memory inverse Hessian `H` described by
//! a [`MemoryBuffer`], without ever forming `H`:
//!
//! ```text
//! q = g
//! for i = newest .. oldest:
//!     a_i = rho_i * <s_i, q>
//!     q   = q - a_i * y_i
//! z = H0 * q
//! for i = oldest .. newest:
//!     b = rho_i * <y_i, z>
//!     z = z + (a_i - b) * s_i
//! return -z
//! ```
//!
//! # References
//!
//! - Liu & Nocedal, "On the limited memory BFGS method for large scale
//!   optimization", Math. Programming 45 (1989)

use crate::memory::MemoryBuffer;
use num_traits::Float;
use quenchopt_core::{
    logging::Logger,
    types::{DVector, Scalar},
};

/// Applies the two-loop recursion to `gradient` using the pairs currently
/// stored in `memory`.
///
/// Pure: `memory` is only read.
pub fn two_loop_recursion<T: Scalar>(memory: &MemoryBuffer<T>, gradient: &DVector<T>) -> DVector<T> {
    let mut q = gradient.clone();
    let mut alpha = vec![T::zero(); memory.capacity()];

    for slot in memory.slots().rev() {
        alpha[slot] = memory.rho(slot) * memory.s(slot).dot(&q);
        q.axpy(-alpha[slot], memory.y(slot), T::one());
    }

    // q is not needed after this point
    let mut z = q;
    z *= memory.h0();

    for slot in memory.slots() {
        let beta = memory.rho(slot) * memory.y(slot).dot(&z);
        z.axpy(alpha[slot] - beta, memory.s(slot), T::one());
    }

    -z
}

/// Computes the L-BFGS search direction at `(position, gradient)`.
///
/// Records the point in `memory` first, then runs the recursion. When the
/// history was empty (first iteration or right after a reset) the step is
/// scaled by `min(|g|, 1/|g|)`, since no curvature information exists yet.
pub fn search_direction<T: Scalar>(
    memory: &mut MemoryBuffer<T>,
    position: &DVector<T>,
    gradient: &DVector<T>,
    logger: &dyn Logger,
) -> DVector<T> {
    let fresh = memory.is_fresh();
    memory.update(position, gradient, logger);

    let mut direction = two_loop_recursion(memory, gradient);

    if fresh {
        let gnorm = gradient.norm();
        if gnorm > T::zero() {
            direction *= <T as Float>::min(gnorm, T::one() / gnorm);
        } else {
            direction.fill(T::zero());
        }
    }

    direction
}
