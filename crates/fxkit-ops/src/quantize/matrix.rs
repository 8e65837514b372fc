//! Dither threshold matrices.
//!
//! Bayer matrices are the classic recursive tables. Void-and-cluster
//! matrices are generated once per process from a Gaussian energy on a
//! toroidal grid; generation is deterministic, so every process sees the
//! same table.

use std::sync::OnceLock;

use tracing::debug;

use super::wang_hash;

/// A square table holding each rank `0..size²` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherMatrix {
    size: usize,
    ranks: Vec<u16>,
}

impl DitherMatrix {
    fn from_ranks(size: usize, ranks: &[u16]) -> Self {
        Self {
            size,
            ranks: ranks.to_vec(),
        }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells (`size²`).
    pub fn cells(&self) -> usize {
        self.ranks.len()
    }

    /// Rank of the cell covering pixel `(x, y)`; coordinates wrap, negative
    /// ones included.
    #[inline]
    pub fn rank(&self, x: i32, y: i32) -> u16 {
        let col = fxkit_math::wrap_index(x, self.size);
        let row = fxkit_math::wrap_index(y, self.size);
        self.ranks[row * self.size + col]
    }

    /// Row-major ranks.
    pub fn ranks(&self) -> &[u16] {
        &self.ranks
    }
}

#[rustfmt::skip]
const BAYER2: [u16; 4] = [
    0, 2,
    3, 1,
];

#[rustfmt::skip]
const BAYER4: [u16; 16] = [
     0,  8,  2, 10,
    12,  4, 14,  6,
     3, 11,  1,  9,
    15,  7, 13,  5,
];

#[rustfmt::skip]
const BAYER8: [u16; 64] = [
     0, 32,  8, 40,  2, 34, 10, 42,
    48, 16, 56, 24, 50, 18, 58, 26,
    12, 44,  4, 36, 14, 46,  6, 38,
    60, 28, 52, 20, 62, 30, 54, 22,
     3, 35, 11, 43,  1, 33,  9, 41,
    51, 19, 59, 27, 49, 17, 57, 25,
    15, 47,  7, 39, 13, 45,  5, 37,
    63, 31, 55, 23, 61, 29, 53, 21,
];

/// 2×2 Bayer matrix.
pub fn bayer2() -> &'static DitherMatrix {
    static M: OnceLock<DitherMatrix> = OnceLock::new();
    M.get_or_init(|| DitherMatrix::from_ranks(2, &BAYER2))
}

/// 4×4 Bayer matrix.
pub fn bayer4() -> &'static DitherMatrix {
    static M: OnceLock<DitherMatrix> = OnceLock::new();
    M.get_or_init(|| DitherMatrix::from_ranks(4, &BAYER4))
}

/// 8×8 Bayer matrix.
pub fn bayer8() -> &'static DitherMatrix {
    static M: OnceLock<DitherMatrix> = OnceLock::new();
    M.get_or_init(|| DitherMatrix::from_ranks(8, &BAYER8))
}

/// 14×14 void-and-cluster matrix.
pub fn void_cluster14() -> &'static DitherMatrix {
    static M: OnceLock<DitherMatrix> = OnceLock::new();
    M.get_or_init(|| void_and_cluster(14))
}

/// 25×25 void-and-cluster matrix.
pub fn void_cluster25() -> &'static DitherMatrix {
    static M: OnceLock<DitherMatrix> = OnceLock::new();
    M.get_or_init(|| void_and_cluster(25))
}

const SIGMA: f32 = 1.5;

/// Gaussian energy of every cell, updated as points come and go.
struct Energy {
    size: usize,
    kernel: Vec<f32>,
    energy: Vec<f32>,
    set: Vec<bool>,
}

impl Energy {
    fn new(size: usize) -> Self {
        let mut kernel = vec![0.0; size * size];
        for dy in 0..size {
            for dx in 0..size {
                let tx = dx.min(size - dx) as f32;
                let ty = dy.min(size - dy) as f32;
                kernel[dy * size + dx] = (-(tx * tx + ty * ty) / (2.0 * SIGMA * SIGMA)).exp();
            }
        }
        Self {
            size,
            kernel,
            energy: vec![0.0; size * size],
            set: vec![false; size * size],
        }
    }

    fn toggle(&mut self, idx: usize, on: bool) {
        if self.set[idx] == on {
            return;
        }
        self.set[idx] = on;
        let n = self.size;
        let (px, py) = (idx % n, idx / n);
        let sign = if on { 1.0 } else { -1.0 };
        for y in 0..n {
            let dy = (y + n - py) % n;
            for x in 0..n {
                let dx = (x + n - px) % n;
                self.energy[y * n + x] += sign * self.kernel[dy * n + dx];
            }
        }
    }

    /// Set cell with the highest energy.
    fn tightest_cluster(&self) -> Option<usize> {
        self.pick(true, |a, b| a > b)
    }

    /// Empty cell with the lowest energy.
    fn largest_void(&self) -> Option<usize> {
        self.pick(false, |a, b| a < b)
    }

    fn pick(&self, state: bool, better: impl Fn(f32, f32) -> bool) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &e) in self.energy.iter().enumerate() {
            if self.set[i] != state {
                continue;
            }
            if best.is_none_or(|b| better(e, self.energy[b])) {
                best = Some(i);
            }
        }
        best
    }
}

fn void_and_cluster(size: usize) -> DitherMatrix {
    let cells = size * size;
    let mut grid = Energy::new(size);

    // Initial pattern: about one cell in ten.
    for i in 0..cells {
        if wang_hash(i as u32 ^ 0x9e37_79b9) % 10 == 0 {
            grid.toggle(i, true);
        }
    }
    if !grid.set.iter().any(|&s| s) {
        grid.toggle(0, true);
    }

    // Move points from clusters into voids until the pattern is stable.
    for _ in 0..cells * 4 {
        let Some(cluster) = grid.tightest_cluster() else {
            break;
        };
        grid.toggle(cluster, false);
        let Some(void) = grid.largest_void() else {
            grid.toggle(cluster, true);
            break;
        };
        grid.toggle(void, true);
        if void == cluster {
            break;
        }
    }

    let prototype = grid.set.clone();
    let ones = prototype.iter().filter(|&&s| s).count();
    let mut ranks = vec![0u16; cells];

    // Ranks below the prototype count: strip clusters.
    let mut phase1 = Energy::new(size);
    for (i, &s) in prototype.iter().enumerate() {
        if s {
            phase1.toggle(i, true);
        }
    }
    for rank in (0..ones).rev() {
        if let Some(i) = phase1.tightest_cluster() {
            phase1.toggle(i, false);
            ranks[i] = rank as u16;
        }
    }

    // Remaining ranks: fill voids.
    for rank in ones..cells {
        if let Some(i) = grid.largest_void() {
            grid.toggle(i, true);
            ranks[i] = rank as u16;
        }
    }

    debug!(size, prototype_points = ones, "built void-and-cluster matrix");
    DitherMatrix { size, ranks }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_permutation(m: &DitherMatrix) {
        let mut seen = vec![false; m.cells()];
        for &r in m.ranks() {
            assert!(!seen[r as usize], "rank {r} repeated in {}x{}", m.size(), m.size());
            seen[r as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_all_matrices_are_permutations() {
        for m in [bayer2(), bayer4(), bayer8(), void_cluster14(), void_cluster25()] {
            assert_eq!(m.cells(), m.size() * m.size());
            assert_permutation(m);
        }
    }

    #[test]
    fn test_rank_wraps_negative_coordinates() {
        let m = bayer4();
        assert_eq!(m.rank(0, 0), 0);
        assert_eq!(m.rank(1, 0), 8);
        assert_eq!(m.rank(-1, 0), 10);
        assert_eq!(m.rank(-3, -4), m.rank(1, 0));
    }

    #[test]
    fn test_void_cluster_is_deterministic() {
        assert_eq!(void_and_cluster(14), *void_cluster14());
    }
}
