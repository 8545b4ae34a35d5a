use std::{fmt, result};

/// Statistic type, that captures the leaf-depth distribution of the
/// balanced index.
///
/// An AVL tree over `n` nodes keeps every leaf within `1.44 * log2(n)`
/// levels, so the histogram stays short, one bucket per level, grown on
/// demand while sampling. Minimum, maximum and quantiles are derived
/// from the buckets.
#[derive(Clone, Default)]
pub struct Depth {
    samples: u64,
    total: u64,
    depths: Vec<u64>, // one bucket per level of the balanced index
}

impl Depth {
    /// Record a sample, each sample specify the depth of a single branch
    /// from root to leaf-node.
    pub fn sample(&mut self, depth: usize) {
        if depth >= self.depths.len() {
            self.depths.resize(depth + 1, 0);
        }
        self.depths[depth] += 1;
        self.samples += 1;
        self.total += depth as u64;
    }

    /// Return number of samples recorded.
    pub fn to_samples(&self) -> usize {
        self.samples as usize
    }

    /// Return the shallowest sampled leaf depth.
    pub fn to_min(&self) -> usize {
        self.depths.iter().position(|&count| count > 0).unwrap_or(0)
    }

    /// Return the deepest sampled leaf depth.
    pub fn to_max(&self) -> usize {
        self.depths.iter().rposition(|&count| count > 0).unwrap_or(0)
    }

    /// Return average leaf depth.
    pub fn to_mean(&self) -> usize {
        match self.samples {
            0 => 0,
            samples => (self.total / samples) as usize,
        }
    }

    /// Return the depth at or below which `fraction` of the sampled
    /// leaves sit, `fraction` within `0.0..=1.0`.
    pub fn to_quantile(&self, fraction: f64) -> usize {
        let want = (fraction * (self.samples as f64)).ceil() as u64;
        let mut acc = 0;
        for (depth, count) in self.depths.iter().enumerate() {
            acc += count;
            if acc >= want {
                return depth;
            }
        }
        self.to_max()
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let props: Vec<String> = [50, 90, 99]
            .iter()
            .map(|q| format!(r#""{}" = {}"#, q, self.to_quantile((*q as f64) / 100.0)))
            .collect();

        write!(
            f,
            concat!(
                "{{ samples={}, min={}, mean={}, max={}, ",
                "quantiles={{ {} }} }}"
            ),
            self.to_samples(),
            self.to_min(),
            self.to_mean(),
            self.to_max(),
            props.join(", ")
        )
    }
}

#[cfg(test)]
#[path = "depth_test.rs"]
mod depth_test;
