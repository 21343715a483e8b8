//! cpu cluster detection.

use {
    crate::source::{SourceError, read_text},
    std::path::Path,
};

/// cpus grouped into clusters: maximal runs of consecutive processor indices.
///
/// big.LITTLE socs number each cluster's cores contiguously, so a gap in the processor list
/// (e.g. an offline core) starts a new group. detected once at startup.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterTopology {
    clusters: Vec<Vec<usize>>,
}

// === impl ClusterTopology ===

impl ClusterTopology {
    pub const CPUINFO: &str = "/proc/cpuinfo";

    /// detects the topology from a `/proc/cpuinfo`-style listing.
    pub fn detect(path: &Path) -> Result<Self, SourceError> {
        let cpuinfo = read_text(path)?;
        let indices = Self::parse_processors(&cpuinfo);
        if indices.is_empty() {
            return Err(SourceError::read(
                path.display().to_string(),
                "no processor entries",
            ));
        }

        Ok(Self::from_indices(indices))
    }

    /// groups processor indices into maximal runs of consecutive values.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices = indices.into_iter().collect::<Vec<_>>();
        indices.sort_unstable();
        indices.dedup();

        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for cpu in indices {
            match clusters.last_mut() {
                Some(run) if run.last().is_some_and(|&last| last + 1 == cpu) => run.push(cpu),
                _ => clusters.push(vec![cpu]),
            }
        }

        Self { clusters }
    }

    /// the clusters, in ascending order of their first cpu.
    pub fn clusters(&self) -> &[Vec<usize>] {
        &self.clusters
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    fn parse_processors(cpuinfo: &str) -> Vec<usize> {
        cpuinfo
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                (key.trim() == "processor").then_some(value)?.trim().parse().ok()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    #[test]
    fn gaps_start_new_clusters() {
        let topology = ClusterTopology::from_indices([0, 1, 2, 4, 5, 7]);
        assert_eq!(topology.clusters(), [vec![0, 1, 2], vec![4, 5], vec![7]]);
    }

    #[test]
    fn unordered_indices_are_sorted() {
        let topology = ClusterTopology::from_indices([3, 1, 2, 0, 2]);
        assert_eq!(topology.clusters(), [vec![0, 1, 2, 3]]);
    }

    #[test]
    fn detect_from_cpuinfo() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "processor\t: 0\nBogoMIPS\t: 48.00\n\nprocessor\t: 1\n\nprocessor\t: 4\nprocessor\t: 5\n\
             Hardware\t: Rockchip\n"
        )
        .unwrap();

        let topology = ClusterTopology::detect(file.path()).unwrap();
        assert_eq!(topology.clusters(), [vec![0, 1], vec![4, 5]]);
    }

    #[test]
    fn detect_without_processors_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Hardware\t: Rockchip\n").unwrap();
        assert!(ClusterTopology::detect(file.path()).is_err());
    }
}
