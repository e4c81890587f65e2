// Immutable neighbor tables in structure-of-arrays layout, keyed by site index.

use crate::error::ConfigError;

/// One directed neighbor-list entry: `site` sees `neighbor` with coupling `interaction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    pub site: usize,
    pub neighbor: usize,
    pub interaction: f64,
}

/// Flattened lattice description consumed by the engine.
///
/// The neighbors of `site` live at positions
/// `lookup_start[site] .. lookup_start[site] + neighbor_count[site]` of the
/// parallel `neighbor_index` / `interaction_parameter` tables. Reciprocity of
/// bonds is not enforced: the engine only ever reads a site's own run.
#[derive(Debug, Clone)]
pub struct LatticeTopology {
    number_sublattices: usize,
    sublattice_of: Vec<usize>,
    neighbor_count: Vec<usize>,
    lookup_start: Vec<usize>,
    neighbor_index: Vec<usize>,
    interaction_parameter: Vec<f64>,
}

impl LatticeTopology {
    /// Build from pre-flattened tables, validating every index.
    pub fn new(
        number_sublattices: usize,
        sublattice_of: Vec<usize>,
        neighbor_count: Vec<usize>,
        lookup_start: Vec<usize>,
        neighbor_index: Vec<usize>,
        interaction_parameter: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let topology = Self {
            number_sublattices,
            sublattice_of,
            neighbor_count,
            lookup_start,
            neighbor_index,
            interaction_parameter,
        };
        topology.validate()?;
        Ok(topology)
    }

    /// Build the flattened tables from a list of directed bonds.
    ///
    /// Bonds are grouped by `site`, keeping their relative order within a
    /// site. Nothing is mirrored: a symmetric coupling needs both directions.
    pub fn from_bonds(
        number_sublattices: usize,
        sublattice_of: Vec<usize>,
        bonds: &[Bond],
    ) -> Result<Self, ConfigError> {
        let n = sublattice_of.len();

        let mut neighbor_count = vec![0usize; n];
        for bond in bonds {
            if bond.site >= n {
                return Err(ConfigError::SiteOutOfRange { site: bond.site, number_sites: n });
            }
            neighbor_count[bond.site] += 1;
        }

        let mut lookup_start = Vec::with_capacity(n);
        let mut offset = 0;
        for &count in &neighbor_count {
            lookup_start.push(offset);
            offset += count;
        }

        let mut fill = lookup_start.clone();
        let mut neighbor_index = vec![0usize; bonds.len()];
        let mut interaction_parameter = vec![0.0f64; bonds.len()];
        for bond in bonds {
            let k = fill[bond.site];
            neighbor_index[k] = bond.neighbor;
            interaction_parameter[k] = bond.interaction;
            fill[bond.site] += 1;
        }

        Self::new(
            number_sublattices,
            sublattice_of,
            neighbor_count,
            lookup_start,
            neighbor_index,
            interaction_parameter,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let n = self.sublattice_of.len();
        if n == 0 {
            return Err(ConfigError::EmptyLattice);
        }
        if self.number_sublattices == 0 {
            return Err(ConfigError::NoSublattices);
        }
        if self.neighbor_count.len() != n {
            return Err(ConfigError::TableLengthMismatch {
                table: "neighbor_count",
                expected: n,
                actual: self.neighbor_count.len(),
            });
        }
        if self.lookup_start.len() != n {
            return Err(ConfigError::TableLengthMismatch {
                table: "lookup_start",
                expected: n,
                actual: self.lookup_start.len(),
            });
        }
        if self.interaction_parameter.len() != self.neighbor_index.len() {
            return Err(ConfigError::TableLengthMismatch {
                table: "interaction_parameter",
                expected: self.neighbor_index.len(),
                actual: self.interaction_parameter.len(),
            });
        }

        for (site, &sublattice) in self.sublattice_of.iter().enumerate() {
            if sublattice >= self.number_sublattices {
                return Err(ConfigError::SublatticeOutOfRange {
                    site,
                    sublattice,
                    number_sublattices: self.number_sublattices,
                });
            }
        }

        let len = self.neighbor_index.len();
        for site in 0..n {
            let start = self.lookup_start[site];
            let count = self.neighbor_count[site];
            if start.checked_add(count).map_or(true, |end| end > len) {
                return Err(ConfigError::NeighborRunOutOfBounds { site, start, count, len });
            }
            for &neighbor in &self.neighbor_index[start..start + count] {
                if neighbor >= n {
                    return Err(ConfigError::NeighborOutOfRange {
                        site,
                        neighbor,
                        number_sites: n,
                    });
                }
            }
        }

        for (position, &value) in self.interaction_parameter.iter().enumerate() {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteInteraction { position, value });
            }
        }
        Ok(())
    }

    #[inline(always)]
    pub fn number_sites(&self) -> usize {
        self.sublattice_of.len()
    }

    #[inline(always)]
    pub fn number_sublattices(&self) -> usize {
        self.number_sublattices
    }

    #[inline(always)]
    pub fn sublattice_of(&self, site: usize) -> usize {
        self.sublattice_of[site]
    }

    pub fn sublattice_table(&self) -> &[usize] {
        &self.sublattice_of
    }

    #[inline(always)]
    pub fn neighbor_count(&self, site: usize) -> usize {
        self.neighbor_count[site]
    }

    /// Neighbor indices and matching couplings of `site`, as two equal-length slices.
    #[inline(always)]
    pub fn neighbors(&self, site: usize) -> (&[usize], &[f64]) {
        let start = self.lookup_start[site];
        let end = start + self.neighbor_count[site];
        (&self.neighbor_index[start..end], &self.interaction_parameter[start..end])
    }

    /// Directed entries `(site, neighbor)` whose reverse entry is missing or
    /// carries a different coupling.
    pub fn asymmetric_bonds(&self) -> Vec<(usize, usize)> {
        let mut missing = Vec::new();
        for site in 0..self.number_sites() {
            let (neighbors, couplings) = self.neighbors(site);
            for (&neighbor, &j) in neighbors.iter().zip(couplings) {
                let (back, back_j) = self.neighbors(neighbor);
                let mirrored = back
                    .iter()
                    .zip(back_j)
                    .any(|(&b, &bj)| b == site && bj == j);
                if !mirrored {
                    missing.push((site, neighbor));
                }
            }
        }
        missing
    }

    /// Total number of directed neighbor-list entries.
    pub fn number_entries(&self) -> usize {
        self.neighbor_index.len()
    }
}
