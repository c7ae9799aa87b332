//! Merge-record encoding of a hierarchical clustering and the tree queries the
//! heat map needs from it: leaf order and flat cluster cuts.

use ndarray::{Array2, ArrayView2};

use crate::error::{HeatmapError, Result};

/// One agglomeration step. Ids below `n` are leaves, id `n + i` is the cluster
/// formed by merge `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
}

impl Merge {
    pub fn new(left: usize, right: usize, height: f64, size: usize) -> Self {
        Merge { left, right, height, size }
    }
}

/// A validated linkage of `n` leaves made of `n - 1` merges.
#[derive(Debug, Clone, PartialEq)]
pub struct Linkage {
    merges: Vec<Merge>,
}

impl Linkage {
    /// Validates the merge records: every child must exist before it is used,
    /// be used only once, and sizes must add up.
    pub fn new(merges: Vec<Merge>) -> Result<Self> {
        if merges.is_empty() {
            return Err(HeatmapError::InvalidLinkage(
                "a linkage needs at least one merge".to_string(),
            ));
        }
        let n = merges.len() + 1;
        let mut used = vec![false; 2 * n - 1];
        let mut sizes = vec![1usize; 2 * n - 1];

        for (i, m) in merges.iter().enumerate() {
            for &child in &[m.left, m.right] {
                if child >= n + i {
                    return Err(HeatmapError::InvalidLinkage(format!(
                        "merge {} uses cluster {} before it is formed",
                        i, child
                    )));
                }
                if used[child] {
                    return Err(HeatmapError::InvalidLinkage(format!(
                        "merge {} uses cluster {} more than once",
                        i, child
                    )));
                }
                used[child] = true;
            }
            if m.left == m.right {
                return Err(HeatmapError::InvalidLinkage(format!(
                    "merge {} joins cluster {} with itself",
                    i, m.left
                )));
            }
            if !m.height.is_finite() || m.height < 0.0 {
                return Err(HeatmapError::InvalidLinkage(format!(
                    "merge {} has invalid height {}",
                    i, m.height
                )));
            }
            let expected = sizes[m.left] + sizes[m.right];
            if m.size != expected {
                return Err(HeatmapError::InvalidLinkage(format!(
                    "merge {} records size {} but its children hold {} leaves",
                    i, m.size, expected
                )));
            }
            sizes[n + i] = expected;
        }
        Ok(Linkage { merges })
    }

    /// Builds a linkage from `(left, right, height, size)` rows as produced by
    /// most clustering tools.
    pub fn from_rows(rows: &[[f64; 4]]) -> Result<Self> {
        let mut merges = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let left = row_index(row[0], i, "left child")?;
            let right = row_index(row[1], i, "right child")?;
            let size = row_index(row[3], i, "size")?;
            merges.push(Merge::new(left, right, row[2], size));
        }
        Linkage::new(merges)
    }

    pub fn from_array(z: ArrayView2<'_, f64>) -> Result<Self> {
        if z.ncols() != 4 {
            return Err(HeatmapError::InvalidLinkage(format!(
                "expected 4 columns, found {}",
                z.ncols()
            )));
        }
        let rows: Vec<[f64; 4]> = z.rows().into_iter().map(|r| [r[0], r[1], r[2], r[3]]).collect();
        Linkage::from_rows(&rows)
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    pub fn n_leaves(&self) -> usize {
        self.merges.len() + 1
    }

    pub fn max_height(&self) -> f64 {
        self.merges.iter().map(|m| m.height).fold(0.0, f64::max)
    }

    fn root(&self) -> usize {
        2 * self.n_leaves() - 2
    }

    fn children(&self, node: usize) -> Option<(usize, usize)> {
        let n = self.n_leaves();
        if node < n {
            None
        } else {
            let m = &self.merges[node - n];
            Some((m.left, m.right))
        }
    }

    /// Leaves of the subtree rooted at `node`, left to right.
    pub fn subtree_leaves(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            match self.children(id) {
                Some((l, r)) => {
                    stack.push(r);
                    stack.push(l);
                }
                None => out.push(id),
            }
        }
        out
    }

    /// Left-to-right leaf order of the unsorted dendrogram layout.
    pub fn leaves(&self) -> Vec<usize> {
        self.subtree_leaves(self.root())
    }

    /// Largest merge height inside each merge's subtree. Equals the merge
    /// height for monotonic linkages.
    pub fn max_dists(&self) -> Vec<f64> {
        let n = self.n_leaves();
        let mut md = Vec::with_capacity(self.merges.len());
        for m in &self.merges {
            let mut d = m.height;
            for &c in &[m.left, m.right] {
                if c >= n {
                    d = d.max(md[c - n]);
                }
            }
            md.push(d);
        }
        md
    }

    /// Flat clusters under the distance criterion: leaves whose cophenetic
    /// distance is at most `threshold` share an id. Ids start at 1. At each
    /// merge the left and then the right subtree are numbered before the
    /// merge's own leaf children, so a leaf joined late gets a higher id than
    /// the clusters beside it.
    pub fn fcluster(&self, threshold: f64) -> Vec<u32> {
        let n = self.n_leaves();
        let md = self.max_dists();
        let mut ids = vec![0u32; n];
        let mut visited = vec![false; self.merges.len()];
        let mut next = 0u32;
        // merge whose subtree is currently being numbered as one cluster
        let mut leader: Option<usize> = None;
        let mut stack = vec![self.merges.len() - 1];

        while let Some(&k) = stack.last() {
            let m = &self.merges[k];
            if leader.is_none() && md[k] <= threshold {
                leader = Some(k);
                next += 1;
            }
            let pending = [m.left, m.right].into_iter().find(|&c| c >= n && !visited[c - n]);
            if let Some(child) = pending {
                visited[child - n] = true;
                stack.push(child - n);
                continue;
            }
            for leaf in [m.left, m.right].into_iter().filter(|&c| c < n) {
                if leader.is_none() {
                    next += 1;
                }
                ids[leaf] = next;
            }
            if leader == Some(k) {
                leader = None;
            }
            stack.pop();
        }
        ids
    }

    /// Flat cluster ids permuted into leaf order; entry `k` belongs to the
    /// `k`-th leaf drawn.
    pub fn leaf_ordered_clusters(&self, threshold: f64) -> Vec<u32> {
        let ids = self.fcluster(threshold);
        self.leaves().into_iter().map(|leaf| ids[leaf]).collect()
    }

    pub fn to_array(&self) -> Array2<f64> {
        let mut z = Array2::zeros((self.merges.len(), 4));
        for (i, m) in self.merges.iter().enumerate() {
            z[[i, 0]] = m.left as f64;
            z[[i, 1]] = m.right as f64;
            z[[i, 2]] = m.height;
            z[[i, 3]] = m.size as f64;
        }
        z
    }
}

fn row_index(v: f64, row: usize, what: &str) -> Result<usize> {
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
        return Err(HeatmapError::InvalidLinkage(format!(
            "row {} has a non-integral {} ({})",
            row, what, v
        )));
    }
    Ok(v as usize)
}

/// Inputs accepted wherever a dendrogram is assigned.
pub trait IntoLinkage {
    fn into_linkage(self) -> Result<Linkage>;
}

impl IntoLinkage for Linkage {
    fn into_linkage(self) -> Result<Linkage> {
        Ok(self)
    }
}

impl IntoLinkage for &Linkage {
    fn into_linkage(self) -> Result<Linkage> {
        Ok(self.clone())
    }
}

impl IntoLinkage for Vec<Merge> {
    fn into_linkage(self) -> Result<Linkage> {
        Linkage::new(self)
    }
}

impl IntoLinkage for &[[f64; 4]] {
    fn into_linkage(self) -> Result<Linkage> {
        Linkage::from_rows(self)
    }
}

impl IntoLinkage for Vec<[f64; 4]> {
    fn into_linkage(self) -> Result<Linkage> {
        Linkage::from_rows(&self)
    }
}

impl IntoLinkage for Array2<f64> {
    fn into_linkage(self) -> Result<Linkage> {
        Linkage::from_array(self.view())
    }
}

impl IntoLinkage for &Array2<f64> {
    fn into_linkage(self) -> Result<Linkage> {
        Linkage::from_array(self.view())
    }
}

impl IntoLinkage for ArrayView2<'_, f64> {
    fn into_linkage(self) -> Result<Linkage> {
        Linkage::from_array(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // ((0, 1), (2, (3, 4))) with the two pairs far apart
    fn five_leaves() -> Linkage {
        Linkage::from_rows(&[
            [0.0, 1.0, 1.0, 2.0],
            [3.0, 4.0, 1.5, 2.0],
            [2.0, 6.0, 2.0, 3.0],
            [5.0, 7.0, 10.0, 5.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_leaves_follow_left_first_traversal() {
        let z = five_leaves();
        assert_eq!(z.n_leaves(), 5);
        assert_eq!(z.leaves(), vec![0, 1, 2, 3, 4]);

        let swapped = Linkage::from_rows(&[
            [0.0, 1.0, 1.0, 2.0],
            [3.0, 4.0, 1.5, 2.0],
            [6.0, 2.0, 2.0, 3.0],
            [7.0, 5.0, 10.0, 5.0],
        ])
        .unwrap();
        assert_eq!(swapped.leaves(), vec![3, 4, 2, 0, 1]);
    }

    #[test]
    fn test_fcluster_cuts_at_threshold() {
        let z = five_leaves();
        assert_eq!(z.max_height(), 10.0);
        assert_eq!(z.fcluster(7.0), vec![1, 1, 2, 2, 2]);
        // (3, 4) is numbered before leaf 2, which joins it later
        assert_eq!(z.fcluster(1.6), vec![1, 1, 3, 2, 2]);
        assert_eq!(z.fcluster(1.2), vec![1, 1, 4, 2, 3]);
        assert_eq!(z.fcluster(0.5), vec![1, 2, 5, 3, 4]);
        assert_eq!(z.fcluster(10.0), vec![1; 5]);
    }

    #[test]
    fn test_leaf_ordered_clusters() {
        let z = Linkage::from_rows(&[
            [0.0, 3.0, 1.0, 2.0],
            [1.0, 2.0, 1.0, 2.0],
            [4.0, 5.0, 5.0, 4.0],
        ])
        .unwrap();
        assert_eq!(z.leaves(), vec![0, 3, 1, 2]);
        assert_eq!(z.fcluster(3.5), vec![1, 2, 2, 1]);
        assert_eq!(z.leaf_ordered_clusters(3.5), vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_non_monotonic_heights_use_subtree_maximum() {
        let z = Linkage::from_rows(&[[0.0, 1.0, 3.0, 2.0], [2.0, 3.0, 2.0, 3.0]]).unwrap();
        assert_eq!(z.max_dists(), vec![3.0, 3.0]);
        assert_eq!(z.fcluster(2.5), vec![1, 2, 3]);
        assert_eq!(z.fcluster(3.0), vec![1, 1, 1]);
    }

    #[test]
    fn test_invalid_linkages_are_rejected() {
        let forward_ref = Linkage::from_rows(&[[0.0, 3.0, 1.0, 2.0], [1.0, 2.0, 1.0, 3.0]]);
        assert!(matches!(forward_ref, Err(HeatmapError::InvalidLinkage(_))));

        let reused = Linkage::from_rows(&[[0.0, 1.0, 1.0, 2.0], [0.0, 2.0, 2.0, 2.0]]);
        assert!(matches!(reused, Err(HeatmapError::InvalidLinkage(_))));

        let bad_size = Linkage::from_rows(&[[0.0, 1.0, 1.0, 3.0]]);
        assert!(matches!(bad_size, Err(HeatmapError::InvalidLinkage(_))));

        let fractional = Linkage::from_rows(&[[0.5, 1.0, 1.0, 2.0]]);
        assert!(matches!(fractional, Err(HeatmapError::InvalidLinkage(_))));

        let negative = Linkage::from_rows(&[[0.0, 1.0, -1.0, 2.0]]);
        assert!(matches!(negative, Err(HeatmapError::InvalidLinkage(_))));

        assert!(matches!(Linkage::new(Vec::new()), Err(HeatmapError::InvalidLinkage(_))));
    }

    #[test]
    fn test_array_conversion() {
        let z = array![[0.0, 1.0, 0.5, 2.0], [2.0, 3.0, 1.0, 3.0]];
        let linkage = (&z).into_linkage().unwrap();
        assert_eq!(linkage.to_array(), z);

        let three_cols = array![[0.0, 1.0, 0.5]];
        assert!(matches!(three_cols.into_linkage(), Err(HeatmapError::InvalidLinkage(_))));
    }
}
