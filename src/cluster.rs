//! Agglomerative clustering of matrix rows or columns into a [`Linkage`].

use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::error::{Axis, HeatmapError, Result};
use crate::linkage::{Linkage, Merge};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Metric {
    Euclidean,
    Manhattan,
    Cosine,
    Correlation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Method {
    Single,
    Complete,
    Average,
    Weighted,
}

impl Metric {
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self {
            Metric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            Metric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
            Metric::Cosine => cosine_distance(a.iter().copied(), b.iter().copied()),
            Metric::Correlation => {
                let ma = a.mean().unwrap_or(0.0);
                let mb = b.mean().unwrap_or(0.0);
                cosine_distance(a.iter().map(|x| x - ma), b.iter().map(|y| y - mb))
            }
        }
    }
}

fn cosine_distance(a: impl Iterator<Item = f64>, b: impl Iterator<Item = f64>) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0, 0.0, 0.0);
    for (x, y) in a.zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (na.sqrt() * nb.sqrt())).max(0.0)
}

/// Square matrix of pairwise distances between the rows of `data`.
pub fn pdist(data: ArrayView2<'_, f64>, metric: Metric) -> Vec<Vec<f64>> {
    let n = data.nrows();
    debug!("Computing {}x{} pairwise distance matrix", n, n);
    (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| if i == j { 0.0 } else { metric.distance(data.row(i), data.row(j)) })
                .collect()
        })
        .collect()
}

/// Naive agglomerative clustering with Lance-Williams updates. Cluster `n + k`
/// is the one formed at step `k`; the smaller id is the left child.
pub fn linkage(dist_matrix: &[Vec<f64>], method: Method) -> Result<Linkage> {
    let n = dist_matrix.len();
    if n < 2 {
        return Err(HeatmapError::InvalidData(format!(
            "clustering needs at least 2 observations, found {}",
            n
        )));
    }
    if dist_matrix.iter().any(|row| row.len() != n) {
        return Err(HeatmapError::InvalidData("distance matrix is not square".to_string()));
    }

    let mut d: Vec<Vec<f64>> = dist_matrix.to_vec();
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1usize; n];
    let mut active = vec![true; n];
    let mut merges = Vec::with_capacity(n - 1);

    for step in 0..n - 1 {
        let mut best = (usize::MAX, usize::MAX, f64::INFINITY);
        for i in 0..n {
            if !active[i] {
                continue;
            }
            for j in (i + 1)..n {
                if active[j] && d[i][j] < best.2 {
                    best = (i, j, d[i][j]);
                }
            }
        }
        let (i, j, height) = best;
        if i == usize::MAX {
            return Err(HeatmapError::InvalidData(
                "distance matrix contains no finite distances".to_string(),
            ));
        }

        let (si, sj) = (sizes[i] as f64, sizes[j] as f64);
        for k in 0..n {
            if !active[k] || k == i || k == j {
                continue;
            }
            let updated = match method {
                Method::Single => d[i][k].min(d[j][k]),
                Method::Complete => d[i][k].max(d[j][k]),
                Method::Average => (si * d[i][k] + sj * d[j][k]) / (si + sj),
                Method::Weighted => 0.5 * (d[i][k] + d[j][k]),
            };
            d[i][k] = updated;
            d[k][i] = updated;
        }

        let (left, right) = if ids[i] < ids[j] { (ids[i], ids[j]) } else { (ids[j], ids[i]) };
        merges.push(Merge::new(left, right, height, sizes[i] + sizes[j]));

        sizes[i] += sizes[j];
        ids[i] = n + step;
        active[j] = false;
    }

    Linkage::new(merges)
}

/// Clusters the rows or the columns of `data`.
pub fn cluster_axis(
    data: ArrayView2<'_, f64>,
    axis: Axis,
    metric: Metric,
    method: Method,
) -> Result<Linkage> {
    let dist = match axis {
        Axis::Rows => pdist(data, metric),
        Axis::Columns => pdist(data.t(), metric),
    };
    linkage(&dist, method)
}

/// Copies `data` with rows and columns permuted into the given leaf orders.
pub fn reorder(
    data: ArrayView2<'_, f64>,
    row_order: Option<&[usize]>,
    col_order: Option<&[usize]>,
) -> Array2<f64> {
    let rows = match row_order {
        Some(order) => data.select(ndarray::Axis(0), order),
        None => data.to_owned(),
    };
    match col_order {
        Some(order) => rows.select(ndarray::Axis(1), order),
        None => rows,
    }
}
