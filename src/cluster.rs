//! Agglomerative hierarchical clustering (average linkage, Euclidean distance)

use crate::stats::euclidean_distance;

/// One agglomeration step.
/// Node ids `0..n` are leaves; merge `k` creates node `n + k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
}

/// Result of clustering `n` observations
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    pub n_leaves: usize,
    pub merges: Vec<Merge>,
}

impl Dendrogram {
    /// Leaves in left-to-right order of the tree
    pub fn leaf_order(&self) -> Vec<usize> {
        if self.n_leaves == 0 {
            return Vec::new();
        }
        if self.merges.is_empty() {
            return (0..self.n_leaves).collect();
        }

        let root = self.n_leaves + self.merges.len() - 1;
        let mut order = Vec::with_capacity(self.n_leaves);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node < self.n_leaves {
                order.push(node);
            } else {
                let m = &self.merges[node - self.n_leaves];
                stack.push(m.right);
                stack.push(m.left);
            }
        }
        order
    }
}

/// Pairwise Euclidean distances between rows
pub fn distance_matrix(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut d = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = euclidean_distance(&rows[i], &rows[j]);
            d[i][j] = dist;
            d[j][i] = dist;
        }
    }
    d
}

/// Closest active cluster above slot `i`, ties to the lowest slot
fn nearest_above(dist: &[Vec<f64>], active: &[bool], i: usize) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for j in (i + 1)..dist.len() {
        if active[j] && best.map_or(true, |(_, bd)| dist[i][j] < bd) {
            best = Some((j, dist[i][j]));
        }
    }
    best
}

/// UPGMA over the rows.
///
/// The closest pair of active clusters is merged at each step, with ties
/// going to the lowest (i, j) pair; the merged cluster's distance to every
/// other cluster is the size-weighted mean of its parts' distances.
///
/// Each slot caches its nearest active slot above it, so a step only
/// rescans the slots whose cached neighbour was merged away.
pub fn average_linkage(rows: &[Vec<f64>]) -> Dendrogram {
    let n = rows.len();
    let mut dist = distance_matrix(rows);
    let mut active = vec![true; n];
    // slot -> (node id, size)
    let mut nodes: Vec<(usize, usize)> = (0..n).map(|i| (i, 1)).collect();
    let mut nearest: Vec<Option<(usize, f64)>> =
        (0..n).map(|i| nearest_above(&dist, &active, i)).collect();
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if !active[i] {
                continue;
            }
            if let Some((j, d)) = nearest[i] {
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((i, j, d));
                }
            }
        }

        let (i, j, height) = match best {
            Some(b) => b,
            None => break,
        };
        let (node_i, size_i) = nodes[i];
        let (node_j, size_j) = nodes[j];

        // Lance-Williams update for average linkage; slot i holds the union
        for k in 0..n {
            if k == i || k == j || !active[k] {
                continue;
            }
            let updated = (size_i as f64 * dist[i][k] + size_j as f64 * dist[j][k])
                / (size_i + size_j) as f64;
            dist[i][k] = updated;
            dist[k][i] = updated;
        }

        merges.push(Merge {
            left: node_i,
            right: node_j,
            height,
            size: size_i + size_j,
        });
        nodes[i] = (n + step, size_i + size_j);
        active[j] = false;
        nearest[j] = None;

        // Slots above j never look at i or j
        for k in 0..j {
            if k == i || !active[k] {
                continue;
            }
            let cached = nearest[k];
            match cached {
                Some((m, _)) if m == i || m == j => {
                    nearest[k] = nearest_above(&dist, &active, k);
                }
                Some((m, d)) if k < i => {
                    let d_new = dist[k][i];
                    if d_new < d || (d_new == d && i < m) {
                        nearest[k] = Some((i, d_new));
                    }
                }
                None if k < i => nearest[k] = Some((i, dist[k][i])),
                _ => {}
            }
        }
        nearest[i] = nearest_above(&dist, &active, i);
    }

    Dendrogram { n_leaves: n, merges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identical_rows_merge_first() {
        let rows = vec![
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            vec![0.0, 0.0],
            vec![10.0, 11.0],
        ];
        let tree = average_linkage(&rows);

        assert_eq!(tree.merges.len(), 3);
        assert_eq!((tree.merges[0].left, tree.merges[0].right), (0, 2));
        assert_abs_diff_eq!(tree.merges[0].height, 0.0);
        assert_eq!((tree.merges[1].left, tree.merges[1].right), (1, 3));
        assert_eq!(tree.merges[2].size, 4);
    }

    #[test]
    fn test_average_linkage_heights() {
        // points on a line at 0, 1, 5
        let rows = vec![vec![0.0], vec![1.0], vec![5.0]];
        let tree = average_linkage(&rows);

        assert_abs_diff_eq!(tree.merges[0].height, 1.0);
        // mean of |5-0| and |5-1|
        assert_abs_diff_eq!(tree.merges[1].height, 4.5);
        assert_eq!(tree.merges[1].left, 3);
        assert_eq!(tree.merges[1].right, 2);
    }

    #[test]
    fn test_leaf_order_is_permutation() {
        let rows: Vec<Vec<f64>> = (0..7).map(|i| vec![(i * 37 % 11) as f64, i as f64]).collect();
        let tree = average_linkage(&rows);
        let mut order = tree.leaf_order();
        assert_eq!(order.len(), 7);
        order.sort();
        assert_eq!(order, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_leaf_order_groups_clusters() {
        let rows = vec![vec![0.0], vec![100.0], vec![0.5], vec![101.0]];
        let order = average_linkage(&rows).leaf_order();
        let pos = |x: usize| order.iter().position(|&o| o == x).unwrap();
        assert_eq!((pos(0) as i64 - pos(2) as i64).abs(), 1);
        assert_eq!((pos(1) as i64 - pos(3) as i64).abs(), 1);
    }

    /// Exhaustive pair scan, for comparison
    fn naive_merges(rows: &[Vec<f64>]) -> Vec<(usize, usize)> {
        let n = rows.len();
        let mut dist = distance_matrix(rows);
        let mut slots: Vec<Option<(usize, usize)>> = (0..n).map(|i| Some((i, 1))).collect();
        let mut out = Vec::new();
        for step in 0..n.saturating_sub(1) {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0..n {
                for j in (i + 1)..n {
                    if slots[i].is_some()
                        && slots[j].is_some()
                        && best.map_or(true, |(_, _, bd)| dist[i][j] < bd)
                    {
                        best = Some((i, j, dist[i][j]));
                    }
                }
            }
            let (i, j, _) = best.unwrap();
            let (ni, si) = slots[i].unwrap();
            let (nj, sj) = slots[j].unwrap();
            for k in 0..n {
                if k != i && k != j && slots[k].is_some() {
                    let d = (si as f64 * dist[i][k] + sj as f64 * dist[j][k]) / (si + sj) as f64;
                    dist[i][k] = d;
                    dist[k][i] = d;
                }
            }
            out.push((ni, nj));
            slots[i] = Some((n + step, si + sj));
            slots[j] = None;
        }
        out
    }

    #[test]
    fn test_matches_exhaustive_scan() {
        // includes exact ties from repeated rows
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![((i * 37) % 11) as f64, ((i * 13) % 7) as f64, (i % 3) as f64])
            .collect();
        let tree = average_linkage(&rows);
        let pairs: Vec<(usize, usize)> = tree.merges.iter().map(|m| (m.left, m.right)).collect();
        assert_eq!(pairs, naive_merges(&rows));
    }

    #[test]
    fn test_many_rows_finish() {
        let rows: Vec<Vec<f64>> = (0..1500)
            .map(|i| {
                let x = i as f64;
                vec![(x * 0.37).sin(), (x * 0.11).cos(), (x * 0.05).sin()]
            })
            .collect();
        let tree = average_linkage(&rows);
        assert_eq!(tree.merges.len(), 1499);
        assert_eq!(tree.merges.last().unwrap().size, 1500);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(average_linkage(&[]).leaf_order().is_empty());
        let single = average_linkage(&[vec![1.0]]);
        assert!(single.merges.is_empty());
        assert_eq!(single.leaf_order(), vec![0]);
    }
}
