//! 分块暴力搜索.

use super::squared_distance;
use crate::Point3;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, ParallelIterator};
        use rayon::slice::{ParallelSlice, ParallelSliceMut};
    }
}

/// 对 `query` 的一块点, 逐块扫描 `target`, 就地更新最近距离的平方.
fn scan_block(query: &[Point3], target: &[Point3], tile: usize, out: &mut [f64]) {
    for block in target.chunks(tile) {
        for (q, best) in query.iter().zip(out.iter_mut()) {
            for t in block {
                let d = squared_distance(q, t);
                if d < *best {
                    *best = d;
                }
            }
        }
    }
    out.iter_mut().for_each(|d| *d = d.sqrt());
}

/// `query` 中每个点到 `target` 最近点的距离.
///
/// 查询点与目标点都按 `tile` 个一组分块, 任一时刻只持有 `tile * tile` 次比较的工作集.
pub(super) fn nearest(query: &[Point3], target: &[Point3], tile: usize) -> Vec<f64> {
    let mut ans = vec![f64::INFINITY; query.len()];

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            ans.par_chunks_mut(tile)
                .zip(query.par_chunks(tile))
                .for_each(|(out, q)| scan_block(q, target, tile, out));
        } else {
            ans.chunks_mut(tile)
                .zip(query.chunks(tile))
                .for_each(|(out, q)| scan_block(q, target, tile, out));
        }
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_brute_force() {
        let q = [[0.0, 0.0, 0.0], [5.0, 5.0, 5.0], [0.0, 1.5, 3.0]];
        let t = [[0.0, 0.0, 1.0], [5.0, 5.0, 7.0], [0.0, 0.0, 0.5]];
        for tile in [1, 2, 3, 10] {
            let d = nearest(&q, &t, tile);
            assert_eq!(d, vec![0.5, 2.0, 2.5]);
        }
    }
}
