//! 均匀网格索引上的精确最近邻搜索.
//!
//! 网格建立在体素索引空间, 每个单元覆盖 `cell³` 个体素. 查询时以查询点所在单元为中心,
//! 按切比雪夫距离逐环向外扩展. 扫描完第 `r` 环后, 任何未扫描的点与查询点至少在一个轴上
//! 相差 `r * cell + 1` 个体素, 因此其物理距离不小于 `(r * cell + 1) * min_spacing`.

use super::squared_distance;
use crate::{Idx3d, Point3, VoxelSpacing};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::ParallelIterator;
        use rayon::slice::ParallelSlice;
    }
}

/// 下界判断留出的相对余量, 使浮点舍入无法让提前停止漏掉等距点.
const STOP_SLACK: f64 = 1.0 - 1e-9;

/// 紧凑存储的网格索引 (CSR 格式).
pub(super) struct GridIndex {
    /// 网格左上角对应的体素索引.
    origin: [i64; 3],

    /// 网格在各轴上的单元数.
    dims: [i64; 3],

    cell: i64,

    /// 第 `i` 个单元中的点是 `coords[starts[i]..starts[i + 1]]`.
    starts: Vec<usize>,

    /// 按单元排列的物理坐标.
    coords: Vec<Point3>,

    min_spacing: f64,
    spacing: VoxelSpacing,
}

impl GridIndex {
    /// 为 `target` 建立索引. `target` 不能为空, `cell` 至少为 1.
    pub(super) fn new(target: &[Idx3d], spacing: &VoxelSpacing, cell: usize) -> Self {
        debug_assert!(!target.is_empty() && cell > 0);
        let cell = cell as i64;

        let mut lo = [i64::MAX; 3];
        let mut hi = [i64::MIN; 3];
        for p in target {
            for (i, v) in idx_as_i64(*p).into_iter().enumerate() {
                lo[i] = lo[i].min(v);
                hi[i] = hi[i].max(v);
            }
        }
        let dims = [0, 1, 2].map(|i| (hi[i] - lo[i]) / cell + 1);
        let mut grid = Self {
            origin: lo,
            dims,
            cell,
            starts: vec![0; (dims[0] * dims[1] * dims[2]) as usize + 1],
            coords: vec![[0.0; 3]; target.len()],
            min_spacing: spacing.min_mm(),
            spacing: *spacing,
        };

        // 计数, 前缀和, 再按单元回填.
        let slots: Vec<usize> = target
            .iter()
            .map(|p| grid.flat(grid.cell_of(*p)))
            .collect();
        for s in slots.iter() {
            grid.starts[s + 1] += 1;
        }
        for i in 1..grid.starts.len() {
            grid.starts[i] += grid.starts[i - 1];
        }
        let mut fill = grid.starts.clone();
        for (p, s) in target.iter().zip(slots) {
            grid.coords[fill[s]] = spacing.to_physical(*p);
            fill[s] += 1;
        }
        grid
    }

    /// 体素所在的单元坐标. 网格之外的体素同样有 (越界的) 单元坐标.
    #[inline]
    fn cell_of(&self, p: Idx3d) -> [i64; 3] {
        let p = idx_as_i64(p);
        [0, 1, 2].map(|i| (p[i] - self.origin[i]).div_euclid(self.cell))
    }

    #[inline]
    fn flat(&self, [z, h, w]: [i64; 3]) -> usize {
        ((z * self.dims[1] + h) * self.dims[2] + w) as usize
    }

    #[inline]
    fn bucket(&self, c: [i64; 3]) -> &[Point3] {
        let i = self.flat(c);
        &self.coords[self.starts[i]..self.starts[i + 1]]
    }

    /// 在单元坐标 `(z, h, w)` 处取点并更新 `best`. 单元必须位于网格内.
    #[inline]
    fn visit(&self, c: [i64; 3], q: &Point3, best: &mut f64) {
        debug_assert!((0..3).all(|i| (0..self.dims[i]).contains(&c[i])));
        for t in self.bucket(c) {
            let d = squared_distance(q, t);
            if d < *best {
                *best = d;
            }
        }
    }

    /// 扫描与 `center` 切比雪夫距离恰为 `r` 且位于网格内的所有单元, 返回扫描的单元数.
    fn visit_ring(&self, center: [i64; 3], r: i64, q: &Point3, best: &mut f64) -> usize {
        let lo = [0, 1, 2].map(|i| (center[i] - r).max(0));
        let hi = [0, 1, 2].map(|i| (center[i] + r).min(self.dims[i] - 1));
        if (0..3).any(|i| lo[i] > hi[i]) {
            return 0;
        }
        let [cz, ch, cw] = center;
        let mut visited = 0;
        for z in lo[0]..=hi[0] {
            for h in lo[1]..=hi[1] {
                if (z - cz).abs() == r || (h - ch).abs() == r {
                    for w in lo[2]..=hi[2] {
                        self.visit([z, h, w], q, best);
                    }
                    visited += (hi[2] - lo[2] + 1) as usize;
                } else {
                    // 只有 w 方向的两个端面属于该环.
                    for w in [cw - r, cw + r] {
                        if (lo[2]..=hi[2]).contains(&w) {
                            self.visit([z, h, w], q, best);
                            visited += 1;
                        }
                        if r == 0 {
                            break;
                        }
                    }
                }
            }
        }
        visited
    }

    /// `center` 到网格的切比雪夫距离. 更近的环全部落在网格之外.
    #[inline]
    fn first_ring(&self, center: [i64; 3]) -> i64 {
        (0..3)
            .map(|i| (-center[i]).max(center[i] - (self.dims[i] - 1)).max(0))
            .max()
            .unwrap_or(0)
    }

    /// 从 `center` 出发, 覆盖整个网格所需的环数.
    #[inline]
    fn max_ring(&self, center: [i64; 3]) -> i64 {
        (0..3)
            .map(|i| center[i].abs().max((self.dims[i] - 1 - center[i]).abs()))
            .max()
            .unwrap_or(0)
    }

    /// 单个体素到索引中最近点的距离, 以及扫描过的单元数.
    fn search(&self, p: Idx3d) -> (f64, usize) {
        let q = self.spacing.to_physical(p);
        let center = self.cell_of(p);
        let mut best = f64::INFINITY;
        let mut visited = 0;
        for r in self.first_ring(center)..=self.max_ring(center) {
            visited += self.visit_ring(center, r, &q, &mut best);
            let bound = (r * self.cell + 1) as f64 * self.min_spacing;
            if best < bound * bound * STOP_SLACK {
                break;
            }
        }
        (best.sqrt(), visited)
    }

    /// 单个体素到索引中最近点的距离.
    #[inline]
    pub(super) fn nearest(&self, p: Idx3d) -> f64 {
        self.search(p).0
    }

    /// 批量查询, 结果与 `query` 一一对应.
    pub(super) fn nearest_all(&self, query: &[Idx3d]) -> Vec<f64> {
        #[cfg(feature = "rayon")]
        let ans = query
            .par_chunks(256)
            .flat_map_iter(|c| c.iter().map(|p| self.nearest(*p)))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let ans = query.iter().map(|p| self.nearest(*p)).collect();
        ans
    }
}

#[inline]
fn idx_as_i64((z, h, w): Idx3d) -> [i64; 3] {
    [z as i64, h as i64, w as i64]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout() {
        let target = [(2, 2, 2), (3, 3, 3), (9, 2, 2)];
        let g = GridIndex::new(&target, &VoxelSpacing::unit(), 4);
        assert_eq!(g.origin, [2, 2, 2]);
        assert_eq!(g.dims, [2, 1, 1]);
        assert_eq!(g.bucket([0, 0, 0]).len(), 2);
        assert_eq!(g.bucket([1, 0, 0]), &[[9.0, 2.0, 2.0]]);
        assert_eq!(g.cell_of((0, 2, 2)), [-1, 0, 0]);
    }

    #[test]
    fn test_single_ring() {
        // 实心立方体上, 第 r 环离中心最近的点恰好沿坐标轴相距 r.
        let target: Vec<Idx3d> = (0..7)
            .flat_map(|z| (0..7).flat_map(move |h| (0..7).map(move |w| (z, h, w))))
            .collect();
        let g = GridIndex::new(&target, &VoxelSpacing::unit(), 1);
        let q = [3.0, 3.0, 3.0];
        for r in 0..=3i64 {
            let mut best = f64::INFINITY;
            g.visit_ring([3, 3, 3], r, &q, &mut best);
            assert_eq!(best, (r * r) as f64);
        }
        assert_eq!(g.max_ring([3, 3, 3]), 3);
        assert_eq!(g.max_ring([-2, 0, 0]), 8);
    }

    #[test]
    fn test_nearest_outside_grid() {
        let target = [(10, 10, 10), (11, 10, 10)];
        let s = VoxelSpacing::new(2.0, 1.0, 1.0).unwrap();
        let g = GridIndex::new(&target, &s, 2);
        assert_eq!(g.nearest((10, 10, 10)), 0.0);
        assert_eq!(g.nearest((0, 10, 10)), 20.0);
        assert_eq!(g.nearest((11, 10, 13)), 3.0);
        assert_eq!(g.nearest_all(&[(12, 10, 10), (10, 10, 10)]), vec![2.0, 0.0]);
    }

    #[test]
    fn test_far_stray_voxel() {
        // 30³ 立方体的表面, 与一个远处的孤立体素.
        let shell: Vec<Idx3d> = (0..30)
            .flat_map(|z| (0..30).flat_map(move |h| (0..30).map(move |w| (z, h, w))))
            .filter(|p| [p.0, p.1, p.2].iter().any(|v| *v == 0 || *v == 29))
            .collect();
        assert_eq!(shell.len(), 5048);
        let far = (230, 230, 230);
        for cell in [1, 4] {
            let g = GridIndex::new(&shell, &VoxelSpacing::unit(), cell);
            let total = g.dims.iter().product::<i64>() as usize;
            let c = cell as i64;
            assert_eq!(g.first_ring(g.cell_of(far)), 230 / c - 29 / c);
            let (d, visited) = g.search(far);
            assert_eq!(d, 121_203f64.sqrt());
            // 每个单元至多扫描一次, 网格之外的单元不扫描.
            assert!(visited <= total, "cell {cell}: {visited} > {total}");
        }
    }

    #[test]
    fn test_clipped_ring() {
        let target = [(0, 0, 0), (3, 3, 3)];
        let g = GridIndex::new(&target, &VoxelSpacing::unit(), 1);
        let mut best = f64::INFINITY;
        // 以角点为中心的第 1 环在网格内只有 7 个单元.
        assert_eq!(g.visit_ring([0, 0, 0], 1, &[0.0; 3], &mut best), 7);
        assert_eq!(best, f64::INFINITY);
        assert_eq!(g.visit_ring([-5, 0, 0], 1, &[0.0; 3], &mut best), 0);
        assert_eq!(g.first_ring([-5, 1, 9]), 6);
        assert_eq!(g.first_ring([2, 2, 2]), 0);
    }
}
