//! 表面距离计算.
//!
//! 给定两组表面体素与体素分辨率, 求每个表面点到另一组表面最近点的欧几里得距离.
//! 两种策略都是精确的, 结果逐位一致, 且内存占用都只与点数成线性关系:
//!
//! 1. [`DistanceStrategy::Tiled`]: 分块暴力搜索;
//! 2. [`DistanceStrategy::Grid`]: 均匀网格索引 + 切比雪夫环逐层扩展.

use crate::consts::{DEFAULT_GRID_CELL, SURFEL_AREA};
use crate::morph_3d::BoundarySet;
use crate::{Idx3d, Point3, VoxelSpacing};

mod grid;
mod tiled;

/// 最近邻搜索策略.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceStrategy {
    /// 分块暴力搜索.
    Tiled {
        /// 每块的点数 (至少为 1).
        tile: usize,
    },

    /// 网格索引.
    Grid {
        /// 每个网格单元沿每个轴覆盖的体素数 (至少为 1).
        cell: usize,
    },
}

impl Default for DistanceStrategy {
    fn default() -> Self {
        Self::Grid {
            cell: DEFAULT_GRID_CELL,
        }
    }
}

impl DistanceStrategy {
    /// 参数是否合法?
    #[inline]
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Tiled { tile } => tile > 0,
            Self::Grid { cell } => cell > 0,
        }
    }
}

/// 两组表面之间的双向最近距离, 以及每个表面点的权重 (面元面积).
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceDistances {
    /// `a` 中每个点到 `b` 的最近距离 (毫米), 与 `a` 的点一一对应.
    pub a_to_b: Vec<f64>,

    /// `b` 中每个点到 `a` 的最近距离 (毫米).
    pub b_to_a: Vec<f64>,

    /// `a` 中每个点的面元面积.
    pub areas_a: Vec<f64>,

    /// `b` 中每个点的面元面积.
    pub areas_b: Vec<f64>,
}

impl SurfaceDistances {
    /// 合并两个方向的距离.
    pub fn pooled(&self) -> Vec<f64> {
        let mut ans = Vec::with_capacity(self.a_to_b.len() + self.b_to_a.len());
        ans.extend_from_slice(&self.a_to_b);
        ans.extend_from_slice(&self.b_to_a);
        ans
    }
}

/// 计算两组表面的双向最近距离.
///
/// 任一表面为空时返回 `None`, 表示距离无从计算 (而不是距离为 0).
/// `strategy` 参数非法时 panic.
pub fn surface_distances(
    a: &BoundarySet,
    b: &BoundarySet,
    spacing: &VoxelSpacing,
    strategy: DistanceStrategy,
) -> Option<SurfaceDistances> {
    assert!(strategy.is_valid(), "非法的搜索参数: {strategy:?}");
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let a_to_b = directed(a.points(), b.points(), spacing, strategy);
    let b_to_a = directed(b.points(), a.points(), spacing, strategy);
    Some(SurfaceDistances {
        a_to_b,
        b_to_a,
        areas_a: vec![SURFEL_AREA; a.len()],
        areas_b: vec![SURFEL_AREA; b.len()],
    })
}

/// 单向: `query` 中每个点到 `target` 最近点的距离. `target` 不能为空.
fn directed(
    query: &[Idx3d],
    target: &[Idx3d],
    spacing: &VoxelSpacing,
    strategy: DistanceStrategy,
) -> Vec<f64> {
    debug_assert!(!target.is_empty());
    match strategy {
        DistanceStrategy::Tiled { tile } => {
            let q = to_physical(query, spacing);
            let t = to_physical(target, spacing);
            tiled::nearest(&q, &t, tile)
        }
        DistanceStrategy::Grid { cell } => {
            grid::GridIndex::new(target, spacing, cell).nearest_all(query)
        }
    }
}

#[inline]
fn to_physical(points: &[Idx3d], spacing: &VoxelSpacing) -> Vec<Point3> {
    points.iter().map(|p| spacing.to_physical(*p)).collect()
}

/// 两个物理坐标之间欧几里得距离的平方.
///
/// 两种策略必须共用此函数, 以保证结果逐位一致.
#[inline]
pub(crate) fn squared_distance(p: &Point3, q: &Point3) -> f64 {
    let d0 = p[0] - q[0];
    let d1 = p[1] - q[1];
    let d2 = p[2] - q[2];
    d0 * d0 + d1 * d1 + d2 * d2
}
