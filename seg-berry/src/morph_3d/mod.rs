//! 3D 形态学操作: 6-邻域 (钻石型) 腐蚀与表面提取.

use ndarray::{Array3, ArrayView3};

use crate::consts::ElemType;
use crate::{Idx3d, Point3, VoxelSpacing};

/// 掩码的表面体素集合.
///
/// 掩码全为背景时为空. 空集合表示 "无法计算距离", 而不是 "距离全为 0".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundarySet {
    points: Vec<Idx3d>,
}

impl BoundarySet {
    /// 初始化.
    #[inline]
    pub fn new(points: Vec<Idx3d>) -> Self {
        Self { points }
    }

    /// 表面体素索引, 按行优先序排列.
    #[inline]
    pub fn points(&self) -> &[Idx3d] {
        &self.points
    }

    /// 表面体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否不存在表面?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 对每个索引实施 `op` 变换.
    pub(crate) fn translate<F: Fn(Idx3d) -> Idx3d>(&mut self, op: F) {
        self.points.iter_mut().for_each(|p| *p = op(*p));
    }

    /// 按体素分辨率换算为物理坐标 (毫米).
    pub fn physical(&self, spacing: &VoxelSpacing) -> Vec<Point3> {
        self.points.iter().map(|p| spacing.to_physical(*p)).collect()
    }
}

/// 获取 `pos` 前后上下左右六个点的坐标. 不检查越界.
#[inline]
pub(crate) fn diamond_neighbours((z, h, w): Idx3d) -> [Idx3d; 6] {
    [
        (z.wrapping_sub(1), h, w),
        (z.saturating_add(1), h, w),
        (z, h.wrapping_sub(1), w),
        (z, h.saturating_add(1), w),
        (z, h, w.wrapping_sub(1)),
        (z, h, w.saturating_add(1)),
    ]
}

/// `pos` 处腐蚀后的值: 自身及六个邻居都是前景时才保留.
/// 越界的邻居取 `border`.
#[inline]
fn eroded_at(mask: &ArrayView3<bool>, pos: Idx3d, border: ElemType) -> bool {
    mask[pos]
        && diamond_neighbours(pos)
            .into_iter()
            .all(|n| mask.get(n).copied().unwrap_or(border.is_foreground()))
}

/// 以 6-邻域结构元对 `mask` 做一次二值腐蚀.
///
/// `border` 决定数组以外的体素被视为前景还是背景. 取
/// [`ElemType::Background`] 时, 贴着数组边缘的前景会被腐蚀掉.
pub fn erode_6(mask: ArrayView3<bool>, border: ElemType) -> Array3<bool> {
    let mut out = Array3::from_elem(mask.dim(), false);

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            ndarray::Zip::indexed(&mut out)
                .par_for_each(|pos, o| *o = eroded_at(&mask, pos, border));
        } else {
            ndarray::Zip::indexed(&mut out)
                .for_each(|pos, o| *o = eroded_at(&mask, pos, border));
        }
    }
    out
}

/// 提取 `mask` 的表面: 原值与腐蚀结果不同的体素.
///
/// 返回值按行优先序排列. 若 `mask` 全为背景则返回空集合; 若 `mask`
/// 全为前景且 `border` 为 [`ElemType::Foreground`], 同样返回空集合.
pub fn extract_boundary(mask: ArrayView3<bool>, border: ElemType) -> BoundarySet {
    let eroded = erode_6(mask.view(), border);
    let points = mask
        .indexed_iter()
        .zip(eroded.iter())
        .filter_map(|((pos, &m), &e)| (m != e).then_some(pos))
        .collect();
    BoundarySet::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `shape` 中以 `lo` 为起点, 边长为 `edge` 的立方体.
    fn cube(shape: Idx3d, lo: Idx3d, edge: usize) -> Array3<bool> {
        Array3::from_shape_fn(shape, |(z, h, w)| {
            (lo.0..lo.0 + edge).contains(&z)
                && (lo.1..lo.1 + edge).contains(&h)
                && (lo.2..lo.2 + edge).contains(&w)
        })
    }

    #[test]
    fn test_single_voxel() {
        let m = cube((3, 3, 3), (1, 1, 1), 1);
        let b = extract_boundary(m.view(), ElemType::Background);
        assert_eq!(b.points(), &[(1, 1, 1)]);
        assert!(!erode_6(m.view(), ElemType::Background).iter().any(|p| *p));
    }

    #[test]
    fn test_cube_shell() {
        let m = cube((5, 5, 5), (1, 1, 1), 3);
        let eroded = erode_6(m.view(), ElemType::Background);
        assert_eq!(eroded.iter().filter(|p| **p).count(), 1);
        assert!(eroded[(2, 2, 2)]);

        let b = extract_boundary(m.view(), ElemType::Background);
        assert_eq!(b.len(), 26);
        assert!(!b.points().contains(&(2, 2, 2)));
    }

    #[test]
    fn test_border_modes() {
        let full = Array3::from_elem((3, 3, 3), true);
        let b = extract_boundary(full.view(), ElemType::Background);
        assert_eq!(b.len(), 26);

        let b = extract_boundary(full.view(), ElemType::Foreground);
        assert!(b.is_empty());

        let empty = Array3::from_elem((3, 3, 3), false);
        assert!(extract_boundary(empty.view(), ElemType::Background).is_empty());
        assert!(extract_boundary(empty.view(), ElemType::Foreground).is_empty());
    }

    #[test]
    fn test_cube_touching_edge() {
        // 立方体贴着 z = 0 面. 背景边界模式下, 该面上的体素仍然是表面.
        let m = cube((4, 5, 5), (0, 1, 1), 3);
        let bg = extract_boundary(m.view(), ElemType::Background);
        let fg = extract_boundary(m.view(), ElemType::Foreground);
        assert_eq!(bg.len(), 26);
        assert!(bg.points().contains(&(0, 2, 2)));
        assert!(!fg.points().contains(&(0, 2, 2)));
        assert_eq!(fg.len(), 25);
    }

    #[test]
    fn test_physical() {
        let b = BoundarySet::new(vec![(1, 2, 3)]);
        let s = VoxelSpacing::new(2.0, 0.5, 1.0).unwrap();
        assert_eq!(b.physical(&s), vec![[2.0, 1.0, 3.0]]);
    }
}
