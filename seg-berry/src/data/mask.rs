use ndarray::{Array3, ArrayView3, Zip};

use crate::consts::ElemType;
use crate::morph_3d::{extract_boundary, BoundarySet};
use crate::Idx3d;

/// 某个标签在 (可能经过裁剪的) 体积上的二值掩码.
///
/// `origin` 是掩码左上角体素在原体积中的索引. 掩码按需创建,
/// 该标签的指标算完后即被丢弃, 不会被持久化.
#[derive(Debug, Clone)]
pub struct BinaryMask {
    data: Array3<bool>,
    origin: Idx3d,
}

impl BinaryMask {
    /// 初始化.
    #[inline]
    pub fn new(data: Array3<bool>, origin: Idx3d) -> Self {
        Self { data, origin }
    }

    /// 掩码左上角在原体积中的索引.
    #[inline]
    pub fn origin(&self) -> Idx3d {
        self.origin
    }

    /// 掩码形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn view(&self) -> ArrayView3<'_, bool> {
        self.data.view()
    }

    /// 前景体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// 是否不存在前景?
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|p| *p)
    }

    /// 两个掩码前景交集的体素个数.
    ///
    /// 两个掩码必须覆盖原体积的同一区域, 否则程序 panic.
    pub fn intersection_count(&self, other: &Self) -> usize {
        assert_eq!(self.origin, other.origin, "掩码区域不一致");
        assert_eq!(self.shape(), other.shape(), "掩码区域不一致");
        let mut cnt = 0usize;
        Zip::from(&self.data).and(&other.data).for_each(|&a, &b| {
            if a && b {
                cnt += 1;
            }
        });
        cnt
    }

    /// 提取表面体素. 返回的索引已换算回原体积坐标.
    ///
    /// `border` 决定数组以外的体素被视为前景还是背景.
    pub fn boundary(&self, border: ElemType) -> BoundarySet {
        let (oz, oh, ow) = self.origin;
        let mut ans = extract_boundary(self.view(), border);
        ans.translate(|(z, h, w)| (z + oz, h + oh, w + ow));
        ans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_counts() {
        let mut a = Array3::from_elem((3, 3, 3), false);
        let mut b = Array3::from_elem((3, 3, 3), false);
        a[(1, 1, 1)] = true;
        a[(0, 1, 1)] = true;
        b[(1, 1, 1)] = true;
        b[(2, 2, 2)] = true;
        let (a, b) = (BinaryMask::new(a, (0, 0, 0)), BinaryMask::new(b, (0, 0, 0)));
        assert_eq!(a.count(), 2);
        assert_eq!(a.intersection_count(&b), 1);
        assert_eq!(b.intersection_count(&a), 1);
        assert!(!a.is_empty());
        assert!(BinaryMask::new(Array3::from_elem((2, 2, 2), false), (0, 0, 0)).is_empty());
    }

    #[test]
    fn test_boundary_is_translated() {
        let mut a = Array3::from_elem((3, 3, 3), false);
        a[(1, 1, 1)] = true;
        let m = BinaryMask::new(a, (10, 20, 30));
        let b = m.boundary(ElemType::Background);
        assert_eq!(b.points(), &[(11, 21, 31)]);
    }

    #[test]
    #[should_panic]
    fn test_intersection_region_mismatch() {
        let a = BinaryMask::new(Array3::from_elem((2, 2, 2), false), (0, 0, 0));
        let b = BinaryMask::new(Array3::from_elem((2, 2, 2), false), (1, 0, 0));
        a.intersection_count(&b);
    }
}
