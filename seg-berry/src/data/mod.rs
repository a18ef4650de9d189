use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Index;
use std::path::Path;

use ndarray::{s, Array3, ArrayView3, Ix3};

use crate::consts::is_background;
use crate::{Idx3d, Label};

mod error;
mod mask;
mod mgh;
mod nii;

pub use error::LoadError;
pub use mask::BinaryMask;

#[cfg(test)]
pub(crate) use mgh::tests::write_mgh;

/// 体素分辨率, 以毫米为单位, 按 `(z, h, w)` 组织.
///
/// 该结构是只读的, 保证三个分量都是有限正数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoxelSpacing([f64; 3]);

impl VoxelSpacing {
    /// 构建体素分辨率. 任一分量不是有限正数时返回 `None`.
    pub fn new(z: f64, h: f64, w: f64) -> Option<Self> {
        [z, h, w]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
            .then_some(Self([z, h, w]))
    }

    /// 各向同性的 1mm 分辨率.
    #[inline]
    pub const fn unit() -> Self {
        Self([1.0; 3])
    }

    /// 以数组形式获取分辨率.
    #[inline]
    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }

    /// 空间方向 (相邻切片方向) 分辨率.
    #[inline]
    pub fn z_mm(&self) -> f64 {
        self.0[0]
    }

    /// 高方向分辨率.
    #[inline]
    pub fn height_mm(&self) -> f64 {
        self.0[1]
    }

    /// 宽方向分辨率.
    #[inline]
    pub fn width_mm(&self) -> f64 {
        self.0[2]
    }

    /// 三个方向中最小的分辨率.
    #[inline]
    pub fn min_mm(&self) -> f64 {
        self.0.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// 单个体素的实际体积, 以立方毫米为单位.
    #[inline]
    pub fn voxel(&self) -> f64 {
        self.0.iter().product()
    }

    /// 体素是否各向同性?
    #[inline]
    pub fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.0;
        z == h && z == w
    }

    /// 将体素索引换算为物理坐标.
    #[inline]
    pub fn to_physical(&self, (z, h, w): Idx3d) -> [f64; 3] {
        [
            z as f64 * self.0[0],
            h as f64 * self.0[1],
            w as f64 * self.0[2],
        ]
    }
}

impl Default for VoxelSpacing {
    fn default() -> Self {
        Self::unit()
    }
}

/// 轴对齐的体素包围盒, 上下界均为闭区间.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VoxelBox {
    /// 各轴最小索引.
    pub lo: Idx3d,

    /// 各轴最大索引 (包含).
    pub hi: Idx3d,
}

impl VoxelBox {
    /// 只包含一个体素的包围盒.
    #[inline]
    pub fn point(pos: Idx3d) -> Self {
        Self { lo: pos, hi: pos }
    }

    /// 包含整个 `shape` 的包围盒. `shape` 的每个分量必须非零.
    #[inline]
    pub fn full((z, h, w): Idx3d) -> Self {
        debug_assert!(z > 0 && h > 0 && w > 0);
        Self {
            lo: (0, 0, 0),
            hi: (z - 1, h - 1, w - 1),
        }
    }

    /// 扩展包围盒使其包含 `pos`.
    #[inline]
    pub fn include(&mut self, (z, h, w): Idx3d) {
        self.lo = (self.lo.0.min(z), self.lo.1.min(h), self.lo.2.min(w));
        self.hi = (self.hi.0.max(z), self.hi.1.max(h), self.hi.2.max(w));
    }

    /// 两个包围盒的并.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        let mut ans = *self;
        ans.include(other.lo);
        ans.include(other.hi);
        ans
    }

    /// 各方向向外扩张 `margin` 个体素, 并截断在 `shape` 以内.
    pub fn expand(&self, margin: usize, (z, h, w): Idx3d) -> Self {
        Self {
            lo: (
                self.lo.0.saturating_sub(margin),
                self.lo.1.saturating_sub(margin),
                self.lo.2.saturating_sub(margin),
            ),
            hi: (
                (self.hi.0 + margin).min(z - 1),
                (self.hi.1 + margin).min(h - 1),
                (self.hi.2 + margin).min(w - 1),
            ),
        }
    }

    /// 包围盒的形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        (
            self.hi.0 - self.lo.0 + 1,
            self.hi.1 - self.lo.1 + 1,
            self.hi.2 - self.lo.2 + 1,
        )
    }
}

/// 单个标签在一个体积中的统计信息.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LabelStat {
    /// 体素个数.
    pub count: usize,

    /// 包围盒.
    pub bbox: VoxelBox,
}

/// 两个体积形状或分辨率不一致. 比较这样的两个体积没有意义.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeMismatch {
    /// 第一个体积的形状.
    pub shape_a: Idx3d,

    /// 第二个体积的形状.
    pub shape_b: Idx3d,

    /// 第一个体积的分辨率.
    pub spacing_a: VoxelSpacing,

    /// 第二个体积的分辨率.
    pub spacing_b: VoxelSpacing,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "volume shape/spacing mismatch: {:?} @ {:?} vs {:?} @ {:?}",
            self.shape_a,
            self.spacing_a.as_array(),
            self.shape_b,
            self.spacing_b.as_array()
        )
    }
}

impl std::error::Error for ShapeMismatch {}

/// 3D 标签体积, 包括按 `(z, h, w)` 组织的标签数组和体素分辨率.
///
/// 形状和分辨率在对象生命周期内不变.
#[derive(Debug, Clone)]
pub struct SegVolume {
    data: Array3<Label>,
    spacing: VoxelSpacing,
}

impl Index<Idx3d> for SegVolume {
    type Output = Label;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl SegVolume {
    /// 直接由标签数组和分辨率创建. `data` 按 `(z, h, w)` 组织且不能为空.
    pub fn new(data: Array3<Label>, spacing: VoxelSpacing) -> Self {
        assert!(!data.is_empty(), "标签体积不能为空");
        Self { data, spacing }
    }

    /// 打开标签体积文件. 根据扩展名选择格式:
    ///
    /// 1. `.nii`, `.nii.gz`: NIfTI;
    /// 2. `.mgh`, `.mgz`: FreeSurfer MGH (后者为 gzip 压缩).
    ///
    /// 其他扩展名返回 [`LoadError::UnsupportedFormat`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            nii::open(path)
        } else if name.ends_with(".mgz") {
            mgh::open(path, true)
        } else if name.ends_with(".mgh") {
            mgh::open(path, false)
        } else {
            Err(LoadError::UnsupportedFormat(path.to_owned()))
        }
    }

    /// 数据形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 体素分辨率.
    #[inline]
    pub fn spacing(&self) -> VoxelSpacing {
        self.spacing
    }

    /// 单个体素的实际体积, 以立方毫米为单位.
    #[inline]
    pub fn voxel(&self) -> f64 {
        self.spacing.voxel()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, Label> {
        self.data.view()
    }

    /// 检查两个体积能否逐体素比较.
    pub fn check_compatible(&self, other: &Self) -> Result<(), ShapeMismatch> {
        if self.shape() == other.shape() && self.spacing == other.spacing {
            Ok(())
        } else {
            Err(ShapeMismatch {
                shape_a: self.shape(),
                shape_b: other.shape(),
                spacing_a: self.spacing,
                spacing_b: other.spacing,
            })
        }
    }

    /// 获取 3D 标注中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: Label) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 所有出现过的非背景标签, 升序.
    pub fn labels(&self) -> BTreeSet<Label> {
        self.data
            .iter()
            .copied()
            .filter(|p| !is_background(*p))
            .collect()
    }

    /// 一次遍历统计所有非背景标签的体素个数与包围盒.
    pub fn label_stats(&self) -> BTreeMap<Label, LabelStat> {
        let mut ans: BTreeMap<Label, LabelStat> = BTreeMap::new();
        for (pos, &label) in self.data.indexed_iter() {
            if is_background(label) {
                continue;
            }
            ans.entry(label)
                .and_modify(|s| {
                    s.count += 1;
                    s.bbox.include(pos);
                })
                .or_insert(LabelStat {
                    count: 1,
                    bbox: VoxelBox::point(pos),
                });
        }
        ans
    }

    /// 每个非背景标签的实际体积, 以立方毫米为单位.
    pub fn label_volumes(&self) -> BTreeMap<Label, f64> {
        let voxel = self.voxel();
        self.label_stats()
            .into_iter()
            .map(|(label, s)| (label, s.count as f64 * voxel))
            .collect()
    }

    /// 在包围盒 `region` 内构造 `label` 的二值掩码.
    ///
    /// 如果 `region` 越界则 panic.
    pub fn mask_in(&self, label: Label, region: &VoxelBox) -> BinaryMask {
        let (lo, hi) = (region.lo, region.hi);
        let data = self
            .data
            .slice(s![lo.0..=hi.0, lo.1..=hi.1, lo.2..=hi.2])
            .mapv(|p| p == label);
        BinaryMask::new(data, lo)
    }

    /// 在整个体积上构造 `label` 的二值掩码.
    #[inline]
    pub fn mask(&self, label: Label) -> BinaryMask {
        self.mask_in(label, &VoxelBox::full(self.shape()))
    }
}

/// 将 nifti 习惯的 `[W, H, Z]` 数组转换为 `(z, H, W)` 标签数组.
///
/// 4D 数据只取第一帧.
fn reorder_whz<T: Copy>(data: ndarray::ArrayD<T>) -> Result<Array3<T>, LoadError> {
    let data = match data.ndim() {
        3 => data,
        4 if data.shape()[3] > 0 => data.index_axis_move(ndarray::Axis(3), 0),
        _ => return Err(LoadError::UnsupportedDims(data.shape().to_vec())),
    };
    if data.is_empty() {
        return Err(LoadError::UnsupportedDims(data.shape().to_vec()));
    }
    let data = data.permuted_axes([2, 1, 0].as_slice());
    let data = data.as_standard_layout().into_owned();
    data.into_dimensionality::<Ix3>()
        .map_err(|_| LoadError::UnsupportedDims(vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, ShapeBuilder};

    fn toy() -> SegVolume {
        let mut data = Array3::<Label>::zeros((4, 5, 6));
        data[(1, 1, 1)] = 3;
        data[(2, 3, 4)] = 3;
        data[(3, 4, 5)] = 7;
        SegVolume::new(data, VoxelSpacing::new(2.0, 1.0, 0.5).unwrap())
    }

    #[test]
    fn test_spacing_validation() {
        assert!(VoxelSpacing::new(1.0, 1.0, 0.0).is_none());
        assert!(VoxelSpacing::new(1.0, f64::NAN, 1.0).is_none());
        assert!(VoxelSpacing::new(-1.0, 1.0, 1.0).is_none());
        let s = VoxelSpacing::new(2.0, 1.0, 0.5).unwrap();
        assert_eq!(s.voxel(), 1.0);
        assert_eq!(s.min_mm(), 0.5);
        assert!(!s.is_isotropic());
        assert_eq!(s.to_physical((1, 2, 4)), [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_label_stats() {
        let v = toy();
        let stats = v.label_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[&3].count, 2);
        assert_eq!(
            stats[&3].bbox,
            VoxelBox {
                lo: (1, 1, 1),
                hi: (2, 3, 4)
            }
        );
        assert_eq!(stats[&7].bbox, VoxelBox::point((3, 4, 5)));
        assert_eq!(v.labels().into_iter().collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(v.label_volumes()[&3], 2.0);
    }

    #[test]
    fn test_box_expand_clamps() {
        let b = VoxelBox::point((0, 2, 5)).expand(1, (4, 5, 6));
        assert_eq!(b.lo, (0, 1, 4));
        assert_eq!(b.hi, (1, 3, 5));
        assert_eq!(b.shape(), (2, 3, 2));
    }

    #[test]
    fn test_mask_in_region() {
        let v = toy();
        let region = VoxelBox {
            lo: (1, 1, 1),
            hi: (2, 3, 4),
        };
        let m = v.mask_in(3, &region);
        assert_eq!(m.origin(), (1, 1, 1));
        assert_eq!(m.count(), 2);
        assert_eq!(v.mask(7).count(), 1);
        assert_eq!(v.mask(9).count(), 0);
    }

    #[test]
    fn test_compatibility() {
        let a = toy();
        let b = SegVolume::new(Array3::zeros((4, 5, 6)), VoxelSpacing::unit());
        let err = a.check_compatible(&b).unwrap_err();
        assert_eq!(err.shape_a, err.shape_b);
        assert!(a.check_compatible(&a.clone()).is_ok());
    }

    #[test]
    fn test_reorder_whz() {
        // [W=3, H=2, Z=1], fortran 序.
        let raw = ndarray::Array::from_shape_vec(
            ndarray::IxDyn(&[3, 2, 1]).f(),
            vec![1u16, 2, 3, 4, 5, 6],
        )
        .unwrap();
        let data = reorder_whz(raw).unwrap();
        assert_eq!(data.dim(), (1, 2, 3));
        assert_eq!(data[(0, 0, 0)], 1);
        assert_eq!(data[(0, 0, 2)], 3);
        assert_eq!(data[(0, 1, 0)], 4);
    }
}
