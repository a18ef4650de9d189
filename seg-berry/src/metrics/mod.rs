//! 相似度指标: Dice, 表面 Dice 与鲁棒 Hausdorff 距离.
//!
//! 三个指标各自独立地处理退化情况, 均不会产生错误:
//!
//! 1. 两个掩码都为空时 Dice 无定义 (`None`), 与 "有分母但无交集" 的 0.0 区分开;
//! 2. 任一表面为空时表面 Dice 记为 0.0, 即 "没有表面" 按 "完全不一致" 计分;
//! 3. 任一表面为空时 Hausdorff 距离无定义 (`None`).

use std::collections::BTreeSet;

use num::traits::float::FloatCore;
use num::Float;
use ordered_float::OrderedFloat;

use crate::consts::{ElemType, DEFAULT_HD_PERCENTILE, DEFAULT_TOLERANCE_MM};
use crate::surface::{surface_distances, DistanceStrategy, SurfaceDistances};
use crate::{BinaryMask, Label, SegVolume, ShapeMismatch, VoxelBox};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 指标计算参数.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MetricConfig {
    tolerance_mm: f64,
    hd_percentile: f64,
    border: ElemType,
    strategy: DistanceStrategy,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            tolerance_mm: DEFAULT_TOLERANCE_MM,
            hd_percentile: DEFAULT_HD_PERCENTILE,
            border: ElemType::Background,
            strategy: DistanceStrategy::default(),
        }
    }
}

impl MetricConfig {
    /// 以表面 Dice 容差 (毫米) 和 Hausdorff 百分位初始化.
    ///
    /// 容差必须是非负有限数, 百分位必须在 `[0, 100]` 内, 否则返回 `None`.
    pub fn new(tolerance_mm: f64, hd_percentile: f64) -> Option<Self> {
        let tol_ok = tolerance_mm.is_finite() && tolerance_mm >= 0.0;
        let pct_ok = (0.0..=100.0).contains(&hd_percentile);
        (tol_ok && pct_ok).then(|| Self {
            tolerance_mm,
            hd_percentile,
            ..Self::default()
        })
    }

    /// 设置数组以外体素的取值.
    #[inline]
    pub fn with_border(self, border: ElemType) -> Self {
        Self { border, ..self }
    }

    /// 设置最近邻搜索策略. 参数非法时返回 `None`.
    #[inline]
    pub fn with_strategy(self, strategy: DistanceStrategy) -> Option<Self> {
        strategy.is_valid().then_some(Self { strategy, ..self })
    }

    /// 表面 Dice 容差 (毫米).
    #[inline]
    pub fn tolerance_mm(&self) -> f64 {
        self.tolerance_mm
    }

    /// Hausdorff 距离的百分位.
    #[inline]
    pub fn hd_percentile(&self) -> f64 {
        self.hd_percentile
    }

    /// 数组以外体素的取值.
    #[inline]
    pub fn border(&self) -> ElemType {
        self.border
    }

    /// 最近邻搜索策略.
    #[inline]
    pub fn strategy(&self) -> DistanceStrategy {
        self.strategy
    }
}

/// 计算 Dice 系数 `2|A∩B| / (|A|+|B|)`.
///
/// 两个掩码都为空时返回 `None`. 两个掩码必须覆盖同一区域.
pub fn dice(a: &BinaryMask, b: &BinaryMask) -> Option<f64> {
    let total = a.count() + b.count();
    if total == 0 {
        return None;
    }
    Some(2.0 * a.intersection_count(b) as f64 / total as f64)
}

/// 计算表面 Dice: 最近距离不超过 `tolerance_mm` 的表面点的面元面积之和,
/// 除以两个表面的总面积.
///
/// `distances` 为 `None` 时返回 0.0.
pub fn surface_dice(distances: Option<&SurfaceDistances>, tolerance_mm: f64) -> f64 {
    let Some(d) = distances else {
        return 0.0;
    };
    let overlap = |dist: &[f64], area: &[f64]| -> f64 {
        dist.iter()
            .zip(area)
            .filter(|(v, _)| **v <= tolerance_mm)
            .map(|(_, s)| *s)
            .sum()
    };
    let total: f64 = d.areas_a.iter().sum::<f64>() + d.areas_b.iter().sum::<f64>();
    if total <= 0.0 {
        return 0.0;
    }
    (overlap(&d.a_to_b, &d.areas_a) + overlap(&d.b_to_a, &d.areas_b)) / total
}

/// 鲁棒 Hausdorff 距离: 合并两个方向的最近距离后取第 `percentile` 百分位.
///
/// `distances` 为 `None` 时返回 `None`.
pub fn robust_hausdorff(distances: Option<&SurfaceDistances>, percentile: f64) -> Option<f64> {
    percentile_of(&distances?.pooled(), percentile)
}

/// 线性插值的百分位数. `p = 0` 为最小值, `p = 100` 为最大值.
///
/// `values` 为空, 含有 NaN 或 `p` 不在 `[0, 100]` 内时返回 `None`.
pub fn percentile_of<T: Float + FloatCore>(values: &[T], p: f64) -> Option<T> {
    if values.is_empty() || !(0.0..=100.0).contains(&p) || values.iter().any(|v| Float::is_nan(*v)) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by_key(|v| OrderedFloat(*v));

    let pos = p / 100.0 * (sorted.len() - 1) as f64;
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    if lo == hi {
        return Some(sorted[lo]);
    }
    let t = <T as num::NumCast>::from(pos - lo as f64)?;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * t)
}

/// 单个标签在一对体积之间的比较结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelMetrics {
    /// 标签.
    pub label: Label,

    /// 在第一个体积中的体积 (立方毫米).
    pub volume_a: f64,

    /// 在第二个体积中的体积 (立方毫米).
    pub volume_b: f64,

    /// Dice 系数, 两侧都为空时无定义.
    pub dice: Option<f64>,

    /// 表面 Dice.
    pub surface_dice: f64,

    /// 鲁棒 Hausdorff 距离 (毫米), 任一表面为空时无定义.
    pub hd95: Option<f64>,
}

impl LabelMetrics {
    /// 有符号的体积变化 `volume_b - volume_a`.
    #[inline]
    pub fn volume_diff(&self) -> f64 {
        self.volume_b - self.volume_a
    }
}

/// 在区域 `region` 内比较 `label` 在两个体积中的形态.
///
/// `region` 必须覆盖该标签在两个体积中的全部体素, 且四周至少多出一层体素
/// (除非已经贴着数组边缘), 否则表面会被截断.
pub fn compare_label(
    a: &SegVolume,
    b: &SegVolume,
    label: Label,
    region: &VoxelBox,
    cfg: &MetricConfig,
) -> LabelMetrics {
    let (ma, mb) = (a.mask_in(label, region), b.mask_in(label, region));
    let dice = dice(&ma, &mb);
    let (sa, sb) = (ma.boundary(cfg.border), mb.boundary(cfg.border));
    let distances = surface_distances(&sa, &sb, &a.spacing(), cfg.strategy);
    log::debug!(
        "label {label}: region {:?}, surfaces {} / {}",
        region.shape(),
        sa.len(),
        sb.len()
    );

    LabelMetrics {
        label,
        volume_a: ma.count() as f64 * a.voxel(),
        volume_b: mb.count() as f64 * b.voxel(),
        dice,
        surface_dice: surface_dice(distances.as_ref(), cfg.tolerance_mm),
        hd95: robust_hausdorff(distances.as_ref(), cfg.hd_percentile),
    }
}

/// 逐标签比较两个体积. 标签全集取两个体积中非背景标签的并集, 结果按标签升序排列.
///
/// 每个标签只在其两侧包围盒的并集 (外扩一层体素) 内计算. 两个体积的形状或分辨率
/// 不一致时返回错误.
pub fn compare_volumes(
    a: &SegVolume,
    b: &SegVolume,
    cfg: &MetricConfig,
) -> Result<Vec<LabelMetrics>, ShapeMismatch> {
    a.check_compatible(b)?;
    let (stats_a, stats_b) = (a.label_stats(), b.label_stats());
    let labels: BTreeSet<Label> = stats_a.keys().chain(stats_b.keys()).copied().collect();

    let shape = a.shape();
    let jobs: Vec<(Label, VoxelBox)> = labels
        .into_iter()
        .filter_map(|label| {
            let boxes = [stats_a.get(&label), stats_b.get(&label)];
            boxes
                .into_iter()
                .flatten()
                .map(|s| s.bbox)
                .reduce(|x, y| x.union(&y))
                .map(|bbox| (label, bbox.expand(1, shape)))
        })
        .collect();

    let run = |(label, region): &(Label, VoxelBox)| compare_label(a, b, *label, region, cfg);
    #[cfg(feature = "rayon")]
    let ans = jobs.par_iter().map(run).collect();
    #[cfg(not(feature = "rayon"))]
    let ans = jobs.iter().map(run).collect();
    Ok(ans)
}
