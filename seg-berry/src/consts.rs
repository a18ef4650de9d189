//! 通用常量.

use crate::Label;

/// 背景标签值.
pub const BACKGROUND: Label = 0;

/// 表面 Dice 的默认容差, 单位为毫米.
pub const DEFAULT_TOLERANCE_MM: f64 = 1.0;

/// 鲁棒 Hausdorff 距离的默认百分位.
pub const DEFAULT_HD_PERCENTILE: f64 = 95.0;

/// 每个表面点的面元权重. 统一取 1.0, 不做真实的表面积估计.
pub const SURFEL_AREA: f64 = 1.0;

/// 网格空间索引的默认单元边长 (以体素个数计).
pub const DEFAULT_GRID_CELL: usize = 4;

/// 分块暴力搜索的默认块大小 (以点数计).
pub const DEFAULT_TILE: usize = 1024;

/// FreeSurfer DKT 图谱 + aseg 分割文件的默认文件名.
pub const FREESURFER_APARC_FILE: &str = "aparc.DKTatlas+aseg.mgz";

/// 会话两两比较结果的默认文件名.
pub const SESSION_METRICS_CSV: &str = "session_metrics.csv";

/// 区域体积表的默认文件名.
pub const VOLUME_ANALYSIS_CSV: &str = "volume_analysis_results.csv";

/// 区域体积趋势的默认文件名.
pub const VOLUME_TREND_CSV: &str = "volume_trends.csv";

/// 体素/像素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElemType {
    /// 数组以外 (或标签以外) 的部分, 代表背景.
    Background,

    /// 当前标签, 代表前景.
    Foreground,
}

impl ElemType {
    /// 是否为前景.
    #[inline]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Foreground)
    }

    /// 是否为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }
}

/// 标签是否是背景?
#[inline]
pub const fn is_background(label: Label) -> bool {
    label == BACKGROUND
}
