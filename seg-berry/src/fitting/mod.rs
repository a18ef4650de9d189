//! 线性趋势拟合.
//!
//! 给定一个区域在若干时间点上的体积, 用最小二乘拟合一条直线,
//! 并给出斜率不为零的双侧 t 检验 p 值.

mod linear;

use statrs::function::beta::beta_reg;

/// 数值下限, 防止 `|r| = 1` 时 t 统计量除以零.
const TINY: f64 = 1e-20;

/// 一条体积趋势线.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrendFit {
    /// 单位时间内的体积变化.
    pub slope: f64,

    /// 截距.
    pub intercept: f64,

    /// Pearson 相关系数的平方.
    pub r_squared: f64,

    /// 斜率为零的双侧检验 p 值.
    pub p_value: f64,

    /// 参与拟合的观测个数.
    pub n: usize,
}

/// 以最小二乘拟合 `volumes` 对 `time_points` 的直线.
///
/// 以下情况返回 `None` (跳过该区域, 而不是报错):
///
/// 1. 观测少于两个;
/// 2. 所有时间点相同;
/// 3. 含有非有限值.
///
/// 只有两个观测时直线必然精确穿过两点, 此时两个体积不同则 p 值记为 0, 否则记为 1.
///
/// # 注意
///
/// `time_points` 与 `volumes` 长度不同时 panic.
pub fn fit_trend(time_points: &[f64], volumes: &[f64]) -> Option<TrendFit> {
    assert_eq!(time_points.len(), volumes.len(), "时间点和体积必须一一对应");
    let n = time_points.len();
    if n < 2 || time_points.iter().chain(volumes).any(|v| !v.is_finite()) {
        return None;
    }
    let fit = linear::least_squares(time_points, volumes)?;

    let p_value = if n == 2 {
        if volumes[0] == volumes[1] {
            1.0
        } else {
            0.0
        }
    } else {
        let df = (n - 2) as f64;
        let r = fit.r;
        let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
        two_sided_p(t, df)
    };

    Some(TrendFit {
        slope: fit.slope,
        intercept: fit.intercept,
        r_squared: fit.r * fit.r,
        p_value,
        n,
    })
}

/// 自由度为 `df` 的 t 统计量的双侧 p 值 `P(|T| >= |t|) = I_{df / (df + t²)}(df / 2, 1 / 2)`.
fn two_sided_p(t: f64, df: f64) -> f64 {
    debug_assert!(df > 0.0);
    if t.is_infinite() {
        return 0.0;
    }
    beta_reg(0.5 * df, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}
