//! 区域体积的纵向趋势.
//!
//! 先把每次扫描中每个区域的体积整理成 [`VolumeTable`], 再按 [`TrendScope`]
//! 把观测组织成 [`TimeSeries`], 最后对每条序列拟合直线.

use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;

use crate::dataset::session_time_point;
use crate::fitting::{fit_trend, TrendFit};
use crate::{Label, SegVolume};

/// 区域在结果表中的名字.
#[inline]
pub fn region_name(label: Label) -> String {
    format!("region_{label}")
}

/// 一个区域的 `(时间点, 体积)` 观测序列.
///
/// 插入顺序即发现顺序, 拟合前按时间点排序.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    points: Vec<(f64, f64)>,
}

impl TimeSeries {
    /// 空序列.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个观测.
    #[inline]
    pub fn push(&mut self, time_point: f64, volume: f64) {
        self.points.push((time_point, volume));
    }

    /// 观测个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否没有任何观测?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 所有观测.
    #[inline]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// 按时间点稳定排序.
    pub fn sort_by_time(&mut self) {
        self.points.sort_by_key(|(t, _)| OrderedFloat(*t));
    }

    /// 拟合趋势线. 观测不足两个等情况下返回 `None`, 见 [`fit_trend`].
    pub fn fit(&self) -> Option<TrendFit> {
        let mut sorted = self.clone();
        sorted.sort_by_time();
        let (t, v): (Vec<f64>, Vec<f64>) = sorted.points.into_iter().unzip();
        fit_trend(&t, &v)
    }
}

/// 体积表中的一行: 一次扫描中所有区域的体积.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeRow {
    /// 受试者.
    pub subject: String,

    /// 会话.
    pub session: String,

    /// 由会话名解析出的时间点. 无法解析时为 `None`, 该行不参与拟合.
    pub time_point: Option<f64>,

    /// 区域 -> 体积 (立方毫米). 某次扫描中没有出现的区域不在其中.
    pub volumes: BTreeMap<Label, f64>,
}

impl VolumeRow {
    /// 测量一次扫描中每个非背景区域的体积.
    pub fn measure(subject: &str, session: &str, volume: &SegVolume) -> Self {
        Self {
            subject: subject.to_owned(),
            session: session.to_owned(),
            time_point: session_time_point(session),
            volumes: volume.label_volumes(),
        }
    }
}

/// 如何把观测组织成时间序列.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrendScope {
    /// 同一区域在所有受试者上的观测合并成一条序列.
    #[default]
    Pooled,

    /// 每个受试者的每个区域各自一条序列.
    PerSubject,
}

impl TrendScope {
    /// 由名字 (`pooled` 或 `per-subject`, 不区分大小写) 解析.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pooled" => Some(Self::Pooled),
            "per-subject" | "per_subject" | "subject" => Some(Self::PerSubject),
            _ => None,
        }
    }
}

/// 全部扫描的区域体积表.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeTable {
    rows: Vec<VolumeRow>,
}

impl VolumeTable {
    /// 空表.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一行.
    #[inline]
    pub fn push(&mut self, row: VolumeRow) {
        self.rows.push(row);
    }

    /// 所有行, 按插入顺序.
    #[inline]
    pub fn rows(&self) -> &[VolumeRow] {
        &self.rows
    }

    /// 所有行中出现过的区域, 升序.
    pub fn labels(&self) -> BTreeSet<Label> {
        self.rows
            .iter()
            .flat_map(|r| r.volumes.keys().copied())
            .collect()
    }

    /// 按 `scope` 组织时间序列. 键为 `(受试者, 区域)`, 合并模式下受试者为 `None`.
    ///
    /// 没有时间点的行会被忽略.
    pub fn series(&self, scope: TrendScope) -> BTreeMap<(Option<String>, Label), TimeSeries> {
        let mut ans: BTreeMap<(Option<String>, Label), TimeSeries> = BTreeMap::new();
        for row in self.rows.iter() {
            let Some(t) = row.time_point else {
                log::warn!(
                    "{}/{}: session has no time point, excluded from trends",
                    row.subject,
                    row.session
                );
                continue;
            };
            let subject = match scope {
                TrendScope::Pooled => None,
                TrendScope::PerSubject => Some(row.subject.clone()),
            };
            for (label, v) in row.volumes.iter() {
                ans.entry((subject.clone(), *label))
                    .or_default()
                    .push(t, *v);
            }
        }
        ans
    }
}

impl FromIterator<VolumeRow> for VolumeTable {
    fn from_iter<I: IntoIterator<Item = VolumeRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// 一个区域的体积趋势.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrendResult {
    /// 受试者. 合并模式下为 `None`.
    pub subject: Option<String>,

    /// 区域标签.
    pub label: Label,

    /// 区域名, 见 [`region_name`].
    pub region: String,

    /// 单位时间内的体积变化 (立方毫米).
    pub slope: f64,

    /// 截距.
    pub intercept: f64,

    /// 拟合优度.
    pub r_squared: f64,

    /// 斜率为零的双侧检验 p 值.
    pub p_value: f64,

    /// 观测个数.
    pub n: usize,
}

/// 对体积表中每条序列拟合趋势. 无法拟合的序列 (如只有一个观测) 不出现在结果中.
pub fn fit_trends(table: &VolumeTable, scope: TrendScope) -> Vec<TrendResult> {
    table
        .series(scope)
        .into_iter()
        .filter_map(|((subject, label), s)| {
            let Some(fit) = s.fit() else {
                log::debug!("{}: {} observation(s), skipped", region_name(label), s.len());
                return None;
            };
            Some(TrendResult {
                subject,
                label,
                region: region_name(label),
                slope: fit.slope,
                intercept: fit.intercept,
                r_squared: fit.r_squared,
                p_value: fit.p_value,
                n: fit.n,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(subject: &str, session: &str, volumes: &[(Label, f64)]) -> VolumeRow {
        VolumeRow {
            subject: subject.to_owned(),
            session: session.to_owned(),
            time_point: session_time_point(session),
            volumes: volumes.iter().copied().collect(),
        }
    }

    fn table() -> VolumeTable {
        [
            row("sub-01", "ses-2", &[(17, 120.0), (53, 9.0)]),
            row("sub-01", "ses-0", &[(17, 100.0)]),
            row("sub-01", "ses-1", &[(17, 110.0)]),
            row("sub-02", "ses-0", &[(17, 200.0), (4, 30.0)]),
            row("sub-02", "ses-5", &[(17, 150.0), (4, 40.0)]),
            row("sub-02", "baseline", &[(17, 1.0)]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_region_name() {
        assert_eq!(region_name(17), "region_17");
    }

    #[test]
    fn test_series_sorted_before_fit() {
        let mut s = TimeSeries::new();
        s.push(2.0, 120.0);
        s.push(0.0, 100.0);
        s.push(1.0, 110.0);
        let f = s.fit().unwrap();
        assert!((f.slope - 10.0).abs() < 1e-9);
        assert!((f.r_squared - 1.0).abs() < 1e-9);
        assert!(f.p_value < 0.05);
        // 原序列不变.
        assert_eq!(s.points()[0], (2.0, 120.0));
    }

    #[test]
    fn test_single_observation_excluded() {
        let t: VolumeTable = [row("sub-01", "ses-1", &[(9, 5.0)])].into_iter().collect();
        assert!(fit_trends(&t, TrendScope::Pooled).is_empty());
        assert!(fit_trends(&t, TrendScope::PerSubject).is_empty());
    }

    #[test]
    fn test_per_subject() {
        let ans = fit_trends(&table(), TrendScope::PerSubject);
        let regions: Vec<(Option<&str>, Label, usize)> = ans
            .iter()
            .map(|r| (r.subject.as_deref(), r.label, r.n))
            .collect();
        assert_eq!(
            regions,
            vec![
                (Some("sub-01"), 17, 3),
                (Some("sub-02"), 4, 2),
                (Some("sub-02"), 17, 2),
            ]
        );
        assert!((ans[0].slope - 10.0).abs() < 1e-9);
        assert!((ans[2].slope + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_pooled() {
        let t = table();
        assert_eq!(t.labels().into_iter().collect::<Vec<_>>(), vec![4, 17, 53]);
        let ans = fit_trends(&t, TrendScope::Pooled);
        // 区域 53 只有一个观测; "baseline" 没有时间点.
        assert_eq!(ans.len(), 2);
        assert_eq!(ans[0].region, "region_4");
        assert_eq!(ans[1].region, "region_17");
        assert_eq!(ans[1].n, 5);
        assert!(ans.iter().all(|r| r.subject.is_none()));
    }

    #[test]
    fn test_scope_names() {
        assert_eq!(TrendScope::from_name("Pooled"), Some(TrendScope::Pooled));
        assert_eq!(TrendScope::from_name("per-subject"), Some(TrendScope::PerSubject));
        assert_eq!(TrendScope::from_name("weekly"), None);
        assert_eq!(TrendScope::default(), TrendScope::Pooled);
    }
}
