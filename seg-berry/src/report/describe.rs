//! 分标签描述统计.

use std::collections::BTreeMap;
use std::fmt;

use crate::metrics::percentile_of;
use crate::pairwise::MetricRecord;
use crate::Label;

/// 会话比较结果中可以汇总的列.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Metric {
    /// 体积变化.
    VolumeDiff,

    /// Dice 系数.
    Dice,

    /// 表面 Dice.
    SurfaceDice,

    /// 鲁棒 Hausdorff 距离.
    Hd95,
}

impl Metric {
    /// 全部列, 按输出顺序.
    pub const ALL: [Metric; 4] = [
        Metric::VolumeDiff,
        Metric::Dice,
        Metric::SurfaceDice,
        Metric::Hd95,
    ];

    /// 列名.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::VolumeDiff => "volume_diff",
            Metric::Dice => "dice",
            Metric::SurfaceDice => "surface_dice",
            Metric::Hd95 => "hd95",
        }
    }

    /// 给人看的标题.
    pub fn title(&self) -> &'static str {
        match self {
            Metric::VolumeDiff => "Volume Differences",
            Metric::Dice => "Dice Coefficients",
            Metric::SurfaceDice => "Surface Dice Coefficients",
            Metric::Hd95 => "HD95 (mm)",
        }
    }

    /// 取出一条记录中的值. 无定义时为 `None`.
    pub fn value(&self, r: &MetricRecord) -> Option<f64> {
        match self {
            Metric::VolumeDiff => Some(r.volume_diff),
            Metric::Dice => r.dice,
            Metric::SurfaceDice => Some(r.surface_dice),
            Metric::Hd95 => r.hd95,
        }
    }
}

/// 一组数的描述统计.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Summary {
    /// 有效值个数.
    pub count: usize,

    /// 均值.
    pub mean: f64,

    /// 样本标准差 (除以 `n - 1`). 只有一个值时为 `None`.
    pub std: Option<f64>,

    /// 最小值.
    pub min: f64,

    /// 下四分位数.
    pub q25: f64,

    /// 中位数.
    pub median: f64,

    /// 上四分位数.
    pub q75: f64,

    /// 最大值.
    pub max: f64,
}

/// 计算描述统计. NaN 被忽略; 没有有效值时返回 `None`.
pub fn describe(values: &[f64]) -> Option<Summary> {
    let v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    if v.is_empty() {
        return None;
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    let std = (v.len() > 1)
        .then(|| (v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt());
    Some(Summary {
        count: v.len(),
        mean,
        std,
        min: percentile_of(&v, 0.0)?,
        q25: percentile_of(&v, 25.0)?,
        median: percentile_of(&v, 50.0)?,
        q75: percentile_of(&v, 75.0)?,
        max: percentile_of(&v, 100.0)?,
    })
}

/// 按标签分组, 计算 `metric` 列的描述统计. 没有有效值的标签不出现在结果中.
pub fn summarize_by_label(records: &[MetricRecord], metric: Metric) -> BTreeMap<Label, Summary> {
    let mut groups: BTreeMap<Label, Vec<f64>> = BTreeMap::new();
    for r in records {
        if let Some(v) = metric.value(r) {
            groups.entry(r.label).or_default().push(v);
        }
    }
    groups
        .into_iter()
        .filter_map(|(label, v)| Some((label, describe(&v)?)))
        .collect()
}

impl Summary {
    /// 表头, 与 [`fmt::Display`] 的输出对齐.
    pub fn header() -> String {
        format!(
            "{:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        )
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let std = self
            .std
            .map(|s| format!("{s:.6}"))
            .unwrap_or_else(|| "/".to_string());
        write!(
            f,
            "{:>8} {:>12.6} {:>12} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
            self.count, self.mean, std, self.min, self.q25, self.median, self.q75, self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_describe() {
        let s = describe(&[1.0, 2.0, 3.0, 4.0, f64::NAN]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert!(float_eq(s.std.unwrap(), (5.0f64 / 3.0).sqrt()));
        assert_eq!((s.min, s.q25, s.median, s.q75, s.max), (1.0, 1.75, 2.5, 3.25, 4.0));

        let one = describe(&[7.0]).unwrap();
        assert_eq!(one.std, None);
        assert_eq!(one.median, 7.0);
        assert!(describe(&[]).is_none());
        assert!(describe(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_summarize_by_label() {
        let rec = |label: Label, hd95: Option<f64>| MetricRecord {
            subject: "s".to_string(),
            session_a: "a".to_string(),
            session_b: "b".to_string(),
            label,
            volume_a: 1.0,
            volume_b: 2.0,
            volume_diff: 1.0,
            dice: Some(0.5),
            surface_dice: 0.25,
            hd95,
        };
        let records = [rec(3, Some(1.0)), rec(3, Some(3.0)), rec(9, None)];
        let hd = summarize_by_label(&records, Metric::Hd95);
        assert_eq!(hd.len(), 1);
        assert_eq!(hd[&3].mean, 2.0);
        let vd = summarize_by_label(&records, Metric::VolumeDiff);
        assert_eq!(vd.keys().copied().collect::<Vec<_>>(), vec![3, 9]);
        assert_eq!(vd[&9].count, 1);
        assert_eq!(Metric::ALL.map(|m| m.name()), ["volume_diff", "dice", "surface_dice", "hd95"]);
    }
}
