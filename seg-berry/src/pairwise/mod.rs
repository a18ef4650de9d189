//! 两两会话比较.
//!
//! 对一个受试者: 排序会话 -> 枚举所有无序会话对 -> 读取两个体积 ->
//! 对两侧非背景标签的并集逐个计算指标, 每个 (会话对, 标签) 产生一条 [`MetricRecord`].

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::dataset::{session_time_point, VolumeSource};
use crate::metrics::{compare_volumes, LabelMetrics, MetricConfig};
use crate::{Label, SegVolume};

mod cohort;
mod error;

pub use cohort::{run_cohort, CancelToken, CohortReport};
pub use error::{PairError, PairFailure};

/// 一条比较结果. 生成后不再修改.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricRecord {
    /// 受试者.
    pub subject: String,

    /// 排序在前的会话.
    pub session_a: String,

    /// 排序在后的会话.
    pub session_b: String,

    /// 标签.
    pub label: Label,

    /// `session_a` 中的体积 (立方毫米).
    pub volume_a: f64,

    /// `session_b` 中的体积 (立方毫米).
    pub volume_b: f64,

    /// `volume_b - volume_a`.
    pub volume_diff: f64,

    /// Dice 系数. 两侧都没有该标签时无定义.
    pub dice: Option<f64>,

    /// 表面 Dice. 任一侧没有表面时为 0.0.
    pub surface_dice: f64,

    /// 鲁棒 Hausdorff 距离 (毫米). 任一侧没有表面时无定义.
    pub hd95: Option<f64>,
}

impl MetricRecord {
    fn new(subject: &str, session_a: &str, session_b: &str, m: LabelMetrics) -> Self {
        Self {
            subject: subject.to_owned(),
            session_a: session_a.to_owned(),
            session_b: session_b.to_owned(),
            label: m.label,
            volume_a: m.volume_a,
            volume_b: m.volume_b,
            volume_diff: m.volume_diff(),
            dice: m.dice,
            surface_dice: m.surface_dice,
            hd95: m.hd95,
        }
    }
}

/// 会话排序方式. `volume_diff` 的符号以及谁是 `session_a` 都取决于它.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionOrder {
    /// 按字符串字典序. 注意 `ses-10` 会排在 `ses-2` 之前.
    #[default]
    Lexical,

    /// 先按会话名中的时间点 (见 [`session_time_point`]), 再按字典序.
    /// 没有时间点的会话排在最后.
    Natural,
}

impl SessionOrder {
    /// 由名字 (`lexical` 或 `natural`, 不区分大小写) 解析.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lexical" => Some(Self::Lexical),
            "natural" | "numeric" => Some(Self::Natural),
            _ => None,
        }
    }
}

/// 按 `order` 排序会话. 排序是确定且稳定的.
pub fn sort_sessions(sessions: &mut [String], order: SessionOrder) {
    match order {
        SessionOrder::Lexical => sessions.sort(),
        SessionOrder::Natural => sessions.sort_by_cached_key(|s| {
            let t = session_time_point(s);
            (t.is_none(), t.map(OrderedFloat), s.clone())
        }),
    }
}

/// 已排序会话的所有无序对 `(前, 后)`, 不含重复和自身配对.
pub fn session_pairs(sorted: &[String]) -> Vec<(String, String)> {
    sorted.iter().cloned().tuple_combinations().collect()
}

/// 单个受试者的处理结果.
#[derive(Debug, Default)]
pub struct SubjectOutcome {
    /// 受试者.
    pub subject: String,

    /// 所有成功会话对的结果.
    pub records: Vec<MetricRecord>,

    /// 失败的会话对.
    pub failures: Vec<PairFailure>,
}

/// 两两会话比较器.
#[derive(Debug)]
pub struct PairwiseProcessor<'a, S: VolumeSource> {
    source: &'a S,
    cfg: MetricConfig,
    order: SessionOrder,
}

impl<'a, S: VolumeSource> PairwiseProcessor<'a, S> {
    /// 初始化.
    pub fn new(source: &'a S, cfg: MetricConfig, order: SessionOrder) -> Self {
        Self { source, cfg, order }
    }

    /// 数据来源.
    #[inline]
    pub fn source(&self) -> &'a S {
        self.source
    }

    /// 指标参数.
    #[inline]
    pub fn config(&self) -> &MetricConfig {
        &self.cfg
    }

    fn load(&self, subject: &str, session: &str) -> Result<SegVolume, PairError> {
        self.source
            .load(subject, session)
            .map_err(|source| PairError::Load {
                session: session.to_owned(),
                source,
            })
    }

    /// 比较一对会话, 结果按标签升序排列.
    pub fn process_pair(
        &self,
        subject: &str,
        session_a: &str,
        session_b: &str,
    ) -> Result<Vec<MetricRecord>, PairError> {
        let a = self.load(subject, session_a)?;
        let b = self.load(subject, session_b)?;
        let metrics = compare_volumes(&a, &b, &self.cfg)?;
        log::debug!(
            "{subject}: {session_a} vs {session_b}, {} label(s)",
            metrics.len()
        );
        Ok(metrics
            .into_iter()
            .map(|m| MetricRecord::new(subject, session_a, session_b, m))
            .collect())
    }

    /// 比较一个受试者的所有会话对. 单个会话对的失败只记录下来, 不影响其他会话对.
    pub fn process_subject(&self, subject: &str) -> SubjectOutcome {
        let mut sessions = self.source.sessions(subject);
        sort_sessions(&mut sessions, self.order);

        let mut ans = SubjectOutcome {
            subject: subject.to_owned(),
            ..Default::default()
        };
        for (session_a, session_b) in session_pairs(&sessions) {
            match self.process_pair(subject, &session_a, &session_b) {
                Ok(records) => ans.records.extend(records),
                Err(error) => {
                    let failure = PairFailure {
                        subject: subject.to_owned(),
                        session_a,
                        session_b,
                        error,
                    };
                    log::warn!("{failure}");
                    ans.failures.push(failure);
                }
            }
        }
        log::info!(
            "{subject}: {} session(s), {} record(s), {} failed pair(s)",
            sessions.len(),
            ans.records.len(),
            ans.failures.len()
        );
        ans
    }
}
