//! 受试者队列: 在受试者之间并行, 支持协作式取消.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{MetricRecord, PairFailure, PairwiseProcessor, SubjectOutcome};
use crate::dataset::VolumeSource;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 取消标记. 可以在线程之间自由复制, 所有副本共享同一状态.
///
/// 只在开始处理每个受试者之前检查一次, 正在处理的受试者会完整跑完.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// 初始化为未取消.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// 是否已经请求取消?
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 整个队列的处理结果.
#[derive(Debug, Default)]
pub struct CohortReport {
    /// 所有完成的受试者的结果, 按受试者顺序拼接.
    pub records: Vec<MetricRecord>,

    /// 所有失败的会话对.
    pub failures: Vec<PairFailure>,

    /// 因取消而未处理的受试者.
    pub skipped: Vec<String>,

    /// 运行期间是否请求过取消.
    pub cancelled: bool,
}

impl CohortReport {
    /// 完成处理的受试者个数.
    #[inline]
    pub fn finished(&self, total: usize) -> usize {
        total - self.skipped.len()
    }
}

/// 处理 `subjects` 中的每个受试者.
///
/// 开启 `rayon` 时受试者之间并行. 每开始一个受试者前检查 `cancel`,
/// 已经完成的受试者的结果总会保留在返回值中.
pub fn run_cohort<S: VolumeSource + Sync>(
    processor: &PairwiseProcessor<S>,
    subjects: &[String],
    cancel: &CancelToken,
) -> CohortReport {
    let run = |subject: &String| -> Option<SubjectOutcome> {
        if cancel.is_cancelled() {
            return None;
        }
        Some(processor.process_subject(subject))
    };

    #[cfg(feature = "rayon")]
    let outcomes: Vec<Option<SubjectOutcome>> = subjects.par_iter().map(run).collect();
    #[cfg(not(feature = "rayon"))]
    let outcomes: Vec<Option<SubjectOutcome>> = subjects.iter().map(run).collect();

    let mut ans = CohortReport::default();
    for (subject, outcome) in subjects.iter().zip(outcomes) {
        match outcome {
            Some(o) => {
                ans.records.extend(o.records);
                ans.failures.extend(o.failures);
            }
            None => ans.skipped.push(subject.clone()),
        }
    }
    ans.cancelled = cancel.is_cancelled();
    if ans.cancelled {
        log::warn!(
            "cancelled: {} subject(s) finished, {} skipped",
            ans.finished(subjects.len()),
            ans.skipped.len()
        );
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemorySource;
    use crate::metrics::MetricConfig;
    use crate::pairwise::SessionOrder;
    use crate::{SegVolume, VoxelSpacing};
    use ndarray::Array3;

    fn source() -> MemorySource {
        let mut src = MemorySource::new();
        for (i, subject) in ["sub-01", "sub-02", "sub-03"].into_iter().enumerate() {
            for (j, session) in ["ses-1", "ses-2"].into_iter().enumerate() {
                let mut data = Array3::zeros((4, 4, 4));
                data[(1, 1, 1)] = 1;
                data[(2, 2, 2)] = (10 + i + j) as u16;
                src.insert(subject, session, SegVolume::new(data, VoxelSpacing::unit()));
            }
        }
        src
    }

    #[test]
    fn test_run_cohort() {
        let src = source();
        let p = PairwiseProcessor::new(&src, MetricConfig::default(), SessionOrder::Lexical);
        let subjects = src.subjects();
        let report = run_cohort(&p, &subjects, &CancelToken::new());
        assert!(!report.cancelled);
        assert!(report.skipped.is_empty());
        assert!(report.failures.is_empty());
        // 每个受试者一对会话, 标签 {1, 10+i, 11+i}.
        assert_eq!(report.records.len(), 9);
        let order: Vec<&str> = report.records.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(&order[..3], &["sub-01"; 3]);
        assert_eq!(&order[6..], &["sub-03"; 3]);
        assert_eq!(report.finished(subjects.len()), 3);
    }

    #[test]
    fn test_cancelled_before_start() {
        let src = source();
        let p = PairwiseProcessor::new(&src, MetricConfig::default(), SessionOrder::Lexical);
        let token = CancelToken::new();
        token.clone().cancel();
        let report = run_cohort(&p, &src.subjects(), &token);
        assert!(report.cancelled);
        assert!(report.records.is_empty());
        assert_eq!(report.skipped.len(), 3);
    }
}
