//! 运行结果.

use seg_berry::pairwise::{CohortReport, MetricRecord};
use seg_berry::report::{summarize_by_label, Metric, Summary};
use std::io::{self, Write};

/// 将 `records` 中 `metric` 列的分标签统计写进 `w` 中, 以分隔线开头.
fn describe_into<W: Write>(metric: Metric, records: &[MetricRecord], w: &mut W) -> io::Result<()> {
    utils::sep_to(&mut *w)?;
    writeln!(w, "{}:", metric.title())?;
    writeln!(w, "{:>6} {}", "label", Summary::header())?;
    for (label, s) in summarize_by_label(records, metric) {
        writeln!(w, "{label:>6} {s}")?;
    }
    Ok(())
}

/// 全部受试者的比较结果.
pub struct MetricsResult {
    subjects: usize,
    report: CohortReport,
}

impl MetricsResult {
    pub fn new(subjects: usize, report: CohortReport) -> Self {
        Self { subjects, report }
    }

    /// 打印失败情况与分标签描述统计.
    pub fn analyze(&self) {
        let r = &self.report;
        utils::sep();
        println!(
            "{} / {} subjects finished, {} records, {} failed pairs",
            r.finished(self.subjects),
            self.subjects,
            r.records.len(),
            r.failures.len()
        );
        for f in r.failures.iter() {
            println!("    {f}");
        }
        if r.cancelled {
            println!("Cancelled, skipped: {}", r.skipped.join(", "));
        }

        let mut buf = Vec::with_capacity(4096);
        for metric in Metric::ALL {
            describe_into(metric, &r.records, &mut buf).unwrap();
            print!("{}", String::from_utf8_lossy(&buf));
            buf.clear();
        }
        utils::sep();
    }
}
