//! 结果持久化与汇总.

mod csv;
mod describe;

pub use csv::{
    save_csv, write_metrics, write_trends, write_volume_table, METRICS_HEADER, TRENDS_HEADER,
};
pub use describe::{describe, summarize_by_label, Metric, Summary};
