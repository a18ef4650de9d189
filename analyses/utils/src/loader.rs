//! 运行配置. 优先读取环境变量, 否则退回到 `$HOME/dataset` 下的默认位置.

use seg_berry::consts::{
    DEFAULT_HD_PERCENTILE, DEFAULT_TOLERANCE_MM, FREESURFER_APARC_FILE, SESSION_METRICS_CSV,
    VOLUME_ANALYSIS_CSV, VOLUME_TREND_CSV,
};
use seg_berry::dataset::{home_dataset_dir_with, SessionLayout};
use seg_berry::longitudinal::TrendScope;
use seg_berry::metrics::MetricConfig;
use seg_berry::pairwise::SessionOrder;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// 配置错误. 只在程序启动时出现.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 环境变量的值不合法.
    Invalid {
        /// 变量名.
        key: &'static str,

        /// 原值.
        value: String,
    },

    /// 既没有设置环境变量, 也找不到用户主目录.
    NoHome(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => write!(f, "invalid ${key}: `{value}`"),
            ConfigError::NoHome(key) => write!(f, "${key} is not set and home directory is unknown"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// 分析程序的全部配置.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// FreeSurfer 输出根目录.
    pub freesurfer_dir: PathBuf,

    /// 分割文件名.
    pub aparc_file: String,

    /// 结果目录.
    pub results_dir: PathBuf,

    /// 指标参数.
    pub metrics: MetricConfig,

    /// 会话排序方式.
    pub order: SessionOrder,

    /// 趋势序列的组织方式.
    pub trend_scope: TrendScope,

    /// 目录结构.
    pub layout: SessionLayout,

    /// 出现该文件时停止处理剩余受试者.
    pub stop_file: Option<PathBuf>,
}

impl RunConfig {
    /// 从环境变量读取:
    ///
    /// 1. `$FREESURFER_DIR`, 默认 `$HOME/dataset/freesurfer`;
    /// 2. `$FREESURFER_APARC_FILE`, 默认 `aparc.DKTatlas+aseg.mgz`;
    /// 3. `$RESULTS_DIR`, 默认 `$HOME/dataset/results`;
    /// 4. `$SURFACE_TOLERANCE_MM`, `$HD_PERCENTILE`;
    /// 5. `$SESSION_ORDER` (`lexical` / `natural`), `$TREND_SCOPE` (`pooled` / `per-subject`);
    /// 6. `$STOP_FILE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// 与 [`RunConfig::from_env`] 相同, 但变量由 `lookup` 提供.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let dir = |key: &'static str, default: &str| -> Result<PathBuf, ConfigError> {
            match lookup(key) {
                Some(d) => Ok(PathBuf::from(d)),
                None => home_dataset_dir_with([default]).ok_or(ConfigError::NoHome(key)),
            }
        };
        let number = |key: &'static str, default: f64| -> Result<f64, ConfigError> {
            match lookup(key) {
                Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { key, value: v }),
                None => Ok(default),
            }
        };

        let tolerance = number("SURFACE_TOLERANCE_MM", DEFAULT_TOLERANCE_MM)?;
        let percentile = number("HD_PERCENTILE", DEFAULT_HD_PERCENTILE)?;
        let metrics = MetricConfig::new(tolerance, percentile).ok_or_else(|| ConfigError::Invalid {
            key: "SURFACE_TOLERANCE_MM/HD_PERCENTILE",
            value: format!("{tolerance}/{percentile}"),
        })?;

        let order = match lookup("SESSION_ORDER") {
            Some(v) => SessionOrder::from_name(&v).ok_or(ConfigError::Invalid {
                key: "SESSION_ORDER",
                value: v,
            })?,
            None => SessionOrder::default(),
        };
        let trend_scope = match lookup("TREND_SCOPE") {
            Some(v) => TrendScope::from_name(&v).ok_or(ConfigError::Invalid {
                key: "TREND_SCOPE",
                value: v,
            })?,
            None => TrendScope::default(),
        };

        Ok(Self {
            freesurfer_dir: dir("FREESURFER_DIR", "freesurfer")?,
            aparc_file: lookup("FREESURFER_APARC_FILE")
                .unwrap_or_else(|| FREESURFER_APARC_FILE.to_string()),
            results_dir: dir("RESULTS_DIR", "results")?,
            metrics,
            order,
            trend_scope,
            layout: SessionLayout::default(),
            stop_file: lookup("STOP_FILE").map(PathBuf::from),
        })
    }

    /// 会话比较结果的输出路径.
    #[inline]
    pub fn metrics_csv(&self) -> PathBuf {
        self.results_dir.join(SESSION_METRICS_CSV)
    }

    /// 区域体积表的输出路径.
    #[inline]
    pub fn volume_csv(&self) -> PathBuf {
        self.results_dir.join(VOLUME_ANALYSIS_CSV)
    }

    /// 趋势结果的输出路径.
    #[inline]
    pub fn trend_csv(&self) -> PathBuf {
        self.results_dir.join(VOLUME_TREND_CSV)
    }
}
