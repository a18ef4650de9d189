//! 数据集操作.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{LoadError, SegVolume};

mod freesurfer;

pub use freesurfer::{Cohort, FreeSurferTree, SessionLayout};

/// 标签体积的来源. 按 `(受试者, 会话)` 提供已经解析好的体积.
pub trait VolumeSource {
    /// 所有受试者, 升序.
    fn subjects(&self) -> Vec<String>;

    /// 某个受试者的所有会话 (未排序, 排序由调用者决定).
    fn sessions(&self, subject: &str) -> Vec<String>;

    /// 读取一次扫描.
    fn load(&self, subject: &str, session: &str) -> Result<SegVolume, LoadError>;
}

/// 内存中的体积集合.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    volumes: BTreeMap<String, BTreeMap<String, SegVolume>>,
}

impl MemorySource {
    /// 空集合.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一次扫描, 覆盖同名旧值.
    pub fn insert(&mut self, subject: &str, session: &str, volume: SegVolume) {
        self.volumes
            .entry(subject.to_owned())
            .or_default()
            .insert(session.to_owned(), volume);
    }
}

impl VolumeSource for MemorySource {
    fn subjects(&self) -> Vec<String> {
        self.volumes.keys().cloned().collect()
    }

    fn sessions(&self, subject: &str) -> Vec<String> {
        self.volumes
            .get(subject)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn load(&self, subject: &str, session: &str) -> Result<SegVolume, LoadError> {
        self.volumes
            .get(subject)
            .and_then(|s| s.get(session))
            .cloned()
            .ok_or_else(|| LoadError::Missing {
                subject: subject.to_owned(),
                session: session.to_owned(),
            })
    }
}

/// 由会话名解析时间点: 取第一个 `-` 之后的部分解析为浮点数.
///
/// `"ses-03"` -> `3.0`; 没有 `-` 或无法解析时返回 `None`.
pub fn session_time_point(session: &str) -> Option<f64> {
    let (_, tail) = session.split_once('-')?;
    let tail = tail.split('-').next()?;
    tail.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}
