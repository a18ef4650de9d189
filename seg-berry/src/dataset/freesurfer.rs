//! FreeSurfer 输出目录.
//!
//! 典型结构为 `{root}/{subject}/{session}/mri/aparc.DKTatlas+aseg.mgz`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::VolumeSource;
use crate::{LoadError, SegVolume};

/// 受试者 -> 会话 -> 文件路径.
pub type Cohort = BTreeMap<String, BTreeMap<String, PathBuf>>;

/// 如何由文件路径得到受试者与会话: 分别取文件的第几级上层目录.
///
/// 文件的直接父目录为第 1 级.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SessionLayout {
    /// 受试者目录的级数.
    pub subject_level: usize,

    /// 会话目录的级数.
    pub session_level: usize,
}

impl Default for SessionLayout {
    /// `.../{subject}/{session}/mri/{file}`.
    fn default() -> Self {
        Self {
            subject_level: 3,
            session_level: 2,
        }
    }
}

impl SessionLayout {
    /// 由 `root` 下的相对路径解析 `(subject, session)`. 层级不足时返回 `None`.
    fn parse(&self, rel: &Path) -> Option<(String, String)> {
        let dirs: Vec<String> = rel
            .parent()?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let pick = |level: usize| -> Option<String> {
            (level >= 1 && level <= dirs.len()).then(|| dirs[dirs.len() - level].clone())
        };
        Some((pick(self.subject_level)?, pick(self.session_level)?))
    }
}

/// 磁盘上的 FreeSurfer 输出目录.
#[derive(Debug, Clone)]
pub struct FreeSurferTree {
    root: PathBuf,
    cohort: Cohort,
}

impl FreeSurferTree {
    /// 递归遍历 `root`, 收集所有文件名等于 `file_name` 的文件.
    ///
    /// 遍历顺序是确定的 (按文件名排序). 同一 `(subject, session)` 出现多次时只保留第一个.
    pub fn discover<P: AsRef<Path>>(
        root: P,
        file_name: &str,
        layout: SessionLayout,
    ) -> io::Result<Self> {
        let root = root.as_ref().to_owned();
        let mut found = Vec::new();
        walk(&root, file_name, &mut found)?;

        let mut cohort = Cohort::new();
        for path in found {
            let Some((subject, session)) = path
                .strip_prefix(&root)
                .ok()
                .and_then(|rel| layout.parse(rel))
            else {
                log::warn!("{}: cannot infer subject/session, ignored", path.display());
                continue;
            };
            let sessions = cohort.entry(subject).or_default();
            if let Some(old) = sessions.get(&session) {
                log::warn!(
                    "{}: duplicate of {}, ignored",
                    path.display(),
                    old.display()
                );
                continue;
            }
            sessions.insert(session, path);
        }
        log::info!(
            "{}: {} subject(s), {} scan(s)",
            root.display(),
            cohort.len(),
            cohort.values().map(BTreeMap::len).sum::<usize>()
        );
        Ok(Self { root, cohort })
    }

    /// 根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 发现的全部文件.
    #[inline]
    pub fn cohort(&self) -> &Cohort {
        &self.cohort
    }
}

impl VolumeSource for FreeSurferTree {
    fn subjects(&self) -> Vec<String> {
        self.cohort.keys().cloned().collect()
    }

    fn sessions(&self, subject: &str) -> Vec<String> {
        self.cohort
            .get(subject)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn load(&self, subject: &str, session: &str) -> Result<SegVolume, LoadError> {
        let path = self
            .cohort
            .get(subject)
            .and_then(|s| s.get(session))
            .ok_or_else(|| LoadError::Missing {
                subject: subject.to_owned(),
                session: session.to_owned(),
            })?;
        SegVolume::open(path)
    }
}

/// 深度优先遍历, 同一目录下按名字排序.
fn walk(dir: &Path, file_name: &str, found: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for e in entries {
        let ty = e.file_type()?;
        if ty.is_dir() {
            walk(&e.path(), file_name, found)?;
        } else if ty.is_file() && e.file_name() == file_name {
            found.push(e.path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::write_mgh;
    use crate::VoxelSpacing;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use ndarray::Array3;

    const FILE: &str = "aparc.DKTatlas+aseg.mgz";

    fn put(root: &Path, rel: &[&str], label: u16) {
        let mut path = root.to_owned();
        path.extend(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut data = Array3::zeros((3, 3, 3));
        data[(1, 1, 1)] = label;
        let v = SegVolume::new(data, VoxelSpacing::unit());
        let mut enc = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::fast());
        write_mgh(&mut enc, &v).unwrap();
        enc.finish().unwrap();
    }

    #[test]
    fn test_layout_parse() {
        let l = SessionLayout::default();
        assert_eq!(
            l.parse(Path::new("sub-01/ses-1/mri/x.mgz")),
            Some(("sub-01".to_string(), "ses-1".to_string()))
        );
        assert_eq!(l.parse(Path::new("ses-1/mri/x.mgz")), None);
        let flat = SessionLayout {
            subject_level: 2,
            session_level: 1,
        };
        assert_eq!(
            flat.parse(Path::new("a/sub-01/ses-1/x.mgz")),
            Some(("sub-01".to_string(), "ses-1".to_string()))
        );
    }

    #[test]
    fn test_discover_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, &["sub-02", "ses-1", "mri", FILE], 4);
        put(root, &["sub-01", "ses-2", "mri", FILE], 17);
        put(root, &["sub-01", "ses-1", "mri", FILE], 17);
        put(root, &["sub-01", "ses-1", "mri", "aseg.mgz"], 9);
        put(root, &["mri", FILE], 1);

        let tree = FreeSurferTree::discover(root, FILE, SessionLayout::default()).unwrap();
        assert_eq!(tree.subjects(), vec!["sub-01", "sub-02"]);
        assert_eq!(tree.sessions("sub-01"), vec!["ses-1", "ses-2"]);
        assert_eq!(tree.cohort().values().map(BTreeMap::len).sum::<usize>(), 3);

        let v = tree.load("sub-01", "ses-2").unwrap();
        assert_eq!(v.count(17), 1);
        assert!(matches!(
            tree.load("sub-03", "ses-1"),
            Err(LoadError::Missing { .. })
        ));
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FreeSurferTree::discover(dir.path().join("nope"), FILE, SessionLayout::default()).is_err());
    }
}
