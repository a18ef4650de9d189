//! 加载错误.

use std::fmt;
use std::path::PathBuf;

/// 加载标签体积时的错误.
#[derive(Debug)]
pub enum LoadError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// NIfTI 解析错误.
    Nifti(nifti::NiftiError),

    /// 无法识别的文件格式 (按扩展名判断).
    UnsupportedFormat(PathBuf),

    /// MGH 文件头不合法. 参数描述具体原因.
    InvalidMgh(&'static str),

    /// 不支持的 MGH 数据类型编码.
    UnsupportedMghType(i32),

    /// 数据维度不是 3 (或帧数为 1 的 4).
    UnsupportedDims(Vec<usize>),

    /// 体素值不是可以表示为标签的非负整数.
    InvalidLabel(f64),

    /// 体素分辨率不是有限正数. 按 `(z, h, w)` 组织.
    InvalidSpacing([f64; 3]),

    /// 数据源中不存在该受试者/会话.
    Missing {
        /// 受试者.
        subject: String,

        /// 会话.
        session: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {e}"),
            LoadError::Nifti(e) => write!(f, "NIfTI error: {e}"),
            LoadError::UnsupportedFormat(p) => write!(f, "unsupported file: {}", p.display()),
            LoadError::InvalidMgh(why) => write!(f, "invalid MGH file: {why}"),
            LoadError::UnsupportedMghType(t) => write!(f, "unsupported MGH data type {t}"),
            LoadError::UnsupportedDims(d) => write!(f, "unsupported dimensions {d:?}"),
            LoadError::InvalidLabel(v) => write!(f, "voxel value {v} is not a valid label"),
            LoadError::InvalidSpacing(s) => write!(f, "invalid voxel spacing {s:?}"),
            LoadError::Missing { subject, session } => {
                write!(f, "no volume for subject `{subject}`, session `{session}`")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Nifti(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    #[inline]
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<nifti::NiftiError> for LoadError {
    #[inline]
    fn from(e: nifti::NiftiError) -> Self {
        LoadError::Nifti(e)
    }
}
