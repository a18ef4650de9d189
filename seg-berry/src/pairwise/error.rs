//! 会话对比较的运行时错误.

use std::fmt;

use crate::{LoadError, ShapeMismatch};

/// 一对会话无法比较. 错误只影响这一对, 不影响同一受试者的其他会话对.
#[derive(Debug)]
pub enum PairError {
    /// 读取某个会话的体积失败.
    Load {
        /// 出错的会话.
        session: String,

        /// 底层错误.
        source: LoadError,
    },

    /// 两个体积的形状或分辨率不一致.
    Shape(ShapeMismatch),
}

impl fmt::Display for PairError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { session, source } => write!(f, "cannot load session {session}: {source}"),
            Self::Shape(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PairError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Load { source, .. } => Some(source),
            Self::Shape(e) => Some(e),
        }
    }
}

impl From<ShapeMismatch> for PairError {
    fn from(e: ShapeMismatch) -> Self {
        Self::Shape(e)
    }
}

/// 一对会话的失败记录.
#[derive(Debug)]
pub struct PairFailure {
    /// 受试者.
    pub subject: String,

    /// 排序在前的会话.
    pub session_a: String,

    /// 排序在后的会话.
    pub session_b: String,

    /// 失败原因.
    pub error: PairError,
}

impl fmt::Display for PairFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} vs {}): {}",
            self.subject, self.session_a, self.session_b, self.error
        )
    }
}
