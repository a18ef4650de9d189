#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 比较同一受试者在不同时间点采集的三维脑部分割结果,
//! 逐解剖标签量化结构变化, 并对每个区域的体积做纵向线性趋势拟合.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 分割结果由外部工具 (如 FreeSurfer) 产生, 本 crate 不做分割.
//! 2. 同一受试者的各次扫描必须已经配准到同一体素网格上 (形状与分辨率完全一致),
//!   本 crate 不做任何重采样. 形状不一致的扫描对会被直接判为失败.
//! 3. 标签值为非负整数, 0 代表背景.
//!
//! # 开发计划
//!
//! ### 标签体积读取 (NIfTI / FreeSurfer MGH, MGZ) ✅
//!
//! 实现位于 `seg-berry/src/data`.
//!
//! ### 6-邻域三维形态学腐蚀与表面提取 ✅
//!
//! 表面体素 = 原掩码与腐蚀结果不同的体素.
//!
//! 实现位于 `seg-berry/src/morph_3d`.
//!
//! ### 表面点间最近距离 ✅
//!
//! 1. 分块暴力搜索, 内存只与点数线性相关. ✅
//! 2. 均匀网格空间索引, 结果与暴力搜索逐位一致. ✅
//!
//! 实现位于 `seg-berry/src/surface`.
//!
//! ### Dice / 表面 Dice / HD95 ✅
//!
//! 实现位于 `seg-berry/src/metrics`.
//!
//! ### 两两会话比较与受试者队列并行 ✅
//!
//! 支持在受试者之间协作式取消, 已经算完的结果不会丢失.
//!
//! 实现位于 `seg-berry/src/pairwise`.
//!
//! ### 体积纵向趋势 (最小二乘 + 双侧 t 检验) 的纯 Rust 实现 ✅
//!
//! 实现位于 `seg-berry/src/fitting` 和 `seg-berry/src/longitudinal`.
//!
//! ### 结果持久化 (CSV) 与分标签描述统计 ✅
//!
//! 实现位于 `seg-berry/src/report`.

/// 三维索引, 按 `(z, h, w)` 组织.
pub type Idx3d = (usize, usize, usize);

/// 分割标签值. FreeSurfer 的 aseg/DKT 标签最大约为 2035, `u16` 足够.
pub type Label = u16;

/// 物理空间 (毫米) 下的三维坐标, 按 `(z, h, w)` 组织.
pub type Point3 = [f64; 3];

/// 3D 分割体积基础数据结构.
mod data;

pub use data::{BinaryMask, LabelStat, LoadError, SegVolume, ShapeMismatch, VoxelBox, VoxelSpacing};

pub mod consts;

pub mod morph_3d;

pub mod surface;

pub mod metrics;

pub mod fitting;

pub mod longitudinal;

pub mod pairwise;

pub mod dataset;

pub mod report;

pub mod prelude;
