//! FreeSurfer MGH / MGZ 标签体积读取.
//!
//! 文件头为大端序, 数据从第 284 字节开始, 按列优先 (第一维变化最快) 存储.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteordered::ByteOrdered;
use flate2::read::GzDecoder;
use ndarray::Array3;

use super::{LoadError, SegVolume, VoxelSpacing};
use crate::Label;

const MGH_VERSION: i32 = 1;

/// 数据区开始的字节位置.
const MGH_DATA_START: usize = 284;

/// 版本 + 4 个维度 + 类型 + dof (各 4 字节), RAS 标志 (2 字节), 15 个 `f32`.
const MGH_HEADER_USED: usize = 7 * 4 + 2 + 15 * 4;

/// 单帧体素个数上限 (1024³). 超过时视为损坏的文件头.
const MGH_MAX_VOXELS: usize = 1 << 30;

const MRI_UCHAR: i32 = 0;
const MRI_INT: i32 = 1;
const MRI_FLOAT: i32 = 3;
const MRI_SHORT: i32 = 4;

/// MGH 文件头中我们关心的部分.
#[derive(Debug, Clone, PartialEq)]
struct MghHeader {
    /// `[dim1, dim2, dim3, frames]`.
    dims: [usize; 4],
    dtype: i32,
    /// `[dim1, dim2, dim3]` 方向的体素大小.
    delta: [f64; 3],
}

impl MghHeader {
    /// 读取文件头, 并跳过填充区, 使 `reader` 停在数据区开头.
    fn read<R: Read>(reader: &mut R) -> Result<Self, LoadError> {
        let mut input = ByteOrdered::be(reader);

        if input.read_i32()? != MGH_VERSION {
            return Err(LoadError::InvalidMgh("unknown version"));
        }
        let mut dims = [0usize; 4];
        for d in dims.iter_mut() {
            let v = input.read_i32()?;
            if v <= 0 {
                return Err(LoadError::InvalidMgh("non-positive dimension"));
            }
            *d = v as usize;
        }
        let dtype = input.read_i32()?;
        let _dof = input.read_i32()?;
        let ras_good = input.read_i16()? == 1;

        let mut tail = [0f32; 15];
        for v in tail.iter_mut() {
            *v = input.read_f32()?;
        }
        // 没有有效 RAS 信息时, FreeSurfer 将体素视为 1mm 各向同性.
        let delta = if ras_good {
            [tail[0] as f64, tail[1] as f64, tail[2] as f64]
        } else {
            [1.0; 3]
        };

        let mut pad = [0u8; MGH_DATA_START - MGH_HEADER_USED];
        input.read_exact(&mut pad)?;

        Ok(Self { dims, dtype, delta })
    }

    /// 单帧体素个数. 乘积溢出或超过 [`MGH_MAX_VOXELS`] 时报错.
    fn frame_len(&self) -> Result<usize, LoadError> {
        self.dims[..3]
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(*d))
            .filter(|n| *n <= MGH_MAX_VOXELS)
            .ok_or(LoadError::InvalidMgh("too many voxels"))
    }
}

/// 将体素值转换为标签. 只接受可以无损表示为 [`Label`] 的非负整数.
#[inline]
fn to_label(v: f64) -> Result<Label, LoadError> {
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= Label::MAX as f64 {
        Ok(v as Label)
    } else {
        Err(LoadError::InvalidLabel(v))
    }
}

/// 从字节流读取完整的 MGH 标签体积 (只取第一帧).
fn read_volume<R: Read>(mut reader: R) -> Result<SegVolume, LoadError> {
    let header = MghHeader::read(&mut reader)?;
    let n = header.frame_len()?;
    let mut input = ByteOrdered::be(&mut reader);

    macro_rules! read_all {
        ($read: ident) => {{
            let mut ans: Vec<Label> = Vec::with_capacity(n);
            for _ in 0..n {
                ans.push(to_label(input.$read()? as f64)?);
            }
            ans
        }};
    }
    let voxels = match header.dtype {
        MRI_UCHAR => read_all!(read_u8),
        MRI_INT => read_all!(read_i32),
        MRI_FLOAT => read_all!(read_f32),
        MRI_SHORT => read_all!(read_i16),
        other => return Err(LoadError::UnsupportedMghType(other)),
    };

    // 列优先的 [d1, d2, d3] 恰好是行优先的 (d3, d2, d1), 即 (z, h, w).
    let [d1, d2, d3, _] = header.dims;
    let data = Array3::from_shape_vec((d3, d2, d1), voxels)
        .map_err(|_| LoadError::UnsupportedDims(header.dims.to_vec()))?;

    let [dw, dh, dz] = header.delta;
    let spacing = VoxelSpacing::new(dz, dh, dw).ok_or(LoadError::InvalidSpacing([dz, dh, dw]))?;
    Ok(SegVolume::new(data, spacing))
}

/// 打开 mgh 文件. `gz` 为 `true` 时按 mgz (gzip 压缩) 解析.
pub(super) fn open(path: &Path, gz: bool) -> Result<SegVolume, LoadError> {
    let file = BufReader::new(File::open(path)?);
    if gz {
        read_volume(BufReader::new(GzDecoder::new(file)))
    } else {
        read_volume(file)
    }
}
