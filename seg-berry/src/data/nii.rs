//! NIfTI 标签体积读取.

use std::path::Path;

use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use super::{reorder_whz, LoadError, SegVolume, VoxelSpacing};
use crate::Label;

/// 从 header 读取 `(z, H, W)` 顺序的体素分辨率.
#[inline]
fn spacing_from_header(h: &NiftiHeader) -> Result<VoxelSpacing, LoadError> {
    // [_, W, H, z, ..]
    let [_, w, h, z, ..] = h.pixdim;
    let (z, h, w) = (z as f64, h as f64, w as f64);
    VoxelSpacing::new(z, h, w).ok_or(LoadError::InvalidSpacing([z, h, w]))
}

/// 打开 nii (或 nii.gz) 文件格式的 3D 标签体积.
pub(super) fn open(path: &Path) -> Result<SegVolume, LoadError> {
    let obj = ReaderOptions::new().read_file(path)?;
    let spacing = spacing_from_header(obj.header())?;

    // [W, H, z] -> [z, H, W].
    // hint: 原第一维向下增长, 原第二维向右增长.
    let raw = obj.into_volume().into_ndarray::<f32>()?;
    if let Some(bad) = raw
        .iter()
        .copied()
        .find(|v| !(v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= Label::MAX as f32))
    {
        return Err(LoadError::InvalidLabel(bad as f64));
    }
    let data = reorder_whz(raw.mapv(|v| v as Label))?;
    Ok(SegVolume::new(data, spacing))
}
