//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Label, Point3};

pub use crate::{BinaryMask, LoadError, SegVolume, ShapeMismatch, VoxelBox, VoxelSpacing};

pub use crate::consts::{ElemType, BACKGROUND, FREESURFER_APARC_FILE};

pub use crate::morph_3d::{extract_boundary, BoundarySet};
pub use crate::surface::{surface_distances, DistanceStrategy, SurfaceDistances};

pub use crate::metrics::{
    compare_volumes, dice, robust_hausdorff, surface_dice, LabelMetrics, MetricConfig,
};

pub use crate::pairwise::{
    run_cohort, CancelToken, CohortReport, MetricRecord, PairError, PairwiseProcessor,
    SessionOrder,
};

pub use crate::fitting::{fit_trend, TrendFit};
pub use crate::longitudinal::{fit_trends, TrendResult, TrendScope, VolumeRow, VolumeTable};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, FreeSurferTree, MemorySource, SessionLayout, VolumeSource};

pub use crate::report::{self, Metric, Summary};
