//! 程序运行函数.

use crate::result::MetricsResult;
use seg_berry::dataset::{FreeSurferTree, VolumeSource};
use seg_berry::pairwise::{run_cohort, CancelToken, PairwiseProcessor};
use seg_berry::report::{save_csv, write_metrics};
use utils::loader::RunConfig;
use utils::stop::StopWatcher;

/// 实际运行.
pub fn run(cfg: &RunConfig) -> MetricsResult {
    assert!(
        cfg.freesurfer_dir.is_dir(),
        "{} is not a directory",
        cfg.freesurfer_dir.display()
    );

    println!("Searching for FreeSurfer files...");
    let tree = FreeSurferTree::discover(&cfg.freesurfer_dir, &cfg.aparc_file, cfg.layout)
        .expect("Walking FreeSurfer directory error");
    let subjects = tree.subjects();
    println!(
        "Found {} subjects, running on {} cores",
        subjects.len(),
        utils::cpus()
    );

    let token = CancelToken::new();
    let watcher = StopWatcher::spawn(cfg.stop_file.clone(), token.clone());
    let processor = PairwiseProcessor::new(&tree, cfg.metrics, cfg.order);
    let report = run_cohort(&processor, &subjects, &token);
    watcher.finish();

    println!("Saving results...");
    let path = cfg.metrics_csv();
    match save_csv(&path, |w| write_metrics(w, &report.records)) {
        Ok(()) => println!("Results saved to {}", path.display()),
        Err(e) => log::error!("cannot write {}: {e}", path.display()),
    }

    MetricsResult::new(subjects.len(), report)
}
