//! 程序运行函数.

use rayon::prelude::*;
use seg_berry::dataset::{FreeSurferTree, VolumeSource};
use seg_berry::longitudinal::{fit_trends, TrendResult, VolumeRow, VolumeTable};
use seg_berry::report::{save_csv, write_trends, write_volume_table};
use utils::loader::RunConfig;

/// 测量每次扫描的区域体积. 读取失败的扫描被跳过.
fn measure_all(tree: &FreeSurferTree) -> VolumeTable {
    let scans: Vec<(String, String)> = tree
        .subjects()
        .into_iter()
        .flat_map(|sub| {
            tree.sessions(&sub)
                .into_iter()
                .map(move |ses| (sub.clone(), ses))
        })
        .collect();

    scans
        .par_iter()
        .filter_map(|(sub, ses)| match tree.load(sub, ses) {
            Ok(v) => Some(VolumeRow::measure(sub, ses, &v)),
            Err(e) => {
                log::warn!("{sub}/{ses}: {e}, skipped");
                None
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// 逐区域打印趋势.
fn print_trends(trends: &[TrendResult]) {
    println!("\nR2s Results:");
    for t in trends {
        match &t.subject {
            Some(s) => println!("\n{s} {}:", t.region),
            None => println!("\n{}:", t.region),
        }
        println!("Slope: {:.2}", t.slope);
        println!("R-squared: {:.2}", t.r_squared);
        println!("P-value: {:.4}", t.p_value);
    }
}

/// 实际运行.
pub fn run(cfg: &RunConfig) {
    assert!(
        cfg.freesurfer_dir.is_dir(),
        "{} is not a directory",
        cfg.freesurfer_dir.display()
    );
    let tree = FreeSurferTree::discover(&cfg.freesurfer_dir, &cfg.aparc_file, cfg.layout)
        .expect("Walking FreeSurfer directory error");

    let table = measure_all(&tree);
    utils::sep();
    println!(
        "Measured {} scans, {} regions",
        table.rows().len(),
        table.labels().len()
    );

    let path = cfg.volume_csv();
    match save_csv(&path, |w| write_volume_table(w, &table)) {
        Ok(()) => println!("Volumes saved to {}", path.display()),
        Err(e) => log::error!("cannot write {}: {e}", path.display()),
    }

    let trends = fit_trends(&table, cfg.trend_scope);
    print_trends(&trends);
    utils::sep();

    let path = cfg.trend_csv();
    match save_csv(&path, |w| write_trends(w, &trends)) {
        Ok(()) => println!("Trends saved to {}", path.display()),
        Err(e) => log::error!("cannot write {}: {e}", path.display()),
    }
}
