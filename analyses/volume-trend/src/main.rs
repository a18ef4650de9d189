//! 测量 FreeSurfer 输出目录中每次扫描每个区域的体积,
//! 并对每个区域拟合体积随时间变化的线性趋势.

mod runner;

fn main() {
    utils::init_logger();
    let cfg = utils::loader::RunConfig::from_env().expect("Loading run config error");
    runner::run(&cfg);
}
