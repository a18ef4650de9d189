//! 对 FreeSurfer 输出目录中每个受试者的所有会话两两比较,
//! 逐标签计算体积变化, Dice, 表面 Dice 与 HD95.

mod result;
mod runner;

fn main() {
    utils::init_logger();
    let cfg = utils::loader::RunConfig::from_env().expect("Loading run config error");
    let ans = runner::run(&cfg);
    ans.analyze();
}
