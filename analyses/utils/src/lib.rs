//! 分析程序依赖的通用组件.

use log::LevelFilter;
use simple_logger::SimpleLogger;

pub mod loader;
pub mod stop;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 初始化日志. 默认级别为 `info`, 可由 `$RUST_LOG` 覆盖.
///
/// 重复初始化时静默忽略.
pub fn init_logger() {
    let _ = SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init();
}
