//! 停止文件: 运行期间一旦出现该文件, 就请求协作式取消.

use seg_berry::pairwise::CancelToken;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL: Duration = Duration::from_millis(200);

/// 后台轮询停止文件的线程.
pub struct StopWatcher {
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StopWatcher {
    /// 开始轮询. `path` 为 `None` 时什么也不做.
    pub fn spawn(path: Option<PathBuf>, token: CancelToken) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let handle = path.map(|path| {
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) && !token.is_cancelled() {
                    if path.exists() {
                        log::warn!("{} found, stopping after running subjects", path.display());
                        token.cancel();
                        break;
                    }
                    thread::sleep(POLL);
                }
            })
        });
        Self { done, handle }
    }

    /// 停止轮询并等待线程退出.
    pub fn finish(mut self) {
        self.done.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_stop_file_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("STOP");
        let token = CancelToken::new();
        let w = StopWatcher::spawn(Some(path.clone()), token.clone());
        assert!(!token.is_cancelled());

        std::fs::write(&path, b"").unwrap();
        let start = Instant::now();
        while !token.is_cancelled() && start.elapsed() < Duration::from_secs(10) {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(token.is_cancelled());
        w.finish();
    }

    #[test]
    fn test_no_stop_file() {
        let token = CancelToken::new();
        StopWatcher::spawn(None, token.clone()).finish();
        assert!(!token.is_cancelled());
    }
}
