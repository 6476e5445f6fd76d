use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// Shared run flag cleared by Ctrl-C. Read loops poll it between reads.
#[derive(Clone)]
pub struct StopFlag {
    running: Arc<AtomicBool>,
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl StopFlag {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

// Install the Ctrl-C handler; a second signal is not special-cased, reads time out quickly.
pub fn install_stop_handler() -> Result<StopFlag> {
    let flag = StopFlag::new();
    let for_signal = flag.clone();
    ctrlc::set_handler(move || {
        info!("stop requested, finishing current read");
        for_signal.stop();
    })
    .context("installing Ctrl-C handler failed")?;
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(other.is_running());
        flag.stop();
        assert!(!other.is_running());
    }
}
