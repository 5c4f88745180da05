use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use twdl_core::StatusUpdate;

/// Terminal rendering of the status stream: a `[index/count]` gauge in front
/// of every status line.
#[derive(Debug, Default)]
pub struct ProgressView {
    count: usize,
    index: usize,
}

impl ProgressView {
    pub fn apply(&mut self, update: StatusUpdate) -> Option<String> {
        match update {
            StatusUpdate::Count(count) => {
                self.count = count;
                self.index = 0;
                None
            }
            StatusUpdate::Index(index) => {
                self.index = index;
                None
            }
            StatusUpdate::Status(text) if self.count == 0 => Some(text),
            StatusUpdate::Status(text) => {
                let percent = self.index * 100 / self.count;
                Some(format!("[{:>3}%] {}", percent, text))
            }
        }
    }
}

/// Print status updates on a background thread until every sender is gone.
pub fn spawn_printer(updates: mpsc::Receiver<StatusUpdate>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut view = ProgressView::default();
        for update in updates {
            if let Some(line) = view.apply(update) {
                println!("{line}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines_carry_the_progress_gauge() {
        let mut view = ProgressView::default();
        assert_eq!(
            view.apply(StatusUpdate::Status("reading".to_string())),
            Some("reading".to_string())
        );
        assert_eq!(view.apply(StatusUpdate::Count(4)), None);
        assert_eq!(view.apply(StatusUpdate::Index(1)), None);
        assert_eq!(
            view.apply(StatusUpdate::Status("1/4 @alice 123 analysing tweet".to_string())),
            Some("[ 25%] 1/4 @alice 123 analysing tweet".to_string())
        );
    }
}
