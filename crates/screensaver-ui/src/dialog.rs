//! File selection off the render thread.
//!
//! The native dialog blocks its caller, so it runs on a dedicated thread and
//! hands back a single [`FileSelection`] message. The render loop polls for
//! it without blocking.

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};

/// Something that can ask the user for one file.
pub trait FileDialog: Send + Sync + 'static {
    /// Blocks until the user picks a file or cancels.
    fn pick_file(&self) -> Option<PathBuf>;
}

/// OS-native dialog backed by `rfd`.
#[derive(Debug, Clone, Default)]
pub struct NativeFileDialog {
    title: Option<String>,
    filter: Option<(String, Vec<String>)>,
}

/// Extensions the texture decoder understands.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

impl NativeFileDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Restricts the dialog to the image formats the decoder supports.
    pub fn with_image_filter(mut self) -> Self {
        self.filter = Some((
            "Images".to_string(),
            IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        ));
        self
    }
}

impl FileDialog for NativeFileDialog {
    fn pick_file(&self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new();
        if let Some(title) = &self.title {
            dialog = dialog.set_title(title.as_str());
        }
        if let Some((name, extensions)) = &self.filter {
            dialog = dialog.add_filter(name.as_str(), extensions.as_slice());
        }
        dialog.pick_file()
    }
}

/// Result of one dialog run. `None` means the user cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    pub path: Option<PathBuf>,
}

/// State of an in-flight dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPoll {
    Pending,
    Ready(FileSelection),
    /// The worker ended without answering (it panicked).
    Lost,
}

/// Handle to a dialog running on its own thread.
///
/// The worker is detached; dropping the handle only discards its answer.
pub struct FileDialogTask {
    receiver: Receiver<FileSelection>,
}

impl FileDialogTask {
    pub fn spawn(dialog: Arc<dyn FileDialog>) -> std::io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded(1);

        std::thread::Builder::new()
            .name("file-dialog".into())
            .spawn(move || {
                let path = dialog.pick_file().filter(|p| !p.as_os_str().is_empty());
                // Fails only if the app stopped listening.
                if sender.send(FileSelection { path }).is_err() {
                    log::debug!("file dialog answered after its requester went away");
                }
            })?;

        Ok(Self { receiver })
    }

    /// Non-blocking check for the answer.
    pub fn poll(&self) -> TaskPoll {
        match self.receiver.try_recv() {
            Ok(selection) => TaskPoll::Ready(selection),
            Err(TryRecvError::Empty) => TaskPoll::Pending,
            Err(TryRecvError::Disconnected) => TaskPoll::Lost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Answers with `path` after `delay`.
    struct SlowDialog {
        delay: Duration,
        path: Option<PathBuf>,
    }

    impl FileDialog for SlowDialog {
        fn pick_file(&self) -> Option<PathBuf> {
            std::thread::sleep(self.delay);
            self.path.clone()
        }
    }

    struct PanickingDialog;

    impl FileDialog for PanickingDialog {
        fn pick_file(&self) -> Option<PathBuf> {
            panic!("dialog backend crashed");
        }
    }

    fn wait(task: &FileDialogTask) -> TaskPoll {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match task.poll() {
                TaskPoll::Pending if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(1))
                }
                other => return other,
            }
        }
    }

    // ── delivery ──────────────────────────────────────────────────────────

    #[test]
    fn answer_is_never_torn() {
        let path = PathBuf::from("/tmp/some/texture.png");
        let task = FileDialogTask::spawn(Arc::new(SlowDialog {
            delay: Duration::from_millis(20),
            path: Some(path.clone()),
        }))
        .unwrap();

        // Every observation is either nothing yet or the full message.
        let deadline = Instant::now() + Duration::from_secs(5);
        let selection = loop {
            match task.poll() {
                TaskPoll::Pending => {
                    assert!(Instant::now() < deadline, "dialog never answered");
                    std::thread::yield_now();
                }
                TaskPoll::Ready(sel) => break sel,
                TaskPoll::Lost => panic!("worker lost"),
            }
        };
        assert_eq!(selection.path, Some(path));
    }

    #[test]
    fn cancel_arrives_as_none() {
        let task = FileDialogTask::spawn(Arc::new(SlowDialog {
            delay: Duration::ZERO,
            path: None,
        }))
        .unwrap();
        assert_eq!(wait(&task), TaskPoll::Ready(FileSelection { path: None }));
    }

    #[test]
    fn empty_path_counts_as_cancel() {
        let task = FileDialogTask::spawn(Arc::new(SlowDialog {
            delay: Duration::ZERO,
            path: Some(PathBuf::new()),
        }))
        .unwrap();
        assert_eq!(wait(&task), TaskPoll::Ready(FileSelection { path: None }));
    }

    #[test]
    fn crashed_worker_is_reported_lost() {
        let task = FileDialogTask::spawn(Arc::new(PanickingDialog)).unwrap();
        assert_eq!(wait(&task), TaskPoll::Lost);
    }

    #[test]
    fn worker_runs_on_named_thread() {
        struct NameProbe(Mutex<Option<String>>);
        impl FileDialog for NameProbe {
            fn pick_file(&self) -> Option<PathBuf> {
                *self.0.lock().unwrap() = std::thread::current().name().map(str::to_string);
                None
            }
        }

        let probe = Arc::new(NameProbe(Mutex::new(None)));
        let task = FileDialogTask::spawn(probe.clone()).unwrap();
        wait(&task);
        assert_eq!(probe.0.lock().unwrap().as_deref(), Some("file-dialog"));
    }

    // ── native dialog config ──────────────────────────────────────────────

    #[test]
    fn image_filter_lists_decodable_formats() {
        let d = NativeFileDialog::new().with_title("Open texture").with_image_filter();
        let (name, exts) = d.filter.unwrap();
        assert_eq!(name, "Images");
        assert!(exts.iter().any(|e| e == "png"));
        assert_eq!(d.title.as_deref(), Some("Open texture"));
    }
}
