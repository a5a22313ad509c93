//! Confirmation modals for changing or deleting the box texture.
//!
//! One [`ModalState`] value tracks the whole interaction, so two modals can
//! never be open at once. The selected path travels inside the state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use screensaver_engine::render::texture::TextureSettings;

use crate::dialog::{FileDialog, FileDialogTask, TaskPoll};

/// Whatever owns the texture the modals act on.
pub trait TextureTarget {
    /// Loads `path` and makes it the current texture. Returns whether the
    /// texture was applied.
    fn apply_texture(&mut self, path: &Path, settings: TextureSettings) -> bool;

    fn delete_texture(&mut self);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ModalKind {
    ChangeTexture,
    DeleteTexture,
}

/// "Use this file as the texture?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTexture {
    pub path: PathBuf,
    pub settings: TextureSettings,
}

/// An open confirmation modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    ChangeTexture(ChangeTexture),
    DeleteTexture,
}

impl Modal {
    pub fn kind(&self) -> ModalKind {
        match self {
            Modal::ChangeTexture(_) => ModalKind::ChangeTexture,
            Modal::DeleteTexture => ModalKind::DeleteTexture,
        }
    }

    /// One-line question shown to the user.
    pub fn prompt(&self) -> String {
        match self {
            Modal::ChangeTexture(c) => {
                let name = c
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| c.path.display().to_string());
                format!("Use {name} as texture ({})? [Enter] apply [Esc] cancel", c.settings)
            }
            Modal::DeleteTexture => "Delete texture? [Enter] delete [Esc] cancel".to_string(),
        }
    }

    fn confirm(self, target: &mut dyn TextureTarget) -> ModalOutcome {
        match self {
            Modal::ChangeTexture(c) => {
                if target.apply_texture(&c.path, c.settings) {
                    ModalOutcome::TextureApplied(c.path)
                } else {
                    ModalOutcome::TextureRejected(c.path)
                }
            }
            Modal::DeleteTexture => {
                target.delete_texture();
                ModalOutcome::TextureDeleted
            }
        }
    }

    fn cancel(self) -> ModalOutcome {
        ModalOutcome::Cancelled(self.kind())
    }
}

/// Where the interaction currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Idle,
    /// The file dialog is open on its worker thread.
    AwaitingFileSelection,
    Open(Modal),
}

/// What a transition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalOutcome {
    TextureApplied(PathBuf),
    /// The target could not load the file.
    TextureRejected(PathBuf),
    TextureDeleted,
    Cancelled(ModalKind),
    /// Nothing was open to act on.
    Ignored,
}

impl fmt::Display for ModalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModalOutcome::TextureApplied(p) => write!(f, "texture changed to {}", p.display()),
            ModalOutcome::TextureRejected(p) => write!(f, "texture {} could not be applied", p.display()),
            ModalOutcome::TextureDeleted => f.write_str("texture deleted"),
            ModalOutcome::Cancelled(ModalKind::ChangeTexture) => f.write_str("texture change cancelled"),
            ModalOutcome::Cancelled(ModalKind::DeleteTexture) => f.write_str("texture deletion cancelled"),
            ModalOutcome::Ignored => f.write_str("no modal open"),
        }
    }
}

/// Drives [`ModalState`] from user requests and dialog answers.
pub struct ModalController {
    dialog: Arc<dyn FileDialog>,
    state: ModalState,
    task: Option<FileDialogTask>,

    /// Settings the next change modal starts with.
    default_settings: TextureSettings,
}

impl ModalController {
    pub fn new(dialog: Arc<dyn FileDialog>) -> Self {
        Self {
            dialog,
            state: ModalState::Idle,
            task: None,
            default_settings: TextureSettings::default(),
        }
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    /// The modal in progress, counting an open file dialog as a change.
    pub fn active(&self) -> Option<ModalKind> {
        match &self.state {
            ModalState::Idle => None,
            ModalState::AwaitingFileSelection => Some(ModalKind::ChangeTexture),
            ModalState::Open(m) => Some(m.kind()),
        }
    }

    /// Prompt for the open modal, if any.
    pub fn prompt(&self) -> Option<String> {
        match &self.state {
            ModalState::Idle => None,
            ModalState::AwaitingFileSelection => Some("Choosing a texture...".to_string()),
            ModalState::Open(m) => Some(m.prompt()),
        }
    }

    /// Opens the file dialog. Ignored while another modal is active.
    pub fn request_change(&mut self, settings: TextureSettings) -> bool {
        if let Some(kind) = self.active() {
            log::debug!("texture change requested while {kind:?} is active; ignored");
            return false;
        }

        match FileDialogTask::spawn(Arc::clone(&self.dialog)) {
            Ok(task) => {
                self.task = Some(task);
                self.default_settings = settings;
                self.state = ModalState::AwaitingFileSelection;
                true
            }
            Err(e) => {
                log::error!("failed to start file dialog: {e}");
                false
            }
        }
    }

    /// Opens the delete confirmation. Ignored while another modal is active.
    pub fn request_delete(&mut self) -> bool {
        if let Some(kind) = self.active() {
            log::debug!("texture deletion requested while {kind:?} is active; ignored");
            return false;
        }
        self.state = ModalState::Open(Modal::DeleteTexture);
        true
    }

    /// Picks up the dialog answer once it arrives.
    ///
    /// Returns an outcome only when the dialog was cancelled.
    pub fn poll(&mut self) -> Option<ModalOutcome> {
        let poll = self.task.as_ref()?.poll();
        let selection = match poll {
            TaskPoll::Pending => return None,
            TaskPoll::Ready(selection) => selection,
            TaskPoll::Lost => {
                log::warn!("file dialog worker ended without an answer");
                Default::default()
            }
        };
        self.task = None;

        match selection.path {
            Some(path) => {
                log::debug!("file selected: {}", path.display());
                self.state = ModalState::Open(Modal::ChangeTexture(ChangeTexture {
                    path,
                    settings: self.default_settings,
                }));
                None
            }
            None => {
                self.state = ModalState::Idle;
                Some(ModalOutcome::Cancelled(ModalKind::ChangeTexture))
            }
        }
    }

    /// Texture settings of the open change modal, for live editing.
    pub fn settings_mut(&mut self) -> Option<&mut TextureSettings> {
        match &mut self.state {
            ModalState::Open(Modal::ChangeTexture(c)) => Some(&mut c.settings),
            _ => None,
        }
    }

    /// Applies the open modal to `target` and returns to idle.
    pub fn confirm(&mut self, target: &mut dyn TextureTarget) -> ModalOutcome {
        match std::mem::take(&mut self.state) {
            ModalState::Open(modal) => modal.confirm(target),
            other => {
                self.state = other;
                ModalOutcome::Ignored
            }
        }
    }

    /// Discards the open modal. An open file dialog cannot be cancelled from
    /// here; its answer is still awaited.
    pub fn cancel(&mut self) -> ModalOutcome {
        match std::mem::take(&mut self.state) {
            ModalState::Open(modal) => modal.cancel(),
            other => {
                self.state = other;
                ModalOutcome::Ignored
            }
        }
    }
}
