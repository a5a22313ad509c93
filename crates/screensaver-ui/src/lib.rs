//! Screensaver UI: the interaction layer on top of `screensaver-engine`.
//!
//! - [`dialog`]: file selection on a worker thread
//! - [`modal`]: the change/delete texture confirmation state machine
//! - [`panel`]: keyboard control surface for color and texture settings

pub mod dialog;
pub mod modal;
pub mod panel;

pub mod prelude {
    pub use crate::dialog::{FileDialog, FileDialogTask, FileSelection, NativeFileDialog, TaskPoll};
    pub use crate::modal::{Modal, ModalController, ModalKind, ModalOutcome, ModalState, TextureTarget};
    pub use crate::panel::{ControlPanel, PanelCommands};
}
