use std::collections::HashSet;

use super::types::Key;

/// Per-frame key transitions.
///
/// `InputState` answers "is it held"; `InputFrame` answers "what happened
/// since the last frame". The runtime clears it after every `on_frame`.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Keys that went down this frame.
    pub keys_pressed: HashSet<Key>,

    /// Keys that came up this frame.
    pub keys_released: HashSet<Key>,

    /// Keys the OS auto-repeated this frame, one entry per repeat.
    pub key_repeats: Vec<Key>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.key_repeats.clear();
    }

    /// True when `key` went down this frame.
    pub fn pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Number of activations of `key` this frame: the initial press plus
    /// any auto-repeats.
    pub fn activations(&self, key: Key) -> usize {
        usize::from(self.pressed(key)) + self.key_repeats.iter().filter(|k| **k == key).count()
    }

    pub fn is_empty(&self) -> bool {
        self.keys_pressed.is_empty() && self.keys_released.is_empty() && self.key_repeats.is_empty()
    }
}
