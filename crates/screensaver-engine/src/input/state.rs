use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState};

/// Current keyboard state for the window.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,

    /// Currently held keys.
    pub keys_down: HashSet<Key>,
}

impl InputState {
    /// Applies an event to the held state and records transitions in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match ev {
            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // Releases are not delivered while unfocused.
                    self.keys_down.clear();
                }
            }

            InputEvent::Key { key, state: KeyState::Pressed, repeat } => {
                if self.keys_down.insert(key) {
                    frame.keys_pressed.insert(key);
                } else if repeat {
                    frame.key_repeats.push(key);
                }
            }

            InputEvent::Key { key, state: KeyState::Released, .. } => {
                if self.keys_down.remove(&key) {
                    frame.keys_released.insert(key);
                }
            }
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key, repeat: bool) -> InputEvent {
        InputEvent::Key { key, state: KeyState::Pressed, repeat }
    }

    fn release(key: Key) -> InputEvent {
        InputEvent::Key { key, state: KeyState::Released, repeat: false }
    }

    #[test]
    fn press_is_recorded_once() {
        let mut st = InputState::default();
        let mut fr = InputFrame::default();
        st.apply_event(&mut fr, press(Key::O, false));
        st.apply_event(&mut fr, press(Key::O, false));
        assert!(fr.pressed(Key::O));
        assert_eq!(fr.activations(Key::O), 1);
        assert!(st.key_down(Key::O));
    }

    #[test]
    fn repeats_count_as_activations() {
        let mut st = InputState::default();
        let mut fr = InputFrame::default();
        st.apply_event(&mut fr, press(Key::ArrowUp, false));
        st.apply_event(&mut fr, press(Key::ArrowUp, true));
        st.apply_event(&mut fr, press(Key::ArrowUp, true));
        assert_eq!(fr.activations(Key::ArrowUp), 3);

        fr.clear();
        st.apply_event(&mut fr, press(Key::ArrowUp, true));
        assert!(!fr.pressed(Key::ArrowUp));
        assert_eq!(fr.activations(Key::ArrowUp), 1);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut st = InputState::default();
        let mut fr = InputFrame::default();
        st.apply_event(&mut fr, release(Key::Q));
        assert!(fr.is_empty());
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut st = InputState::default();
        let mut fr = InputFrame::default();
        st.apply_event(&mut fr, InputEvent::Focused(true));
        st.apply_event(&mut fr, press(Key::Space, false));
        st.apply_event(&mut fr, InputEvent::Focused(false));
        assert!(!st.key_down(Key::Space));
        assert!(!st.focused);

        // After refocus the same key registers as a fresh press.
        fr.clear();
        st.apply_event(&mut fr, press(Key::Space, false));
        assert!(fr.pressed(Key::Space));
    }
}
