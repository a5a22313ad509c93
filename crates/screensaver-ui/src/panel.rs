//! Keyboard control surface.
//!
//! Read once per frame from the engine's [`InputFrame`]; edits the box color
//! and texture settings in place and reports the one-shot commands.

use screensaver_engine::glam::Vec3;
use screensaver_engine::input::{InputFrame, Key};
use screensaver_engine::paint::{Channel, Color};
use screensaver_engine::render::texture::TextureSettings;

/// One-shot requests raised by the panel this frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PanelCommands {
    pub open_texture: bool,
    pub delete_texture: bool,
    pub confirm: bool,
    pub cancel: bool,
    pub log_position: bool,
    pub toggle_pause: bool,
    pub quit: bool,
}

#[derive(Debug, Clone)]
pub struct ControlPanel {
    color: Color,
    channel: Channel,
    settings: TextureSettings,
}

impl ControlPanel {
    /// Change per arrow key activation.
    pub const COLOR_STEP: f32 = 0.05;

    pub fn new(color: Color) -> Self {
        Self {
            color: color.clamped(),
            channel: Channel::Red,
            settings: TextureSettings::default(),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn settings(&self) -> TextureSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: TextureSettings) {
        self.settings = settings;
    }

    /// Applies this frame's keys.
    ///
    /// `modal_open` decides what Escape means: cancel the modal, or quit.
    pub fn read(&mut self, input: &InputFrame, modal_open: bool) -> PanelCommands {
        for (n, channel) in (1..=4).zip(Channel::ALL) {
            if Key::digit(n).is_some_and(|k| input.pressed(k)) {
                self.channel = channel;
            }
        }

        let steps = input.activations(Key::ArrowUp) as f32 - input.activations(Key::ArrowDown) as f32;
        if steps != 0.0 {
            let value = self.color.get(self.channel) + steps * Self::COLOR_STEP;
            self.color.set(self.channel, value);
        }

        let s = &mut self.settings;
        if input.pressed(Key::W) {
            s.wrap_s = s.wrap_s.next();
        }
        if input.pressed(Key::E) {
            s.wrap_t = s.wrap_t.next();
        }
        if input.pressed(Key::N) {
            s.min_filter = s.min_filter.next();
        }
        if input.pressed(Key::M) {
            s.mag_filter = s.mag_filter.next();
        }
        if input.pressed(Key::F) {
            s.format = s.format.next();
        }

        let escape = input.pressed(Key::Escape);
        PanelCommands {
            open_texture: input.pressed(Key::O),
            delete_texture: input.pressed(Key::X) || input.pressed(Key::Delete),
            confirm: input.pressed(Key::Enter),
            cancel: escape && modal_open,
            log_position: input.pressed(Key::P),
            toggle_pause: input.pressed(Key::Space),
            quit: input.pressed(Key::Q) || (escape && !modal_open),
        }
    }

    /// Window title text: position, color, settings and the modal prompt.
    pub fn status_line(&self, title: &str, position: Vec3, paused: bool, prompt: Option<&str>) -> String {
        let c = self.color;
        let mut line = format!(
            "{title} | pos ({:+.2}, {:+.2}){} | rgba {:.2} {:.2} {:.2} {:.2} [{}] | {}",
            position.x,
            position.y,
            if paused { " paused" } else { "" },
            c.r,
            c.g,
            c.b,
            c.a,
            self.channel.label(),
            self.settings,
        );
        if let Some(prompt) = prompt {
            line.push_str(" | ");
            line.push_str(prompt);
        }
        line
    }
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screensaver_engine::render::texture::{MinFilter, PixelFormat, WrapMode};

    fn frame(pressed: &[Key], repeats: &[Key]) -> InputFrame {
        let mut f = InputFrame::default();
        f.keys_pressed.extend(pressed.iter().copied());
        f.key_repeats.extend(repeats.iter().copied());
        f
    }

    // ── color ─────────────────────────────────────────────────────────────

    #[test]
    fn digits_select_channels() {
        let mut p = ControlPanel::default();
        p.read(&frame(&[Key::Digit3], &[]), false);
        assert_eq!(p.channel(), Channel::Blue);
        p.read(&frame(&[Key::Digit4], &[]), false);
        assert_eq!(p.channel(), Channel::Alpha);
    }

    #[test]
    fn arrows_adjust_selected_channel_with_repeats() {
        let mut p = ControlPanel::new(Color::new(0.5, 0.5, 0.5, 1.0));
        p.read(&frame(&[Key::Digit2, Key::ArrowUp], &[Key::ArrowUp, Key::ArrowUp]), false);
        assert!((p.color().g - 0.65).abs() < 1e-5);
        assert_eq!(p.color().r, 0.5);

        p.read(&frame(&[Key::ArrowDown], &[]), false);
        assert!((p.color().g - 0.60).abs() < 1e-5);
    }

    #[test]
    fn channels_stay_in_unit_range() {
        let mut p = ControlPanel::new(Color::WHITE);
        p.read(&frame(&[Key::ArrowUp], &[Key::ArrowUp; 5]), false);
        assert_eq!(p.color().r, 1.0);
    }

    // ── settings ──────────────────────────────────────────────────────────

    #[test]
    fn letters_cycle_texture_settings() {
        let mut p = ControlPanel::default();
        p.read(&frame(&[Key::W, Key::E, Key::E, Key::N, Key::F], &[]), false);
        let s = p.settings();
        assert_eq!(s.wrap_s, WrapMode::MirroredRepeat);
        // a set: E counts once per frame
        assert_eq!(s.wrap_t, WrapMode::MirroredRepeat);
        assert_eq!(s.min_filter, MinFilter::Nearest);
        assert_eq!(s.format, PixelFormat::Rgb);
    }

    // ── commands ──────────────────────────────────────────────────────────

    #[test]
    fn escape_cancels_when_modal_open() {
        let mut p = ControlPanel::default();
        let cmds = p.read(&frame(&[Key::Escape], &[]), true);
        assert!(cmds.cancel);
        assert!(!cmds.quit);
    }

    #[test]
    fn escape_quits_when_idle() {
        let mut p = ControlPanel::default();
        let cmds = p.read(&frame(&[Key::Escape], &[]), false);
        assert!(cmds.quit);
        assert!(!cmds.cancel);
    }

    #[test]
    fn one_shot_keys_map_to_commands() {
        let mut p = ControlPanel::default();
        let cmds = p.read(&frame(&[Key::O, Key::Delete, Key::Enter, Key::P, Key::Space], &[]), false);
        assert_eq!(
            cmds,
            PanelCommands {
                open_texture: true,
                delete_texture: true,
                confirm: true,
                log_position: true,
                toggle_pause: true,
                ..Default::default()
            }
        );
        assert_eq!(p.read(&InputFrame::default(), false), PanelCommands::default());
    }

    // ── status ────────────────────────────────────────────────────────────

    #[test]
    fn status_line_shows_position_color_and_prompt() {
        let p = ControlPanel::new(Color::new(1.0, 0.5, 0.25, 1.0));
        let line = p.status_line("Screensaver GL", Vec3::new(0.1, -0.4, 0.0), false, Some("Delete texture?"));
        assert!(line.starts_with("Screensaver GL | pos (+0.10, -0.40)"), "{line}");
        assert!(line.contains("rgba 1.00 0.50 0.25 1.00"));
        assert!(line.ends_with("| Delete texture?"));
        assert!(!line.contains("paused"));
    }
}
