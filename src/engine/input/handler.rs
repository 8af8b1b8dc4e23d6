use std::collections::HashSet;

use log::debug;
use winit::keyboard::KeyCode;

/// Tracks held keys and turns Escape into a close request.
#[derive(Debug, Default)]
pub struct InputHandler {
    pressed_keys: HashSet<KeyCode>,
    close_requested: bool,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key transition. Returns true only for a fresh press, so
    /// auto-repeat does not fire key-down callbacks twice.
    pub fn handle_keyboard_input_event(&mut self, keycode: KeyCode, pressed: bool) -> bool {
        if !pressed {
            self.pressed_keys.remove(&keycode);
            return false;
        }
        if !self.pressed_keys.insert(keycode) {
            return false;
        }
        debug!("Key pressed: {:?}", keycode);
        if keycode == KeyCode::Escape {
            self.close_requested = true;
        }
        true
    }

    pub fn is_pressed(&self, keycode: KeyCode) -> bool {
        self.pressed_keys.contains(&keycode)
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_is_not_a_fresh_press() {
        let mut input = InputHandler::new();
        assert!(input.handle_keyboard_input_event(KeyCode::KeyA, true));
        assert!(!input.handle_keyboard_input_event(KeyCode::KeyA, true));
        assert!(input.is_pressed(KeyCode::KeyA));

        assert!(!input.handle_keyboard_input_event(KeyCode::KeyA, false));
        assert!(!input.is_pressed(KeyCode::KeyA));
        assert!(input.handle_keyboard_input_event(KeyCode::KeyA, true));
    }

    #[test]
    fn test_escape_requests_close() {
        let mut input = InputHandler::new();
        input.handle_keyboard_input_event(KeyCode::Space, true);
        assert!(!input.close_requested());
        input.handle_keyboard_input_event(KeyCode::Escape, true);
        assert!(input.close_requested());
    }
}
