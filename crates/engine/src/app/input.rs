#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBack,
    MoveLeft,
    MoveRight,
}

const ACTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveForward => 0,
            InputAction::MoveBack => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
        }
    }
}

/// A single keypad button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadKey {
    Digit(u8),
    Clear,
    Ok,
}

/// Held movement actions plus edge-triggered presses for one tick.
///
/// Edge flags are true only on the tick the press happened; held actions
/// stay down until released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    jump_pressed: bool,
    interact_pressed: bool,
    keypad_key: Option<KeypadKey>,
    close_panel_pressed: bool,
    save_pressed: bool,
    load_pressed: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn keypad_key(&self) -> Option<KeypadKey> {
        self.keypad_key
    }

    pub fn close_panel_pressed(&self) -> bool {
        self.close_panel_pressed
    }

    pub fn save_pressed(&self) -> bool {
        self.save_pressed
    }

    pub fn load_pressed(&self) -> bool {
        self.load_pressed
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_jump_pressed(mut self, jump_pressed: bool) -> Self {
        self.jump_pressed = jump_pressed;
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    pub fn with_keypad_key(mut self, keypad_key: Option<KeypadKey>) -> Self {
        self.keypad_key = keypad_key;
        self
    }

    pub fn with_close_panel_pressed(mut self, close_panel_pressed: bool) -> Self {
        self.close_panel_pressed = close_panel_pressed;
        self
    }

    pub fn with_save_pressed(mut self, save_pressed: bool) -> Self {
        self.save_pressed = save_pressed;
        self
    }

    pub fn with_load_pressed(mut self, load_pressed: bool) -> Self {
        self.load_pressed = load_pressed;
        self
    }

    /// Keeps held actions, drops every edge-triggered press.
    pub(crate) fn held_only(&self) -> Self {
        Self {
            actions: self.actions,
            ..Self::default()
        }
    }
}
