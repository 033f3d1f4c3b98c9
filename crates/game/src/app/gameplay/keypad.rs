use engine::KeypadKey;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub(crate) const PASSCODE_LENGTH: usize = 4;
pub(crate) const UNLOCK_DELAY_SECONDS: f32 = 2.0;
pub(crate) const RESET_DELAY_SECONDS: f32 = 1.0;

/// Level-file binding of a keypad to the passcode door it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct KeypadConfig {
    pub(crate) passcode: String,
    pub(crate) door: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeypadFeedback {
    DigitAccepted { entry_len: usize },
    Cleared,
    Accepted,
    Rejected,
    Ignored,
    Reset,
}

/// Numeric entry panel. Accepting the code locks the panel until the scene
/// unlocks the door on a timer.
#[derive(Debug, Clone)]
pub(crate) struct Keypad {
    passcode: String,
    entry: String,
    locked: bool,
}

impl Keypad {
    pub(crate) fn new(passcode: &str) -> Self {
        if passcode.len() != PASSCODE_LENGTH || !passcode.bytes().all(|b| b.is_ascii_digit()) {
            warn!(length = passcode.len(), "keypad_passcode_unusual");
        }
        Self {
            passcode: passcode.to_string(),
            entry: String::new(),
            locked: false,
        }
    }

    pub(crate) fn entry(&self) -> &str {
        &self.entry
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn press(&mut self, key: KeypadKey) -> KeypadFeedback {
        if self.locked {
            return KeypadFeedback::Ignored;
        }
        match key {
            KeypadKey::Digit(digit) if digit <= 9 => {
                if self.entry.len() >= PASSCODE_LENGTH {
                    return KeypadFeedback::Ignored;
                }
                self.entry.push(char::from(b'0' + digit));
                KeypadFeedback::DigitAccepted {
                    entry_len: self.entry.len(),
                }
            }
            KeypadKey::Digit(_) => KeypadFeedback::Ignored,
            KeypadKey::Clear => {
                self.entry.clear();
                KeypadFeedback::Cleared
            }
            KeypadKey::Ok => {
                let accepted = self.entry == self.passcode;
                self.entry.clear();
                if accepted {
                    self.locked = true;
                    info!("keypad_accepted");
                    KeypadFeedback::Accepted
                } else {
                    info!("keypad_rejected");
                    KeypadFeedback::Rejected
                }
            }
        }
    }

    /// Display reset after a rejected code.
    pub(crate) fn reset(&mut self) -> KeypadFeedback {
        self.entry.clear();
        KeypadFeedback::Reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enter(keypad: &mut Keypad, digits: &str) {
        for digit in digits.bytes() {
            keypad.press(KeypadKey::Digit(digit - b'0'));
        }
    }

    #[test]
    fn correct_code_is_accepted_and_locks_input() {
        let mut keypad = Keypad::new("5705");
        enter(&mut keypad, "5705");
        assert_eq!(keypad.press(KeypadKey::Ok), KeypadFeedback::Accepted);
        assert!(keypad.is_locked());
        assert_eq!(keypad.entry(), "");
        assert_eq!(keypad.press(KeypadKey::Digit(1)), KeypadFeedback::Ignored);
    }

    #[test]
    fn entry_stops_at_four_digits() {
        let mut keypad = Keypad::new("5705");
        enter(&mut keypad, "1234");
        assert_eq!(keypad.press(KeypadKey::Digit(5)), KeypadFeedback::Ignored);
        assert_eq!(keypad.entry(), "1234");
        assert_eq!(keypad.press(KeypadKey::Ok), KeypadFeedback::Rejected);
        assert!(!keypad.is_locked());
    }

    #[test]
    fn clear_empties_entry() {
        let mut keypad = Keypad::new("5705");
        enter(&mut keypad, "57");
        assert_eq!(keypad.press(KeypadKey::Clear), KeypadFeedback::Cleared);
        enter(&mut keypad, "5705");
        assert_eq!(keypad.press(KeypadKey::Ok), KeypadFeedback::Accepted);
    }
}
