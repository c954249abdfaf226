use serde::Serialize;

use crate::keyboard::geometry::{Geometry, PhysicalKeyId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Pinky,
    Ring,
    Middle,
    Index,
    Thumb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FingerAssignment {
    pub hand: Hand,
    pub finger: Finger,
}

impl FingerAssignment {
    pub fn new(hand: Hand, finger: Finger) -> Self {
        Self { hand, finger }
    }

    /// Hint name such as `left-index`, used by front ends for the hands display.
    pub fn hint(self) -> String {
        let hand = match self.hand {
            Hand::Left => "left",
            Hand::Right => "right",
        };
        let finger = match self.finger {
            Finger::Pinky => "pinky",
            Finger::Ring => "ring",
            Finger::Middle => "middle",
            Finger::Index => "index",
            Finger::Thumb => "thumb",
        };
        format!("{hand}-{finger}")
    }
}

/// Standard touch-typing finger for a physical key.
///
/// On ISO-style boards (`iso`, `abnt`) the number row is reached one key further
/// left, so Digit2 is still the left pinky and Digit6 the left index.
pub fn finger_for(geometry: Geometry, key: PhysicalKeyId) -> FingerAssignment {
    use Finger::*;
    use Hand::*;

    let shifted_numbers = matches!(geometry, Geometry::Iso | Geometry::Abnt);
    let code = key.as_str();
    if let Some(digit) = code.strip_prefix("Digit") {
        let finger = match (digit, shifted_numbers) {
            ("1", _) | ("2", true) => (Left, Pinky),
            ("2", false) | ("3", true) => (Left, Ring),
            ("3", false) | ("4", true) => (Left, Middle),
            ("4", false) | ("5", _) | ("6", true) => (Left, Index),
            ("6", false) | ("7", _) | ("8", true) => (Right, Index),
            ("8", false) | ("9", true) => (Right, Middle),
            ("9", false) | ("0", true) => (Right, Ring),
            _ => (Right, Pinky),
        };
        return FingerAssignment::new(finger.0, finger.1);
    }

    match code {
        "Backquote" | "Tab" | "KeyQ" | "CapsLock" | "KeyA" | "ShiftLeft" | "IntlBackslash"
        | "KeyZ" | "ControlLeft" => FingerAssignment::new(Left, Pinky),
        "KeyW" | "KeyS" | "KeyX" => FingerAssignment::new(Left, Ring),
        "KeyE" | "KeyD" | "KeyC" => FingerAssignment::new(Left, Middle),
        "KeyR" | "KeyF" | "KeyV" | "KeyT" | "KeyG" | "KeyB" => FingerAssignment::new(Left, Index),
        "KeyY" | "KeyH" | "KeyN" | "KeyU" | "KeyJ" | "KeyM" => FingerAssignment::new(Right, Index),
        "KeyI" | "KeyK" | "Comma" => FingerAssignment::new(Right, Middle),
        "KeyO" | "KeyL" | "Period" => FingerAssignment::new(Right, Ring),
        "MetaLeft" | "AltLeft" => FingerAssignment::new(Left, Thumb),
        "Space" | "AltRight" | "MetaRight" => FingerAssignment::new(Right, Thumb),
        _ => FingerAssignment::new(Right, Pinky),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str) -> PhysicalKeyId {
        PhysicalKeyId::parse(code).unwrap()
    }

    #[test]
    fn test_home_row_fingers() {
        let g = Geometry::Ansi;
        assert_eq!(finger_for(g, key("KeyA")), FingerAssignment::new(Hand::Left, Finger::Pinky));
        assert_eq!(finger_for(g, key("KeyF")), FingerAssignment::new(Hand::Left, Finger::Index));
        assert_eq!(finger_for(g, key("KeyJ")), FingerAssignment::new(Hand::Right, Finger::Index));
        assert_eq!(
            finger_for(g, key("Semicolon")),
            FingerAssignment::new(Hand::Right, Finger::Pinky)
        );
    }

    #[test]
    fn test_number_row_shifts_on_iso() {
        assert_eq!(finger_for(Geometry::Ansi, key("Digit6")).hand, Hand::Right);
        assert_eq!(finger_for(Geometry::Iso, key("Digit6")).hand, Hand::Left);
        assert_eq!(finger_for(Geometry::Iso, key("Digit2")).finger, Finger::Pinky);
        assert_eq!(finger_for(Geometry::Ansi, key("Digit2")).finger, Finger::Ring);
        assert_eq!(finger_for(Geometry::Ansi, key("Digit0")).finger, Finger::Pinky);
        assert_eq!(finger_for(Geometry::Abnt, key("Digit0")).finger, Finger::Ring);
    }

    #[test]
    fn test_space_is_thumb() {
        let f = finger_for(Geometry::Jis, PhysicalKeyId::SPACE);
        assert_eq!(f.finger, Finger::Thumb);
        assert_eq!(f.hint(), "right-thumb");
    }
}
