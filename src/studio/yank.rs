//! Yank chord: `y` then `y` within the timeout copies the whole transcript.

/// Outcome of pressing the chord key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YankPress {
    /// First press; a timeout carrying this token must be scheduled
    Armed(u64),
    /// Second press in time
    Chord,
}

#[derive(Debug, Clone, Default)]
pub struct YankChord {
    armed: bool,
    token: u64,
}

impl YankChord {
    pub fn press(&mut self) -> YankPress {
        if self.armed {
            self.armed = false;
            YankPress::Chord
        } else {
            self.armed = true;
            self.token = self.token.wrapping_add(1);
            YankPress::Armed(self.token)
        }
    }

    /// Handle an elapsed timeout. Returns true if it disarmed the chord;
    /// timeouts from earlier presses are ignored.
    pub fn expire(&mut self, token: u64) -> bool {
        if self.armed && token == self.token {
            self.armed = false;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_press_completes_chord() {
        let mut chord = YankChord::default();
        assert!(matches!(chord.press(), YankPress::Armed(_)));
        assert_eq!(chord.press(), YankPress::Chord);
        assert!(!chord.is_armed());
    }

    #[test]
    fn test_timeout_disarms() {
        let mut chord = YankChord::default();
        let YankPress::Armed(token) = chord.press() else {
            panic!("first press should arm");
        };
        assert!(chord.expire(token));
        assert!(!chord.is_armed());
        assert!(matches!(chord.press(), YankPress::Armed(_)));
    }

    #[test]
    fn test_stale_timeout_ignored() {
        let mut chord = YankChord::default();
        let YankPress::Armed(first) = chord.press() else {
            panic!("first press should arm");
        };
        chord.press();
        chord.press();
        assert!(!chord.expire(first));
        assert!(chord.is_armed());
    }
}
