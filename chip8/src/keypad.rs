pub const KEY_COUNT: usize = 0x10;

/// A logical hex key, or `None` for host input that isn't mapped to the keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key(Option<u8>);

impl Key {
    /// Map a keyboard label onto the keypad using the conventional layout:
    ///
    /// ```text
    /// 1 2 3 4      1 2 3 C
    /// q w e r  ->  4 5 6 D
    /// a s d f      7 8 9 E
    /// z x c v      A 0 B F
    /// ```
    pub fn from_label(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "1" => Self(Some(0x1)),
            "2" => Self(Some(0x2)),
            "3" => Self(Some(0x3)),
            "4" => Self(Some(0xC)),
            "q" => Self(Some(0x4)),
            "w" => Self(Some(0x5)),
            "e" => Self(Some(0x6)),
            "r" => Self(Some(0xD)),
            "a" => Self(Some(0x7)),
            "s" => Self(Some(0x8)),
            "d" => Self(Some(0x9)),
            "f" => Self(Some(0xE)),
            "z" => Self(Some(0xA)),
            "x" => Self(Some(0x0)),
            "c" => Self(Some(0xB)),
            "v" => Self(Some(0xF)),
            _ => Self(None),
        }
    }

    pub fn from_index(index: u8) -> Self {
        if (index as usize) < KEY_COUNT {
            Self(Some(index))
        } else {
            Self(None)
        }
    }

    pub fn index(self) -> Option<u8> {
        self.0
    }
}

pub struct Keypad {
    pub(crate) keys: [bool; KEY_COUNT],
    /// Key seen pressed during a wait-for-key instruction, reported once it is released
    pub(crate) awaiting_release: Option<u8>,
}

impl Keypad {
    pub fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
            awaiting_release: None,
        }
    }

    pub fn keydown(&mut self, key: Key) {
        if let Some(key) = key.0 {
            self.keys[key as usize] = true;
        }
    }

    pub fn keyup(&mut self, key: Key) {
        if let Some(key) = key.0 {
            self.keys[key as usize] = false;
        }
    }

    pub fn await_release(&mut self, key: u8) {
        self.awaiting_release = Some(key);
    }

    pub fn process_release(&mut self) {
        self.awaiting_release = None;
    }

    /// Keys outside 0..=F don't exist on the pad and are never down
    pub fn is_key_down(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    pub fn is_key_up(&self, key: u8) -> bool {
        !self.is_key_down(key)
    }

    pub fn first_down(&self) -> Option<u8> {
        self.keys.iter().position(|&down| down).map(|k| k as u8)
    }
}
