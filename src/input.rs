// Input module - Per-frame input snapshot
//
// The host (display window, test harness) latches button and stylus
// state whenever it likes; the engine takes one snapshot per frame so
// the draw callback and the picking subsystem see a consistent view.

/// Button bitmask in the hardware key layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons(u16);

impl Buttons {
    /// No buttons
    pub const NONE: Buttons = Buttons(0);
    /// A button
    pub const A: Buttons = Buttons(1 << 0);
    /// B button
    pub const B: Buttons = Buttons(1 << 1);
    /// Select button
    pub const SELECT: Buttons = Buttons(1 << 2);
    /// Start button
    pub const START: Buttons = Buttons(1 << 3);
    /// D-pad right
    pub const RIGHT: Buttons = Buttons(1 << 4);
    /// D-pad left
    pub const LEFT: Buttons = Buttons(1 << 5);
    /// D-pad up
    pub const UP: Buttons = Buttons(1 << 6);
    /// D-pad down
    pub const DOWN: Buttons = Buttons(1 << 7);
    /// Right shoulder button
    pub const R: Buttons = Buttons(1 << 8);
    /// Left shoulder button
    pub const L: Buttons = Buttons(1 << 9);
    /// X button
    pub const X: Buttons = Buttons(1 << 10);
    /// Y button
    pub const Y: Buttons = Buttons(1 << 11);
    /// Stylus down on the touch screen
    pub const TOUCH: Buttons = Buttons(1 << 12);

    /// Whether every button in `other` is set
    pub fn contains(self, other: Buttons) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Whether no button is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Buttons {
    type Output = Buttons;

    fn bitor(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for Buttons {
    type Output = Buttons;

    fn bitand(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 & rhs.0)
    }
}

impl std::ops::Not for Buttons {
    type Output = Buttons;

    fn not(self) -> Buttons {
        Buttons(!self.0)
    }
}

/// One frame's input state plus the latch the host writes into
#[derive(Debug, Default)]
pub struct InputSnapshot {
    // Snapshot taken at the top of the frame
    pressed: Buttons,
    held: Buttons,
    released: Buttons,
    touch: Option<(u8, u8)>,

    // Host-latched state
    latched: Buttons,
    latched_touch: Option<(u8, u8)>,
    previous: Buttons,
}

impl InputSnapshot {
    /// Create with everything released
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the current host button state and stylus position
    ///
    /// Called by the display layer (or a test) at any rate; only the
    /// state present when [`InputSnapshot::snapshot`] runs is observed.
    pub fn feed(&mut self, buttons: Buttons, touch: Option<(u8, u8)>) {
        self.latched = if touch.is_some() {
            buttons | Buttons::TOUCH
        } else {
            buttons
        };
        self.latched_touch = touch;
    }

    /// Take the once-per-frame snapshot
    pub fn snapshot(&mut self) {
        self.pressed = self.latched & !self.previous;
        self.released = self.previous & !self.latched;
        self.held = self.latched;
        // The stylus position is only valid while the touch bit is held
        self.touch = if self.held.contains(Buttons::TOUCH) {
            self.latched_touch
        } else {
            None
        };
        self.previous = self.latched;
    }

    /// Buttons that went down this frame
    pub fn pressed(&self) -> Buttons {
        self.pressed
    }

    /// Buttons currently held
    pub fn held(&self) -> Buttons {
        self.held
    }

    /// Buttons that went up this frame
    pub fn released(&self) -> Buttons {
        self.released
    }

    /// Stylus position, if touching
    pub fn touch(&self) -> Option<(u8, u8)> {
        self.touch
    }
}
