/// Input state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a key is held
///   - Edge-triggered jump (fires on the initial press)
///   - Jump cut on release
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't
/// support it; there jumps always run their full height.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use sloperunner::InputIntent;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub const LEFT_KEYS: [KeyCode; 3] = [KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const RIGHT_KEYS: [KeyCode; 3] = [KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const JUMP_KEYS: [KeyCode; 4] = [
    KeyCode::Char(' '),
    KeyCode::Up,
    KeyCode::Char('w'),
    KeyCode::Char('W'),
];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Keys that went from "held" to "not held" during the most recent
    /// drain_events() call, by Release event or timeout.
    fresh_releases: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            fresh_releases: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.fresh_releases.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }

        self.expire(Instant::now());
    }

    /// Fold one key event into the held set.
    fn apply(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                if self.last_active.remove(&key.code).is_some() {
                    self.fresh_releases.push(key.code);
                }
            }
            // Release without confirmed enhancement: timeout decides.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Expire keys that have timed out (fallback for terminals without Release).
    /// Jump keys only report a timeout release when Release events are
    /// honored; otherwise auto-repeat starts after the timeout.
    fn expire(&mut self, now: Instant) {
        let honor_release = self.honor_release;
        let releases = &mut self.fresh_releases;
        self.last_active.retain(|code, t| {
            let held = now.duration_since(*t) < HOLD_TIMEOUT;
            if !held && (honor_release || !JUMP_KEYS.contains(code)) {
                releases.push(*code);
            }
            held
        });
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.is_held_at(code, Instant::now())
    }

    /// Convenience: is any of these keys held?
    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Was this key released this frame?
    pub fn was_released(&self, code: KeyCode) -> bool {
        self.fresh_releases.contains(&code)
    }

    pub fn any_released(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_released(*c))
    }

    /// Movement and jump edges for this frame.
    pub fn intent(&self) -> InputIntent {
        InputIntent {
            move_left: self.any_held(&LEFT_KEYS),
            move_right: self.any_held(&RIGHT_KEYS),
            jump_pressed: self.any_pressed(&JUMP_KEYS),
            jump_released: self.any_released(&JUMP_KEYS),
        }
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map(|t| now.duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}
