use std::collections::HashSet;

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// A discrete runtime tuning action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    ToggleShadows,
    ToggleWireframe,
    IntensityUp,
    IntensityDown,
    GlossinessDown,
    GlossinessUp,
    LinearDown,
    LinearUp,
    QuadraticDown,
    QuadraticUp,
    ToggleAnimation,
}

/// Pixels treated as one scroll line for touchpad deltas.
const PIXELS_PER_LINE: f32 = 40.0;

pub fn control_for_key(code: KeyCode) -> Option<Control> {
    match code {
        KeyCode::F1 => Some(Control::ToggleShadows),
        KeyCode::F2 => Some(Control::ToggleWireframe),
        KeyCode::Equal | KeyCode::NumpadAdd => Some(Control::IntensityUp),
        KeyCode::Minus | KeyCode::NumpadSubtract => Some(Control::IntensityDown),
        KeyCode::BracketLeft => Some(Control::GlossinessDown),
        KeyCode::BracketRight => Some(Control::GlossinessUp),
        KeyCode::Comma => Some(Control::LinearDown),
        KeyCode::Period => Some(Control::LinearUp),
        KeyCode::Semicolon => Some(Control::QuadraticDown),
        KeyCode::Quote => Some(Control::QuadraticUp),
        KeyCode::Space => Some(Control::ToggleAnimation),
        _ => None,
    }
}

/// Keyboard and wheel state, updated from window events and cleared each
/// frame.
#[derive(Debug, Default)]
pub struct InputState {
    keys_held: HashSet<KeyCode>,
    keys_just_pressed: HashSet<KeyCode>,
    scroll_lines: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to clear transient state.
    pub fn begin_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.scroll_lines = 0.0;
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press(code),
                        ElementState::Released => self.release(code),
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => self.scroll(*delta),
            _ => {}
        }
    }

    fn scroll(&mut self, delta: MouseScrollDelta) {
        self.scroll_lines += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
        };
    }

    /// Vertical wheel movement this frame, in lines. Positive is away from
    /// the user.
    pub fn scroll_lines(&self) -> f32 {
        self.scroll_lines
    }

    fn press(&mut self, code: KeyCode) {
        // Key repeat does not count as a new press
        if self.keys_held.insert(code) {
            self.keys_just_pressed.insert(code);
        }
    }

    fn release(&mut self, code: KeyCode) {
        self.keys_held.remove(&code);
    }

    pub fn key_held(&self, code: KeyCode) -> bool {
        self.keys_held.contains(&code)
    }

    pub fn just_pressed_key(&self, code: KeyCode) -> bool {
        self.keys_just_pressed.contains(&code)
    }

    /// Controls triggered this frame.
    pub fn controls(&self) -> Vec<Control> {
        self.keys_just_pressed
            .iter()
            .filter_map(|code| control_for_key(*code))
            .collect()
    }

    /// Held arrow keys as (yaw, pitch) directions in -1..=1.
    pub fn orbit_axis(&self) -> (f32, f32) {
        let axis = |negative, positive| {
            (self.key_held(positive) as i32 - self.key_held(negative) as i32) as f32
        };
        (
            axis(KeyCode::ArrowLeft, KeyCode::ArrowRight),
            axis(KeyCode::ArrowDown, KeyCode::ArrowUp),
        )
    }
}
