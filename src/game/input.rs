//! Raw input accumulation and per-tick intent

use std::collections::HashSet;

use super::physics::{FieldBounds, Point};

/// Raw input event as delivered by the client
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    KeyDown(String),
    KeyUp(String),
    /// Pointer position in rendering-surface pixels plus the surface size
    PointerMove {
        x: f32,
        y: f32,
        surface_width: f32,
        surface_height: f32,
    },
    PointerClick,
}

/// Everything the engine needs from input for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickIntent {
    /// Additive axis movement in {-1, 0, 1} per axis; diagonals stay unnormalized
    pub movement: Point,
    pub aim: Point,
    pub fire: bool,
    pub ability: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Up,
    Down,
    Left,
    Right,
    Ability,
}

fn action_for(key: &str) -> Option<Action> {
    match key {
        "w" | "arrowup" => Some(Action::Up),
        "s" | "arrowdown" => Some(Action::Down),
        "a" | "arrowleft" => Some(Action::Left),
        "d" | "arrowright" => Some(Action::Right),
        " " | "space" | "spacebar" => Some(Action::Ability),
        _ => None,
    }
}

/// Accumulates events between ticks; the engine only ever sees [`TickIntent`]
#[derive(Debug)]
pub struct InputController {
    bounds: FieldBounds,
    /// Held bound keys, lowercased. Unbound keys are never stored. Aliases are
    /// tracked separately so releasing one does not cancel the other.
    held: HashSet<String>,
    aim: Point,
    fire_pending: bool,
    ability_pending: bool,
}

impl InputController {
    pub fn new(bounds: FieldBounds) -> Self {
        Self {
            bounds,
            held: HashSet::new(),
            aim: bounds.center(),
            fire_pending: false,
            ability_pending: false,
        }
    }

    pub fn apply(&mut self, event: RawInput) {
        match event {
            RawInput::KeyDown(key) => {
                let key = key.to_lowercase();
                let Some(action) = action_for(&key) else {
                    return;
                };
                let newly_held = self.held.insert(key);
                if newly_held && action == Action::Ability {
                    self.ability_pending = true;
                }
            }
            RawInput::KeyUp(key) => {
                self.held.remove(&key.to_lowercase());
            }
            RawInput::PointerMove {
                x,
                y,
                surface_width,
                surface_height,
            } => {
                self.aim = self.surface_to_field(x, y, surface_width, surface_height);
            }
            RawInput::PointerClick => {
                self.fire_pending = true;
            }
        }
    }

    /// Map surface pixels to field units by per-axis scale
    fn surface_to_field(&self, x: f32, y: f32, surface_width: f32, surface_height: f32) -> Point {
        let scale_x = if surface_width > 0.0 {
            self.bounds.width / surface_width
        } else {
            1.0
        };
        let scale_y = if surface_height > 0.0 {
            self.bounds.height / surface_height
        } else {
            1.0
        };
        Point::new(x * scale_x, y * scale_y)
    }

    fn is_held(&self, action: Action) -> bool {
        self.held
            .iter()
            .any(|key| action_for(key) == Some(action))
    }

    /// Snapshot the intent for this tick and clear the edge triggers
    pub fn take_intent(&mut self) -> TickIntent {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
        let movement = Point::new(
            axis(self.is_held(Action::Left), self.is_held(Action::Right)),
            axis(self.is_held(Action::Up), self.is_held(Action::Down)),
        );

        let intent = TickIntent {
            movement,
            aim: self.aim,
            fire: self.fire_pending,
            ability: self.ability_pending,
        };
        self.fire_pending = false;
        self.ability_pending = false;
        intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> InputController {
        InputController::new(FieldBounds::ARENA)
    }

    #[test]
    fn diagonal_movement_is_additive() {
        let mut input = controller();
        input.apply(RawInput::KeyDown("W".into()));
        input.apply(RawInput::KeyDown("ArrowRight".into()));
        let intent = input.take_intent();
        assert_eq!(intent.movement, Point::new(1.0, -1.0));
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut input = controller();
        input.apply(RawInput::KeyDown("a".into()));
        input.apply(RawInput::KeyDown("d".into()));
        assert_eq!(input.take_intent().movement, Point::new(0.0, 0.0));
    }

    #[test]
    fn alias_release_keeps_other_alias_held() {
        let mut input = controller();
        input.apply(RawInput::KeyDown("s".into()));
        input.apply(RawInput::KeyDown("ArrowDown".into()));
        input.apply(RawInput::KeyUp("s".into()));
        assert_eq!(input.take_intent().movement, Point::new(0.0, 1.0));
        input.apply(RawInput::KeyUp("ArrowDown".into()));
        assert_eq!(input.take_intent().movement, Point::new(0.0, 0.0));
    }

    #[test]
    fn unbound_keys_are_not_tracked() {
        let mut input = controller();
        for i in 0..10_000 {
            input.apply(RawInput::KeyDown(format!("junk-{i}")));
        }
        assert!(input.held.is_empty());

        input.apply(RawInput::KeyDown("d".into()));
        input.apply(RawInput::KeyDown("Enter".into()));
        assert_eq!(input.held.len(), 1);
        assert_eq!(input.take_intent().movement, Point::new(1.0, 0.0));
    }

    #[test]
    fn fire_is_edge_triggered() {
        let mut input = controller();
        input.apply(RawInput::PointerClick);
        assert!(input.take_intent().fire);
        assert!(!input.take_intent().fire);
    }

    #[test]
    fn ability_ignores_key_repeat() {
        let mut input = controller();
        input.apply(RawInput::KeyDown(" ".into()));
        input.apply(RawInput::KeyDown(" ".into()));
        assert!(input.take_intent().ability);

        input.apply(RawInput::KeyDown(" ".into()));
        assert!(!input.take_intent().ability);

        input.apply(RawInput::KeyUp(" ".into()));
        input.apply(RawInput::KeyDown("Space".into()));
        assert!(input.take_intent().ability);
    }

    #[test]
    fn pointer_is_scaled_into_field() {
        let mut input = controller();
        input.apply(RawInput::PointerMove {
            x: 300.0,
            y: 150.0,
            surface_width: 600.0,
            surface_height: 300.0,
        });
        assert_eq!(input.take_intent().aim, Point::new(600.0, 300.0));
    }

    #[test]
    fn aim_starts_at_center() {
        let mut input = controller();
        assert_eq!(input.take_intent().aim, Point::new(600.0, 300.0));
    }
}
