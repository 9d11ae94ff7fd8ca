use ripple_engine::coords::Vec2;
use ripple_engine::input::{InputState, Key};

/// Instantaneous state of the four movement keys.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DirectionalKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DirectionalKeys {
    /// Samples W/A/S/D.
    pub fn poll(input: &InputState) -> Self {
        Self {
            up: input.key_down(Key::W),
            down: input.key_down(Key::S),
            left: input.key_down(Key::A),
            right: input.key_down(Key::D),
        }
    }

    /// Sum of the held keys' displacements. Opposite keys cancel; diagonals are
    /// not normalized.
    pub fn displacement(self, step: f32) -> Vec2 {
        let mut d = Vec2::zero();
        if self.up {
            d += Vec2::new(0.0, -step);
        }
        if self.left {
            d += Vec2::new(-step, 0.0);
        }
        if self.down {
            d += Vec2::new(0.0, step);
        }
        if self.right {
            d += Vec2::new(step, 0.0);
        }
        d
    }
}

/// Player sprite center in output pixels. Unbounded.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlayerPosition(Vec2);

impl PlayerPosition {
    pub fn new(at: Vec2) -> Self {
        Self(at)
    }

    pub fn get(self) -> Vec2 {
        self.0
    }

    /// One frame of movement.
    pub fn apply(&mut self, keys: DirectionalKeys, step: f32) {
        self.0 += keys.displacement(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_engine::input::{InputEvent, InputFrame, KeyState, Modifiers};

    fn held(keys: &[Key]) -> InputState {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        for &key in keys {
            state.apply_event(
                &mut frame,
                InputEvent::Key {
                    key,
                    state: KeyState::Pressed,
                    modifiers: Modifiers::default(),
                    repeat: false,
                },
            );
        }
        state
    }

    #[test]
    fn each_key_moves_along_its_axis() {
        let cases = [
            (Key::W, Vec2::new(0.0, -3.0)),
            (Key::S, Vec2::new(0.0, 3.0)),
            (Key::A, Vec2::new(-3.0, 0.0)),
            (Key::D, Vec2::new(3.0, 0.0)),
        ];
        for (key, expected) in cases {
            let keys = DirectionalKeys::poll(&held(&[key]));
            assert_eq!(keys.displacement(3.0), expected, "{key:?}");
        }
    }

    #[test]
    fn opposite_keys_cancel() {
        let keys = DirectionalKeys::poll(&held(&[Key::W, Key::S]));
        assert_eq!(keys.displacement(3.0), Vec2::zero());

        let keys = DirectionalKeys::poll(&held(&[Key::A, Key::D]));
        assert_eq!(keys.displacement(3.0), Vec2::zero());
    }

    #[test]
    fn diagonal_is_not_normalized() {
        let keys = DirectionalKeys::poll(&held(&[Key::W, Key::D]));
        assert_eq!(keys.displacement(3.0), Vec2::new(3.0, -3.0));
    }

    #[test]
    fn other_keys_do_not_move() {
        let keys = DirectionalKeys::poll(&held(&[Key::Space, Key::ArrowUp]));
        assert_eq!(keys, DirectionalKeys::default());
    }

    #[test]
    fn position_accumulates_without_bounds() {
        let mut pos = PlayerPosition::new(Vec2::new(0.0, 0.0));
        let left = DirectionalKeys {
            left: true,
            ..DirectionalKeys::default()
        };
        for _ in 0..5 {
            pos.apply(left, 3.0);
        }
        assert_eq!(pos.get(), Vec2::new(-15.0, 0.0));
    }
}
