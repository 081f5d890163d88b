use std::f32::consts::FRAC_PI_2;

/// Discrete movement intents, one flag per action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementIntents {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub sprint: bool,
    pub crouch: bool,
}

impl MovementIntents {
    pub fn has_direction(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Sprint,
    Crouch,
}

/// Accumulated view angles in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LookAngles {
    pub yaw: f32,
    pub pitch: f32,
}

/// Maps raw input events to intent state. It never touches physics.
#[derive(Debug, Clone, Default)]
pub struct InputSampler {
    intents: MovementIntents,
    look: LookAngles,
    pointer_captured: bool,
    fire_pending: bool,
    respawn_pending: bool,
}

impl InputSampler {
    pub fn intents(&self) -> MovementIntents {
        self.intents
    }

    pub fn look(&self) -> LookAngles {
        self.look
    }

    pub fn pointer_captured(&self) -> bool {
        self.pointer_captured
    }

    pub fn set_action(&mut self, action: Action, pressed: bool) {
        let flag = match action {
            Action::Forward => &mut self.intents.forward,
            Action::Backward => &mut self.intents.backward,
            Action::Left => &mut self.intents.left,
            Action::Right => &mut self.intents.right,
            Action::Jump => &mut self.intents.jump,
            Action::Sprint => &mut self.intents.sprint,
            Action::Crouch => &mut self.intents.crouch,
        };
        *flag = pressed;
    }

    /// Enter or leave exclusive pointer capture. Leaving drops any pending shot.
    pub fn set_pointer_captured(&mut self, captured: bool) {
        self.pointer_captured = captured;
        if !captured {
            self.fire_pending = false;
        }
    }

    /// Apply a raw pointer delta in pixels. Ignored unless the pointer is captured.
    pub fn apply_look_delta(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        if !self.pointer_captured || !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.look.yaw -= dx * sensitivity;
        self.look.pitch = (self.look.pitch - dy * sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// Reset the view, e.g. after a respawn.
    pub fn set_look(&mut self, look: LookAngles) {
        self.look = LookAngles {
            yaw: look.yaw,
            pitch: look.pitch.clamp(-FRAC_PI_2, FRAC_PI_2),
        };
    }

    /// Queue a shot. Only honoured while the pointer is captured.
    pub fn request_fire(&mut self) {
        if self.pointer_captured {
            self.fire_pending = true;
        }
    }

    pub fn take_fire(&mut self) -> bool {
        std::mem::take(&mut self.fire_pending)
    }

    pub fn request_respawn(&mut self) {
        self.respawn_pending = true;
    }

    pub fn take_respawn(&mut self) -> bool {
        std::mem::take(&mut self.respawn_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_is_ignored_without_capture() {
        let mut sampler = InputSampler::default();
        sampler.apply_look_delta(100.0, 50.0, 0.01);
        assert_eq!(sampler.look(), LookAngles::default());
    }

    #[test]
    fn pitch_is_clamped_to_vertical() {
        let mut sampler = InputSampler::default();
        sampler.set_pointer_captured(true);
        sampler.apply_look_delta(0.0, -10_000.0, 0.01);
        assert_eq!(sampler.look().pitch, FRAC_PI_2);
        sampler.apply_look_delta(0.0, 20_000.0, 0.01);
        assert_eq!(sampler.look().pitch, -FRAC_PI_2);
    }

    #[test]
    fn yaw_accumulates_without_clamp() {
        let mut sampler = InputSampler::default();
        sampler.set_pointer_captured(true);
        for _ in 0..10 {
            sampler.apply_look_delta(-100.0, 0.0, 0.01);
        }
        assert!((sampler.look().yaw - 10.0).abs() < 1e-4);
    }

    #[test]
    fn fire_requires_capture_and_is_consumed_once() {
        let mut sampler = InputSampler::default();
        sampler.request_fire();
        assert!(!sampler.take_fire());

        sampler.set_pointer_captured(true);
        sampler.request_fire();
        assert!(sampler.take_fire());
        assert!(!sampler.take_fire());
    }

    #[test]
    fn releasing_capture_drops_pending_shot() {
        let mut sampler = InputSampler::default();
        sampler.set_pointer_captured(true);
        sampler.request_fire();
        sampler.set_pointer_captured(false);
        assert!(!sampler.take_fire());
    }

    #[test]
    fn actions_toggle_their_own_flag() {
        let mut sampler = InputSampler::default();
        sampler.set_action(Action::Sprint, true);
        sampler.set_action(Action::Left, true);
        sampler.set_action(Action::Left, false);
        let intents = sampler.intents();
        assert!(intents.sprint);
        assert!(!intents.left);
        assert!(!intents.has_direction());
    }
}
