use bevy_math::{EulerRot, Quat, Vec3};

use crate::arena::clamp_to_walkable;
use crate::input::{LookAngles, MovementIntents};

pub const STAND_HEIGHT: f32 = 1.8;
pub const CROUCH_HEIGHT: f32 = 1.2;
pub const HEIGHT_LERP_RATE: f32 = 10.0;
pub const WALK_SPEED: f32 = 5.0;
pub const SPRINT_SPEED: f32 = 8.0;
/// Horizontal velocity kept per tick when no direction is held.
pub const FRICTION_PER_TICK: f32 = 0.8;
pub const JUMP_VELOCITY: f32 = 8.0;
pub const GRAVITY: f32 = 25.0;

/// Kinematic state of the local player. `position` is the camera position;
/// the body rests on the floor when `position.y == height / 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub grounded: bool,
    pub sprinting: bool,
    pub crouching: bool,
    pub height: f32,
}

impl PlayerState {
    pub fn spawn_at(position: Vec3) -> Self {
        Self {
            position: clamp_to_walkable(position),
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            grounded: false,
            sprinting: false,
            crouching: false,
            height: STAND_HEIGHT,
        }
    }

    /// Place the player somewhere new and drop all momentum.
    pub fn teleport(&mut self, position: Vec3) {
        self.position = clamp_to_walkable(position);
        self.velocity = Vec3::ZERO;
        self.grounded = false;
    }

    pub fn view_rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn view_direction(&self) -> Vec3 {
        self.view_rotation() * Vec3::NEG_Z
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.height.is_finite()
    }
}

fn input_direction(intents: &MovementIntents) -> Vec3 {
    let mut direction = Vec3::ZERO;
    if intents.forward {
        direction.z -= 1.0;
    }
    if intents.backward {
        direction.z += 1.0;
    }
    if intents.left {
        direction.x -= 1.0;
    }
    if intents.right {
        direction.x += 1.0;
    }
    direction.normalize_or_zero()
}

/// Advance the player by one tick of `dt` seconds. `dt` must already be sanitized.
pub fn integrate(state: &mut PlayerState, intents: &MovementIntents, look: LookAngles, dt: f32) {
    state.yaw = look.yaw;
    state.pitch = look.pitch;
    state.sprinting = intents.sprint;
    state.crouching = intents.crouch;

    let target_height = if intents.crouch {
        CROUCH_HEIGHT
    } else {
        STAND_HEIGHT
    };
    state.height += (target_height - state.height) * (dt * HEIGHT_LERP_RATE).min(1.0);

    if intents.has_direction() {
        let speed = if intents.sprint {
            SPRINT_SPEED
        } else {
            WALK_SPEED
        };
        let world = Quat::from_rotation_y(state.yaw) * input_direction(intents) * speed;
        state.velocity.x = world.x;
        state.velocity.z = world.z;
    } else {
        // Per tick, not per second.
        state.velocity.x *= FRICTION_PER_TICK;
        state.velocity.z *= FRICTION_PER_TICK;
    }

    if state.grounded && intents.jump {
        state.velocity.y = JUMP_VELOCITY;
        state.grounded = false;
    } else if !state.grounded {
        state.velocity.y -= GRAVITY * dt;
    }

    state.position += state.velocity * dt;

    let floor = state.height / 2.0;
    if state.grounded || state.position.y <= floor {
        state.position.y = floor;
        state.velocity.y = 0.0;
        state.grounded = true;
    }

    state.position = clamp_to_walkable(state.position);
}
