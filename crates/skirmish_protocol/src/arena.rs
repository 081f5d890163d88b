use bevy_math::Vec3;

/// Half the side length of the square arena floor.
pub const ARENA_HALF_EXTENT: f32 = 50.0;
/// Players keep a one-unit margin from the walls.
pub const PLAYER_BOUND: f32 = ARENA_HALF_EXTENT - 1.0;
pub const ARENA_FLOOR: f32 = 0.0;
pub const ARENA_CEILING: f32 = 10.0;

/// Clamp a horizontal position into the walkable square. The vertical axis is untouched.
pub fn clamp_to_walkable(position: Vec3) -> Vec3 {
    Vec3::new(
        position.x.clamp(-PLAYER_BOUND, PLAYER_BOUND),
        position.y,
        position.z.clamp(-PLAYER_BOUND, PLAYER_BOUND),
    )
}

/// Whether a point lies inside the volume projectiles are allowed to travel in.
pub fn contains_projectile(position: Vec3) -> bool {
    position.x.abs() <= ARENA_HALF_EXTENT
        && position.z.abs() <= ARENA_HALF_EXTENT
        && (ARENA_FLOOR..=ARENA_CEILING).contains(&position.y)
}
