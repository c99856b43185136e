//! Player kinematics and spawning

use std::f32::consts::{PI, TAU};

use rand::Rng;

use crate::util::vector::Vector2;

use super::player::{Moving, Player};
use super::{PLAYER_SPEED, WORLD_HEIGHT, WORLD_WIDTH};

/// Physics system for advancing players and choosing spawn state
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advances one player by `dt` seconds using its committed bitmask.
    ///
    /// Forward and backward cancel when both are set, as do left and right.
    pub fn integrate(player: &mut Player, dt: f32) {
        let mut control_velocity = Vector2::ZERO;
        let heading = Vector2::from_angle(player.direction).scale(PLAYER_SPEED);

        if player.moving.contains(Moving::MovingForward) {
            control_velocity += heading;
        }
        if player.moving.contains(Moving::MovingBackward) {
            control_velocity -= heading;
        }

        let mut angular_velocity = 0.0;
        if player.moving.contains(Moving::TurningLeft) {
            angular_velocity -= PI;
        }
        if player.moving.contains(Moving::TurningRight) {
            angular_velocity += PI;
        }

        player.direction += angular_velocity * dt;
        player.position += control_velocity * dt;
    }

    /// Random position inside the world bounds, random heading and hue
    pub fn generate_spawn<R: Rng>(rng: &mut R) -> (Vector2, f32, u8) {
        let position = Vector2::new(
            rng.gen_range(0.0..WORLD_WIDTH),
            rng.gen_range(0.0..WORLD_HEIGHT),
        );
        let direction = rng.gen_range(0.0..TAU);
        let hue = rng.gen::<u8>();
        (position, direction, hue)
    }
}
