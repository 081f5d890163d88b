use bevy::prelude::*;
use thiserror::Error;

pub const DEFAULT_SENSITIVITY: f32 = 0.002;

/// Rendering strategy, chosen once when the client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fidelity {
    /// Full scene with projectile simulation and remote state.
    #[default]
    Full,
    /// Minimal lighting and geometry, local movement only.
    Reduced,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("player name must not be empty")]
    EmptyName,

    #[error("mouse sensitivity must be a positive number, got {0}")]
    InvalidSensitivity(f32),
}

#[derive(Resource, Debug, Clone)]
pub struct ClientConfig {
    pub player_name: String,
    /// Radians of view rotation per pixel of pointer motion.
    pub sensitivity: f32,
    pub fidelity: Fidelity,
}

impl ClientConfig {
    pub fn new(
        player_name: impl Into<String>,
        sensitivity: f32,
        fidelity: Fidelity,
    ) -> Result<Self, ConfigError> {
        let player_name = player_name.into().trim().to_string();
        if player_name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            return Err(ConfigError::InvalidSensitivity(sensitivity));
        }
        Ok(Self {
            player_name,
            sensitivity,
            fidelity,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_name: "Player".into(),
            sensitivity: DEFAULT_SENSITIVITY,
            fidelity: Fidelity::Full,
        }
    }
}
