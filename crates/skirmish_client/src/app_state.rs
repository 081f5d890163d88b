use bevy::prelude::*;

#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppState {
    /// Join sent, waiting for the authority to assign an id.
    #[default]
    Connecting,
    InGame,
    /// Session torn down; only the status notice remains.
    Ended,
}
