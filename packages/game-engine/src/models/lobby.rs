use serde::{Deserialize, Serialize};

use crate::models::game_session::GameType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyMember {
    pub player_id: String,
    pub name: String,
}

/// The lobby record a game is created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lobby {
    pub lobby_id: String,
    pub game_type: GameType,
    pub members: Vec<LobbyMember>,
    #[serde(default)]
    pub game_started: bool,
}

impl Lobby {
    pub fn new(lobby_id: &str, game_type: GameType, members: &[(&str, &str)]) -> Self {
        Lobby {
            lobby_id: lobby_id.to_string(),
            game_type,
            members: members
                .iter()
                .map(|(player_id, name)| LobbyMember {
                    player_id: player_id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            game_started: false,
        }
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.members.iter().any(|member| member.player_id == player_id)
    }
}
