//! Device filtering and selection utilities.
//!
//! Finds the target room among discovered coordinators, with fallback to a
//! single partial match, and builds the listings shown when nothing matches.

use std::sync::Arc;

use sonos_discovery::ZonePlayer;
use thiserror::Error;

/// Errors that can occur during device selection.
#[derive(Error, Debug)]
pub enum SelectionError {
    /// Target room was not found among discovered coordinators
    #[error("Target room '{target_room}' not found. Available rooms:\n{available_rooms}")]
    RoomNotFound {
        target_room: String,
        available_rooms: String,
    },

    /// No coordinators were discovered on the network
    #[error("No Sonos devices found on the network. Please check:\n- Network connectivity\n- Devices are powered on\n- Devices are on the same network\n- Firewall settings allow multicast traffic")]
    NoDevicesFound,
}

/// Device selector for finding and filtering discovered zone players.
pub struct DeviceSelector;

impl DeviceSelector {
    /// Find the coordinator whose room name matches `target_room`, ignoring case.
    pub fn find_by_room(
        target_room: &str,
        players: &[Arc<ZonePlayer>],
    ) -> Result<Arc<ZonePlayer>, SelectionError> {
        if players.is_empty() {
            return Err(SelectionError::NoDevicesFound);
        }

        players
            .iter()
            .find(|player| player.room_name().eq_ignore_ascii_case(target_room))
            .cloned()
            .ok_or_else(|| SelectionError::RoomNotFound {
                target_room: target_room.to_string(),
                available_rooms: Self::format_device_list(players),
            })
    }

    /// Find a room by name, accepting a single partial match.
    ///
    /// When several rooms partially match, the error lists them as suggestions.
    pub fn find_with_fallback(
        target_room: &str,
        players: &[Arc<ZonePlayer>],
    ) -> Result<Arc<ZonePlayer>, SelectionError> {
        if let Ok(player) = Self::find_by_room(target_room, players) {
            return Ok(player);
        }
        if players.is_empty() {
            return Err(SelectionError::NoDevicesFound);
        }

        let target = target_room.to_lowercase();
        let partial_matches: Vec<&Arc<ZonePlayer>> = players
            .iter()
            .filter(|player| {
                let room = player.room_name().to_lowercase();
                room.contains(&target) || target.contains(&room)
            })
            .collect();

        if let [only] = partial_matches.as_slice() {
            tracing::info!(
                "Exact match not found for '{}', using partial match: '{}'",
                target_room,
                only.room_name()
            );
            return Ok(Arc::clone(only));
        }

        let mut available_rooms = Self::format_device_list(players);
        if !partial_matches.is_empty() {
            available_rooms.push_str("\n\nDid you mean one of these?\n");
            for player in partial_matches {
                available_rooms.push_str(&format!("  - {}\n", player.room_name()));
            }
        }

        Err(SelectionError::RoomNotFound {
            target_room: target_room.to_string(),
            available_rooms,
        })
    }

    /// The first coordinator in room-name order.
    pub fn first_available(players: &[Arc<ZonePlayer>]) -> Result<Arc<ZonePlayer>, SelectionError> {
        let first = players
            .iter()
            .min_by(|a, b| a.room_name().cmp(b.room_name()))
            .cloned()
            .ok_or(SelectionError::NoDevicesFound)?;

        tracing::info!("Using first available room: '{}'", first.room_name());
        Ok(first)
    }

    fn format_device_list(players: &[Arc<ZonePlayer>]) -> String {
        if players.is_empty() {
            return "  (none)".to_string();
        }

        let mut lines: Vec<String> = players
            .iter()
            .map(|player| {
                format!(
                    "  - {} at {} [{}]",
                    player.room_name(),
                    player.location().host_str().unwrap_or("?"),
                    player.model_name()
                )
            })
            .collect();
        lines.sort();
        lines.join("\n")
    }

    /// List all discovered coordinators in a user-friendly format.
    pub fn list_devices(players: &[Arc<ZonePlayer>]) -> String {
        if players.is_empty() {
            return "No Sonos devices found on the network.".to_string();
        }

        let mut output = format!("Found {} Sonos group coordinator(s):\n", players.len());
        output.push_str(&Self::format_device_list(players));
        output
    }
}
