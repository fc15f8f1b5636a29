//! Concurrent registry of discovered coordinators, keyed by serial number.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use url::Url;

use crate::device::ZonePlayer;

/// Append-only map of serial number to device handle.
///
/// The first handle stored for a serial number wins; entries are never
/// removed for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    players: DashMap<String, Arc<ZonePlayer>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `player` unless its serial number is already present.
    ///
    /// Returns the handle now in the registry and whether it was already
    /// there (`true`) or inserted by this call (`false`).
    pub fn load_or_store(&self, player: Arc<ZonePlayer>) -> (Arc<ZonePlayer>, bool) {
        match self.players.entry(player.serial_number().to_string()) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), true),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&player));
                (player, false)
            }
        }
    }

    pub fn get(&self, serial_number: &str) -> Option<Arc<ZonePlayer>> {
        self.players.get(serial_number).map(|p| Arc::clone(p.value()))
    }

    pub fn contains(&self, serial_number: &str) -> bool {
        self.players.contains_key(serial_number)
    }

    pub fn contains_location(&self, location: &Url) -> bool {
        self.players.iter().any(|p| p.location() == location)
    }

    /// First registered player whose room name is `room`.
    pub fn find_room(&self, room: &str) -> Option<Arc<ZonePlayer>> {
        self.players
            .iter()
            .find(|p| p.room_name() == room)
            .map(|p| Arc::clone(p.value()))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Snapshot of every registered player.
    pub fn players(&self) -> Vec<Arc<ZonePlayer>> {
        self.players.iter().map(|p| Arc::clone(p.value())).collect()
    }
}
