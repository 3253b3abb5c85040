//! Fleets and fleet-wide buffs.
//!
//! A player owns the roster of its live ships, the buffs that apply to its
//! whole fleet for the entire battle, and the presence bonuses granted while
//! at least one module of a given catalog name is alive.

use std::collections::BTreeMap;

use crate::buff::ModuleBuff;
use crate::entity::{ShipId, Side};

#[derive(Debug, Clone, Copy, PartialEq)]
struct PresenceBonus {
    buff: ModuleBuff,
    count: usize,
}

/// One side of a battle.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    side: Side,
    roster: Vec<ShipId>,
    buffs: Vec<ModuleBuff>,
    presence: BTreeMap<String, PresenceBonus>,
}

impl Player {
    /// A player without ships.
    #[must_use]
    pub fn new(side: Side, buffs: Vec<ModuleBuff>) -> Self {
        Self {
            side,
            roster: Vec::new(),
            buffs,
            presence: BTreeMap::new(),
        }
    }

    /// Side this player fights on.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Live ships, flagship first while it lives.
    #[must_use]
    pub fn roster(&self) -> &[ShipId] {
        &self.roster
    }

    /// Permanent fleet buffs.
    #[must_use]
    pub fn buffs(&self) -> &[ModuleBuff] {
        &self.buffs
    }

    /// Whether the fleet has no ships left.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.roster.is_empty()
    }

    /// Number of live modules carrying the `module` presence bonus.
    #[must_use]
    pub fn presence_count(&self, module: &str) -> usize {
        self.presence.get(module).map_or(0, |bonus| bonus.count)
    }

    pub(crate) fn enlist(&mut self, ship: ShipId) {
        self.roster.push(ship);
    }

    /// Drop ships for which `is_destroyed` holds; returns how many left.
    pub(crate) fn purge(&mut self, mut is_destroyed: impl FnMut(ShipId) -> bool) -> usize {
        let before = self.roster.len();
        self.roster.retain(|&id| !is_destroyed(id));
        before - self.roster.len()
    }

    /// Count one more live source of a presence bonus. Returns the buff when
    /// it was not active before.
    pub(crate) fn gain_presence(&mut self, module: &str, buff: ModuleBuff) -> Option<ModuleBuff> {
        let bonus = self
            .presence
            .entry(module.to_string())
            .or_insert(PresenceBonus { buff, count: 0 });
        bonus.count += 1;
        (bonus.count == 1).then_some(bonus.buff)
    }

    /// Count one source fewer. Returns the buff when the last source is gone.
    pub(crate) fn lose_presence(&mut self, module: &str) -> Option<ModuleBuff> {
        let bonus = self.presence.get_mut(module)?;
        if bonus.count == 0 {
            return None;
        }
        bonus.count -= 1;
        (bonus.count == 0).then_some(bonus.buff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buff::{ModuleTag, StatKind};

    fn armor_buff() -> ModuleBuff {
        ModuleBuff::new(StatKind::Armor, ModuleTag::Any, 0.2)
    }

    #[test]
    fn test_presence_transitions() {
        let mut player = Player::new(Side::Zero, Vec::new());
        assert_eq!(player.gain_presence("Command", armor_buff()), Some(armor_buff()));
        assert_eq!(player.gain_presence("Command", armor_buff()), None);
        assert_eq!(player.presence_count("Command"), 2);
        assert_eq!(player.lose_presence("Command"), None);
        assert_eq!(player.lose_presence("Command"), Some(armor_buff()));
        assert_eq!(player.lose_presence("Command"), None);
        assert_eq!(player.presence_count("Command"), 0);
    }

    #[test]
    fn test_presence_reactivates() {
        let mut player = Player::new(Side::One, Vec::new());
        player.gain_presence("Command", armor_buff());
        player.lose_presence("Command");
        assert_eq!(player.gain_presence("Command", armor_buff()), Some(armor_buff()));
    }

    #[test]
    fn test_unknown_presence_is_ignored() {
        let mut player = Player::new(Side::Zero, Vec::new());
        assert_eq!(player.lose_presence("Nothing"), None);
    }

    #[test]
    fn test_purge_keeps_order() {
        let mut player = Player::new(Side::Zero, Vec::new());
        for i in 0..4 {
            player.enlist(ShipId(i));
        }
        assert_eq!(player.purge(|id| id.0 % 2 == 0), 2);
        assert_eq!(player.roster(), &[ShipId(1), ShipId(3)]);
        assert!(!player.is_defeated());
    }
}
