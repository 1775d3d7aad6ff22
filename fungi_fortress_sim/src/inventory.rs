// Colony inventory: counted resources and special items.
//
// Resources ("wood", "stone", "food", ...) and special items ("Sclerotium",
// "Map Fragment") live in separate maps because the display layer lists them
// separately, but costs may mix both. `resources_gained` tracks what was
// harvested since the last `reset_gained()` for mission bookkeeping.
//
// Spending is two-phase: `spend()` checks the whole cost first and only
// deducts once every line is covered, so a failed spend never leaves a
// partial deduction behind.
//
// See also: `config.rs` for the starting stock, `actions.rs` whose build and
// bridge handlers spend from here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A cost or bundle: `(item name, quantity)` pairs.
pub type ItemList = [(String, u32)];

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("unknown item '{0}'")]
    Unknown(String),
    #[error("not enough {name}: have {have}, need {need}")]
    Insufficient { name: String, have: u32, need: u32 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    resources: BTreeMap<String, u32>,
    special_items: BTreeMap<String, u32>,
    resources_gained: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn new(resources: BTreeMap<String, u32>, special_items: BTreeMap<String, u32>) -> Self {
        Self {
            resources,
            special_items,
            resources_gained: BTreeMap::new(),
        }
    }

    fn slot(&self, name: &str) -> Option<u32> {
        self.resources
            .get(name)
            .or_else(|| self.special_items.get(name))
            .copied()
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut u32> {
        if self.resources.contains_key(name) {
            self.resources.get_mut(name)
        } else {
            self.special_items.get_mut(name)
        }
    }

    /// Quantity held. Unknown names count as zero.
    pub fn count(&self, name: &str) -> u32 {
        self.slot(name).unwrap_or(0)
    }

    pub fn knows(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    /// Credit `amount` of `name`. Names not yet tracked start a new resource
    /// counter.
    pub fn add(&mut self, name: &str, amount: u32) {
        match self.slot_mut(name) {
            Some(count) => *count = count.saturating_add(amount),
            None => {
                self.resources.insert(name.to_string(), amount);
            }
        }
        let gained = self.resources_gained.entry(name.to_string()).or_insert(0);
        *gained = gained.saturating_add(amount);
    }

    pub fn remove(&mut self, name: &str, amount: u32) -> Result<(), InventoryError> {
        let count = self
            .slot_mut(name)
            .ok_or_else(|| InventoryError::Unknown(name.to_string()))?;
        if *count < amount {
            return Err(InventoryError::Insufficient {
                name: name.to_string(),
                have: *count,
                need: amount,
            });
        }
        *count -= amount;
        Ok(())
    }

    /// `false` if any line names an unknown item or exceeds the held amount.
    /// Repeated lines for the same item are summed.
    pub fn can_afford(&self, cost: &ItemList) -> bool {
        self.check(cost).is_ok()
    }

    /// Lines of `cost` that are not covered, with the shortfall.
    pub fn missing(&self, cost: &ItemList) -> Vec<(String, u32)> {
        Self::totals(cost)
            .into_iter()
            .filter_map(|(name, need)| {
                let have = self.count(name);
                (have < need || !self.knows(name)).then(|| (name.to_string(), need - have.min(need)))
            })
            .collect()
    }

    /// Deduct the whole cost, or nothing.
    pub fn spend(&mut self, cost: &ItemList) -> Result<(), InventoryError> {
        self.check(cost)?;
        for (name, amount) in cost {
            self.remove(name, *amount)?;
        }
        Ok(())
    }

    fn check(&self, cost: &ItemList) -> Result<(), InventoryError> {
        for (name, need) in Self::totals(cost) {
            let have = self
                .slot(name)
                .ok_or_else(|| InventoryError::Unknown(name.to_string()))?;
            if have < need {
                return Err(InventoryError::Insufficient {
                    name: name.to_string(),
                    have,
                    need,
                });
            }
        }
        Ok(())
    }

    fn totals(cost: &ItemList) -> BTreeMap<&str, u32> {
        let mut totals = BTreeMap::new();
        for (name, amount) in cost {
            *totals.entry(name.as_str()).or_insert(0) += *amount;
        }
        totals
    }

    pub fn gained(&self, name: &str) -> u32 {
        self.resources_gained.get(name).copied().unwrap_or(0)
    }

    pub fn reset_gained(&mut self) {
        self.resources_gained.clear();
    }

    pub fn resources(&self) -> &BTreeMap<String, u32> {
        &self.resources
    }

    pub fn special_items(&self) -> &BTreeMap<String, u32> {
        &self.special_items
    }
}
