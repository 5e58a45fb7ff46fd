//! Passive gold income and spending

use super::entities::PlayerEconomy;

/// Time between income ticks (ms)
pub const INCOME_INTERVAL_MS: u64 = 1000;
/// Gold granted per income tick
pub const INCOME_AMOUNT: u32 = 2;

pub struct EconomySystem;

impl EconomySystem {
    /// Grant income if an interval has elapsed. Returns true when the
    /// interval elapsed, whether or not gold was below the cap; missed
    /// income is not banked.
    pub fn accrue(economy: &mut PlayerEconomy, now: u64) -> bool {
        if now.saturating_sub(economy.last_income) < INCOME_INTERVAL_MS {
            return false;
        }
        if economy.gold < economy.max_gold {
            economy.gold = (economy.gold + INCOME_AMOUNT).min(economy.max_gold);
        }
        economy.last_income = now;
        true
    }

    /// Deduct `cost` if affordable
    pub fn try_spend(economy: &mut PlayerEconomy, cost: u32) -> bool {
        if economy.gold < cost {
            return false;
        }
        economy.gold -= cost;
        true
    }
}
