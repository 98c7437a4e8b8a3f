//! Value types for the checkout flow.
//!
//! Money is kept in minor units end to end. Tiers form a closed set, so ticket
//! counts are a dense array indexed by tier rather than a map.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::iter::Sum;

// ============================================================================
// Money
// ============================================================================

/// Money amount in cents
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars, saturating on overflow
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies by a quantity with overflow checking
    #[must_use]
    pub const fn checked_mul(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two money amounts, saturating at the maximum
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts, saturating at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies by a quantity, saturating at the maximum
    #[must_use]
    pub const fn saturating_mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

// ============================================================================
// Discount rate
// ============================================================================

/// A discount fraction in basis points (1/100 of a percent)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct DiscountRate(u16);

impl DiscountRate {
    /// No discount
    pub const ZERO: Self = Self(0);

    /// Everything off
    pub const FULL: Self = Self(10_000);

    /// Rate from basis points; `None` above 100%
    #[must_use]
    pub const fn from_basis_points(bps: u16) -> Option<Self> {
        if bps <= 10_000 { Some(Self(bps)) } else { None }
    }

    /// Rate from whole percent; `None` above 100%
    #[must_use]
    pub const fn from_percent(percent: u8) -> Option<Self> {
        Self::from_basis_points(percent as u16 * 100)
    }

    /// The discount this rate takes off `amount`, rounded down to the cent
    #[must_use]
    pub fn of(&self, amount: Money) -> Money {
        let cents = u128::from(amount.cents()) * u128::from(self.0) / 10_000;
        // Never exceeds `amount`, which fits in u64
        Money::from_cents(u64::try_from(cents).unwrap_or(u64::MAX))
    }

    /// `amount` with this rate taken off
    #[must_use]
    pub fn apply(&self, amount: Money) -> Money {
        amount.saturating_sub(self.of(amount))
    }
}

impl TryFrom<u16> for DiscountRate {
    type Error = String;

    fn try_from(bps: u16) -> Result<Self, Self::Error> {
        Self::from_basis_points(bps).ok_or_else(|| format!("discount rate {bps} bps exceeds 100%"))
    }
}

impl From<DiscountRate> for u16 {
    fn from(rate: DiscountRate) -> Self {
        rate.0
    }
}

impl fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
        }
    }
}

// ============================================================================
// Tiers
// ============================================================================

/// Ticket tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    /// Discounted general admission, sold first
    EarlyBird,
    /// General admission
    Regular,
    /// Single VIP seat
    VipSolo,
    /// VIP table for five
    VipTable5,
    /// VIP table for seven
    VipTable7,
    /// VIP table for ten
    VipTable10,
}

impl Tier {
    /// Number of tiers
    pub const COUNT: usize = 6;

    /// Every tier, in display order
    pub const ALL: [Self; Self::COUNT] = [
        Self::EarlyBird,
        Self::Regular,
        Self::VipSolo,
        Self::VipTable5,
        Self::VipTable7,
        Self::VipTable10,
    ];

    /// Position in [`Tier::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Key used in catalog documents
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::EarlyBird => "earlyBird",
            Self::Regular => "regular",
            Self::VipSolo => "vipSolo",
            Self::VipTable5 => "vipTable5",
            Self::VipTable7 => "vipTable7",
            Self::VipTable10 => "vipTable10",
        }
    }

    /// Human-readable name
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EarlyBird => "Early Bird",
            Self::Regular => "Regular",
            Self::VipSolo => "VIP Solo",
            Self::VipTable5 => "VIP Table (5)",
            Self::VipTable7 => "VIP Table (7)",
            Self::VipTable10 => "VIP Table (10)",
        }
    }

    /// Look up a tier by its catalog key
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.key() == key)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Ticket counts
// ============================================================================

/// Quantity selected per tier. Every tier always has a count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Tier, u32>", into = "BTreeMap<Tier, u32>")]
pub struct TicketCounts([u32; Tier::COUNT]);

impl TicketCounts {
    /// All counts zero
    #[must_use]
    pub const fn new() -> Self {
        Self([0; Tier::COUNT])
    }

    /// Returns these counts with `tier` set to `count`
    #[must_use]
    pub const fn with(mut self, tier: Tier, count: u32) -> Self {
        self.0[tier.index()] = count;
        self
    }

    /// Count for a tier
    #[must_use]
    pub const fn get(&self, tier: Tier) -> u32 {
        self.0[tier.index()]
    }

    /// Set the count for a tier
    pub const fn set(&mut self, tier: Tier, count: u32) {
        self.0[tier.index()] = count;
    }

    /// Add one ticket of `tier`
    pub const fn increment(&mut self, tier: Tier) {
        self.0[tier.index()] = self.0[tier.index()].saturating_add(1);
    }

    /// Remove one ticket of `tier`, stopping at zero
    pub const fn decrement(&mut self, tier: Tier) {
        self.0[tier.index()] = self.0[tier.index()].saturating_sub(1);
    }

    /// Tickets across all tiers
    #[must_use]
    pub fn total_tickets(&self) -> u64 {
        self.0.iter().map(|&count| u64::from(count)).sum()
    }

    /// Whether no tickets are selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&count| count == 0)
    }

    /// `(tier, count)` for every tier, in display order
    pub fn iter(&self) -> impl Iterator<Item = (Tier, u32)> + '_ {
        Tier::ALL.into_iter().map(|tier| (tier, self.get(tier)))
    }
}

impl From<BTreeMap<Tier, u32>> for TicketCounts {
    fn from(map: BTreeMap<Tier, u32>) -> Self {
        map.into_iter()
            .fold(Self::new(), |counts, (tier, count)| counts.with(tier, count))
    }
}

impl From<TicketCounts> for BTreeMap<Tier, u32> {
    fn from(counts: TicketCounts) -> Self {
        counts.iter().collect()
    }
}

// ============================================================================
// Price catalog
// ============================================================================

/// Current price per tier
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceCatalog {
    prices: HashMap<Tier, Money>,
}

impl PriceCatalog {
    /// Catalog with no prices
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns this catalog with `tier` priced at `price`
    #[must_use]
    pub fn with_price(mut self, tier: Tier, price: Money) -> Self {
        self.prices.insert(tier, price);
        self
    }

    /// Set the price of a tier
    pub fn insert(&mut self, tier: Tier, price: Money) {
        self.prices.insert(tier, price);
    }

    /// The listed price, if the tier is in the catalog
    #[must_use]
    pub fn get(&self, tier: Tier) -> Option<Money> {
        self.prices.get(&tier).copied()
    }

    /// Price of a tier; a tier missing from the catalog costs nothing
    #[must_use]
    pub fn price(&self, tier: Tier) -> Money {
        self.get(tier).unwrap_or(Money::ZERO)
    }

    /// Number of priced tiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether no tier is priced
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(Tier, Money)> for PriceCatalog {
    fn from_iter<I: IntoIterator<Item = (Tier, Money)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Steps
// ============================================================================

/// Stage of the checkout wizard
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Step {
    /// Choosing quantities per tier
    #[default]
    TicketSelection = 1,
    /// Entering contact details, under the reservation timer
    ContactEntry = 2,
    /// Handing off to the payment collaborator
    Payment = 3,
}

impl Step {
    /// 1-based position, as shown in the progress bar
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// The following step; `Payment` is terminal
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::TicketSelection => Self::ContactEntry,
            Self::ContactEntry | Self::Payment => Self::Payment,
        }
    }

    /// The preceding step; `None` from the first step
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::TicketSelection => None,
            Self::ContactEntry => Some(Self::TicketSelection),
            Self::Payment => Some(Self::ContactEntry),
        }
    }

    /// Title shown in the progress bar
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TicketSelection => "Select Tickets",
            Self::ContactEntry => "Contact Details",
            Self::Payment => "Payment",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.label())
    }
}
