//! Booking price calculation.
//!
//! Room charge is tiered by duration, add-ons are charged per unit, and the
//! discount is subtracted last. Everything is recomputed from scratch on each
//! call; no state is carried between calls.

use std::collections::BTreeMap;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::interval::TimeInterval;
use crate::money::{money_from_f64, parse_count, parse_money, parse_quantity, round_money};

/// Bookings up to and including this many hours are charged by the hour.
pub const HOURLY_TIER_MAX_HOURS: i64 = 4;
/// Bookings up to and including this many hours are charged the half-day rate.
pub const HALF_DAY_TIER_MAX_HOURS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomRateCard {
    pub hourly_rate: Decimal,
    pub half_day_rate: Decimal,
    pub full_day_rate: Decimal,
    pub capacity: u32,
}

impl RoomRateCard {
    pub fn new(
        hourly_rate: Decimal,
        half_day_rate: Decimal,
        full_day_rate: Decimal,
        capacity: u32,
    ) -> Self {
        Self {
            hourly_rate,
            half_day_rate,
            full_day_rate,
            capacity,
        }
    }

    /// Build a rate card from the four raw data attributes of a room option.
    pub fn from_raw(
        hourly_rate: &str,
        half_day_rate: &str,
        full_day_rate: &str,
        capacity: &str,
    ) -> Self {
        Self::new(
            parse_money(hourly_rate),
            parse_money(half_day_rate),
            parse_money(full_day_rate),
            parse_count(capacity),
        )
    }

    /// Build a rate card from numeric JSON fields.
    pub fn from_f64(
        hourly_rate: f64,
        half_day_rate: f64,
        full_day_rate: f64,
        capacity: u32,
    ) -> Self {
        Self::new(
            money_from_f64(hourly_rate),
            money_from_f64(half_day_rate),
            money_from_f64(full_day_rate),
            capacity,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSelection {
    pub addon_id: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl AddonSelection {
    pub fn new(addon_id: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            addon_id: addon_id.into(),
            unit_price,
            quantity: quantity.max(1),
        }
    }

    /// Build from the raw price label and quantity input of an add-on element.
    pub fn from_raw(addon_id: impl Into<String>, price_text: &str, quantity_text: &str) -> Self {
        Self::new(addon_id, parse_money(price_text), parse_quantity(quantity_text))
    }

    /// Unit price times quantity. A product past the `Decimal` range counts as 0.
    pub fn charge(&self) -> Decimal {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity.max(1)))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Selected add-ons, keyed by id. Selecting an id twice replaces the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSelections {
    entries: BTreeMap<String, AddonSelection>,
}

impl AddonSelections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, selection: AddonSelection) {
        self.entries.insert(selection.addon_id.clone(), selection);
    }

    pub fn deselect(&mut self, addon_id: &str) -> Option<AddonSelection> {
        self.entries.remove(addon_id)
    }

    /// Update the quantity of an already selected add-on. Returns false if not selected.
    pub fn set_quantity(&mut self, addon_id: &str, quantity: u32) -> bool {
        match self.entries.get_mut(addon_id) {
            Some(entry) => {
                entry.quantity = quantity.max(1);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, addon_id: &str) -> bool {
        self.entries.contains_key(addon_id)
    }

    pub fn get(&self, addon_id: &str) -> Option<&AddonSelection> {
        self.entries.get(addon_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AddonSelection> {
        self.entries.values()
    }

    /// Sum of the selected charges, or 0 if the sum overflows.
    pub fn charge(&self) -> Decimal {
        self.iter()
            .map(AddonSelection::charge)
            .try_fold(Decimal::ZERO, |acc, charge| acc.checked_add(charge))
            .unwrap_or(Decimal::ZERO)
    }
}

impl FromIterator<AddonSelection> for AddonSelections {
    fn from_iter<I: IntoIterator<Item = AddonSelection>>(iter: I) -> Self {
        let mut selections = Self::new();
        for selection in iter {
            selections.select(selection);
        }
        selections
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricingRequest {
    pub room: Option<RoomRateCard>,
    pub interval: Option<TimeInterval>,
    pub addons: AddonSelections,
    pub discount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateTier {
    Hourly,
    HalfDay,
    FullDay,
}

impl RateTier {
    /// Pick the tier for a duration. Boundaries are inclusive on the cheaper side.
    /// Returns `None` for non-positive durations.
    pub fn for_duration(hours: Decimal) -> Option<Self> {
        if hours <= Decimal::ZERO {
            None
        } else if hours <= Decimal::from(HOURLY_TIER_MAX_HOURS) {
            Some(RateTier::Hourly)
        } else if hours <= Decimal::from(HALF_DAY_TIER_MAX_HOURS) {
            Some(RateTier::HalfDay)
        } else {
            Some(RateTier::FullDay)
        }
    }

    pub fn label(&self, hours: Decimal) -> String {
        match self {
            RateTier::Hourly => format!("Hourly Rate ({:.1} hours)", round_hours(hours)),
            RateTier::HalfDay => "Half-day Rate".to_string(),
            RateTier::FullDay => "Full-day Rate".to_string(),
        }
    }
}

fn round_hours(hours: Decimal) -> Decimal {
    hours.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Room charge for a duration in hours. Non-positive durations are free.
pub fn room_charge(card: &RoomRateCard, hours: Decimal) -> Decimal {
    match RateTier::for_duration(hours) {
        Some(RateTier::Hourly) => card.hourly_rate.checked_mul(hours).unwrap_or(Decimal::ZERO),
        Some(RateTier::HalfDay) => card.half_day_rate,
        Some(RateTier::FullDay) => card.full_day_rate,
        None => Decimal::ZERO,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub room_charge: Decimal,
    pub addons_charge: Decimal,
    pub discount: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub rate_tier: Option<RateTier>,
    pub rate_label: Option<String>,
    pub duration_hours: Decimal,
}

/// Compute the price of a booking request.
///
/// Components are rounded to cents before being combined, so the displayed
/// room charge, add-ons charge and total always add up. The total is not
/// clamped: a discount above the subtotal yields a negative total. A sum or
/// difference outside the `Decimal` range comes out as 0 instead of panicking.
pub fn calculate_total(request: &PricingRequest) -> PriceBreakdown {
    let hours = request
        .interval
        .map(|interval| interval.duration_hours())
        .unwrap_or(Decimal::ZERO);

    let (room_charge, rate_tier) = match request.room {
        Some(card) if request.interval.is_some() => {
            (round_money(room_charge(&card, hours)), RateTier::for_duration(hours))
        }
        _ => (Decimal::ZERO, None),
    };

    let addons_charge = round_money(request.addons.charge());
    let discount = round_money(request.discount.max(Decimal::ZERO));
    let subtotal = room_charge.checked_add(addons_charge).unwrap_or(Decimal::ZERO);

    PriceBreakdown {
        room_charge,
        addons_charge,
        discount,
        subtotal,
        total: subtotal.checked_sub(discount).unwrap_or(Decimal::ZERO),
        rate_tier,
        rate_label: rate_tier.map(|tier| tier.label(hours)),
        duration_hours: round_hours(hours),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityWarning {
    pub attendees: u32,
    pub capacity: u32,
}

impl std::fmt::Display for CapacityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Warning: Exceeds room capacity of {} people", self.capacity)
    }
}

/// Advisory only: never blocks pricing or submission.
pub fn capacity_warning(card: &RoomRateCard, attendees: u32) -> Option<CapacityWarning> {
    (attendees > card.capacity).then_some(CapacityWarning {
        attendees,
        capacity: card.capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::parse_datetime;
    use chrono::Duration;

    fn card() -> RoomRateCard {
        RoomRateCard::new(Decimal::from(50), Decimal::from(150), Decimal::from(250), 20)
    }

    fn interval_ms(ms: i64) -> TimeInterval {
        let start = parse_datetime("2025-06-01T08:00").unwrap();
        TimeInterval::new(start, start + Duration::milliseconds(ms)).unwrap()
    }

    fn interval_hours(hours: i64) -> TimeInterval {
        interval_ms(hours * 3_600_000)
    }

    fn request(interval: TimeInterval) -> PricingRequest {
        PricingRequest {
            room: Some(card()),
            interval: Some(interval),
            ..Default::default()
        }
    }

    #[test]
    fn test_tier_boundaries() {
        // exactly 4h stays hourly
        let four = calculate_total(&request(interval_hours(4)));
        assert_eq!(four.room_charge, Decimal::from(200));
        assert_eq!(four.rate_tier, Some(RateTier::Hourly));

        // 4.0001h
        let just_over_four = calculate_total(&request(interval_ms(4 * 3_600_000 + 360)));
        assert_eq!(just_over_four.room_charge, Decimal::from(150));
        assert_eq!(just_over_four.rate_tier, Some(RateTier::HalfDay));

        let six = calculate_total(&request(interval_hours(6)));
        assert_eq!(six.room_charge, Decimal::from(150));

        // 6.0001h
        let just_over_six = calculate_total(&request(interval_ms(6 * 3_600_000 + 360)));
        assert_eq!(just_over_six.room_charge, Decimal::from(250));
        assert_eq!(just_over_six.rate_tier, Some(RateTier::FullDay));
    }

    #[test]
    fn test_reference_prices() {
        assert_eq!(calculate_total(&request(interval_hours(5))).room_charge, Decimal::from(150));
        assert_eq!(calculate_total(&request(interval_hours(2))).room_charge, Decimal::from(100));
        assert_eq!(calculate_total(&request(interval_hours(8))).room_charge, Decimal::from(250));
    }

    #[test]
    fn test_fractional_hourly_charge() {
        // 1h20m at 50/h
        let breakdown = calculate_total(&request(interval_ms(80 * 60_000)));
        assert_eq!(breakdown.room_charge, Decimal::new(6667, 2));
        assert_eq!(breakdown.rate_label.as_deref(), Some("Hourly Rate (1.3 hours)"));
        assert_eq!(breakdown.duration_hours, Decimal::new(13, 1));
    }

    #[test]
    fn test_non_positive_duration_is_free() {
        assert_eq!(room_charge(&card(), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(room_charge(&card(), Decimal::from(-3)), Decimal::ZERO);
        assert_eq!(RateTier::for_duration(Decimal::from(-1)), None);
    }

    #[test]
    fn test_missing_room_or_interval() {
        let no_room = PricingRequest {
            interval: Some(interval_hours(3)),
            ..Default::default()
        };
        assert_eq!(calculate_total(&no_room).room_charge, Decimal::ZERO);

        let no_interval = PricingRequest {
            room: Some(card()),
            ..Default::default()
        };
        let breakdown = calculate_total(&no_interval);
        assert_eq!(breakdown.room_charge, Decimal::ZERO);
        assert_eq!(breakdown.rate_tier, None);
        assert_eq!(breakdown.total, Decimal::ZERO);
    }

    #[test]
    fn test_discount_is_not_clamped() {
        let mut req = request(interval_hours(3));
        req.discount = Decimal::from(300);
        let breakdown = calculate_total(&req);
        assert_eq!(breakdown.room_charge, Decimal::from(150));
        assert_eq!(breakdown.addons_charge, Decimal::ZERO);
        assert_eq!(breakdown.total, Decimal::from(-150));
    }

    #[test]
    fn test_addons_and_total() {
        let mut req = request(interval_hours(2));
        req.addons.select(AddonSelection::from_raw("projector", "$25.00", "2"));
        req.addons.select(AddonSelection::from_raw("coffee", "4.5", "abc"));
        req.discount = Decimal::from(10);

        let breakdown = calculate_total(&req);
        assert_eq!(breakdown.addons_charge, Decimal::new(545, 1));
        assert_eq!(breakdown.subtotal, Decimal::new(1545, 1));
        assert_eq!(breakdown.total, Decimal::new(1445, 1));
    }

    #[test]
    fn test_selecting_twice_updates_quantity() {
        let mut addons = AddonSelections::new();
        addons.select(AddonSelection::new("projector", Decimal::from(25), 1));
        addons.select(AddonSelection::new("projector", Decimal::from(25), 3));
        assert_eq!(addons.len(), 1);
        assert_eq!(addons.charge(), Decimal::from(75));

        assert!(addons.set_quantity("projector", 0));
        assert_eq!(addons.get("projector").map(|a| a.quantity), Some(1));
        assert!(!addons.set_quantity("flipchart", 2));
    }

    #[test]
    fn test_toggle_restores_addon_charge() {
        let mut req = request(interval_hours(2));
        let selection = AddonSelection::new("catering", Decimal::new(1250, 2), 4);
        req.addons.select(selection.clone());
        let before = calculate_total(&req);

        req.addons.deselect("catering");
        assert_eq!(calculate_total(&req).addons_charge, Decimal::ZERO);

        req.addons.select(selection);
        assert_eq!(calculate_total(&req).addons_charge, before.addons_charge);
    }

    #[test]
    fn test_calculate_total_is_idempotent() {
        let mut req = request(interval_ms(150 * 60_000));
        req.addons.select(AddonSelection::new("wifi", Decimal::new(333, 2), 3));
        req.discount = Decimal::new(1, 1);
        assert_eq!(calculate_total(&req), calculate_total(&req));
    }

    #[test]
    fn test_rate_card_from_raw_coerces() {
        let card = RoomRateCard::from_raw("50", "n/a", "", "twelve");
        assert_eq!(card.hourly_rate, Decimal::from(50));
        assert_eq!(card.half_day_rate, Decimal::ZERO);
        assert_eq!(card.full_day_rate, Decimal::ZERO);
        assert_eq!(card.capacity, 0);
    }

    #[test]
    fn test_capacity_warning() {
        assert_eq!(capacity_warning(&card(), 20), None);
        let warning = capacity_warning(&card(), 21).unwrap();
        assert_eq!(warning.to_string(), "Warning: Exceeds room capacity of 20 people");
    }

    #[test]
    fn test_overflowing_addon_counts_as_zero() {
        let mut req = request(interval_hours(2));
        req.addons.select(AddonSelection::from_raw("x", "100000000000000000000", "4000000000"));
        req.addons.select(AddonSelection::new("wifi", Decimal::from(10), 1));
        let price = calculate_total(&req);
        assert_eq!(price.addons_charge, Decimal::ZERO);
        assert_eq!(price.room_charge, Decimal::from(100));
        assert_eq!(price.total, Decimal::from(100));
    }

    #[test]
    fn test_overflowing_room_and_subtotal_count_as_zero() {
        let mut req = request(interval_hours(2));
        req.room = Some(RoomRateCard::new(Decimal::MAX, Decimal::ZERO, Decimal::ZERO, 10));
        assert_eq!(calculate_total(&req).room_charge, Decimal::ZERO);

        req.room = Some(RoomRateCard::new(Decimal::ZERO, Decimal::MAX, Decimal::ZERO, 10));
        req.interval = Some(interval_hours(5));
        req.addons.select(AddonSelection::new("wifi", Decimal::MAX, 1));
        let price = calculate_total(&req);
        assert_eq!(price.room_charge, Decimal::MAX);
        assert_eq!(price.subtotal, Decimal::ZERO);
        assert_eq!(price.total, Decimal::ZERO);
    }
}
