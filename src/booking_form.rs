//! Application state behind the booking form.
//!
//! `BookingForm` owns the field values the user edits and routes each change
//! to the price calculator and, for room/time changes, to the debounced
//! availability checker. Build one per form and hand it to whatever renders
//! it; nothing here is global.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::availability::{
    AvailabilityBackend, AvailabilityChecker, AvailabilityInput, AvailabilityStatus,
};
use crate::config::ClientConfig;
use crate::interval::{parse_datetime, TimeInterval};
use crate::money::{format_currency, parse_count, parse_money, parse_quantity};
use crate::pricing::{
    calculate_total, capacity_warning, AddonSelection, AddonSelections, CapacityWarning,
    PriceBreakdown, PricingRequest, RoomRateCard,
};
use crate::rules::{check_booking_times, RuleViolation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOption {
    pub room_id: String,
    pub name: String,
    pub rates: RoomRateCard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonOption {
    pub addon_id: String,
    pub name: String,
    pub category: Option<String>,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
struct AddonInput {
    option: AddonOption,
    selected: bool,
    quantity_text: String,
}

#[derive(Debug, Clone, Default)]
struct FormFields {
    room: Option<RoomOption>,
    start_time: String,
    end_time: String,
    addons: BTreeMap<String, AddonInput>,
    discount: String,
    attendees: String,
    booking_id: Option<String>,
}

impl FormFields {
    fn interval(&self) -> Option<TimeInterval> {
        TimeInterval::parse(&self.start_time, &self.end_time).ok()
    }

    fn pricing_request(&self) -> PricingRequest {
        let addons: AddonSelections = self
            .addons
            .values()
            .filter(|input| input.selected)
            .map(|input| {
                AddonSelection::new(
                    input.option.addon_id.clone(),
                    input.option.unit_price,
                    parse_quantity(&input.quantity_text),
                )
            })
            .collect();

        PricingRequest {
            room: self.room.as_ref().map(|room| room.rates),
            interval: self.interval(),
            addons,
            discount: parse_money(&self.discount),
        }
    }

    fn availability_input(&self) -> AvailabilityInput {
        AvailabilityInput {
            room_id: self.room.as_ref().map(|room| room.room_id.clone()),
            start_time: Some(self.start_time.clone()),
            end_time: Some(self.end_time.clone()),
            booking_id: self.booking_id.clone(),
        }
    }
}

/// Totals formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceDisplay {
    pub room_charge: String,
    pub addons_charge: String,
    pub total: String,
}

fn recompute(fields: &Mutex<FormFields>, price: &watch::Sender<PriceBreakdown>) -> PriceBreakdown {
    let breakdown = calculate_total(&fields.lock().pricing_request());
    debug!(total = %breakdown.total, tier = ?breakdown.rate_tier, "Recalculated booking total");
    price.send_replace(breakdown.clone());
    breakdown
}

/// Field setters that trigger an availability check must run inside a tokio runtime.
pub struct BookingForm<B: AvailabilityBackend> {
    config: ClientConfig,
    fields: Arc<Mutex<FormFields>>,
    price: Arc<watch::Sender<PriceBreakdown>>,
    checker: AvailabilityChecker<B>,
}

impl<B: AvailabilityBackend> BookingForm<B> {
    pub fn new(config: ClientConfig, backend: B) -> Self {
        let fields = Arc::new(Mutex::new(FormFields::default()));
        let (price, _) = watch::channel(PriceBreakdown::default());
        let price = Arc::new(price);

        let hook_fields = fields.clone();
        let hook_price = price.clone();
        let checker = AvailabilityChecker::new(backend, Duration::from_millis(config.debounce_ms))
            .on_settled(move |_| {
                recompute(&hook_fields, &hook_price);
            });

        Self {
            config,
            fields,
            price,
            checker,
        }
    }

    /// Editing an existing booking: its own slot is excluded from availability checks.
    pub fn with_booking_id(self, booking_id: impl Into<String>) -> Self {
        self.fields.lock().booking_id = Some(booking_id.into());
        self
    }

    pub fn with_addons<I>(self, options: I) -> Self
    where
        I: IntoIterator<Item = AddonOption>,
    {
        {
            let mut fields = self.fields.lock();
            for option in options {
                fields.addons.insert(
                    option.addon_id.clone(),
                    AddonInput {
                        option,
                        selected: false,
                        quantity_text: "1".to_string(),
                    },
                );
            }
        }
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn checker(&self) -> &AvailabilityChecker<B> {
        &self.checker
    }

    /// Compute the initial total and, if room, start and end are already
    /// filled in, run one availability check through the debounce path.
    pub fn initialize(&self) -> PriceBreakdown {
        let breakdown = self.recalculate();
        self.check_availability();
        breakdown
    }

    pub fn select_room(&self, room: Option<RoomOption>) -> PriceBreakdown {
        self.fields.lock().room = room;
        self.on_schedule_change()
    }

    pub fn set_start_time(&self, raw: &str) -> PriceBreakdown {
        self.fields.lock().start_time = raw.to_string();
        self.on_schedule_change()
    }

    pub fn set_end_time(&self, raw: &str) -> PriceBreakdown {
        self.fields.lock().end_time = raw.to_string();
        self.on_schedule_change()
    }

    /// Check or uncheck an add-on. Unknown ids are ignored.
    pub fn toggle_addon(&self, addon_id: &str, selected: bool) -> PriceBreakdown {
        if let Some(input) = self.fields.lock().addons.get_mut(addon_id) {
            input.selected = selected;
        }
        self.recalculate()
    }

    /// Quantity text is kept even while the add-on is unchecked.
    pub fn set_addon_quantity(&self, addon_id: &str, raw: &str) -> PriceBreakdown {
        if let Some(input) = self.fields.lock().addons.get_mut(addon_id) {
            input.quantity_text = raw.to_string();
        }
        self.recalculate()
    }

    pub fn set_discount(&self, raw: &str) -> PriceBreakdown {
        self.fields.lock().discount = raw.to_string();
        self.recalculate()
    }

    pub fn set_attendees(&self, raw: &str) -> PriceBreakdown {
        self.fields.lock().attendees = raw.to_string();
        self.recalculate()
    }

    pub fn price(&self) -> PriceBreakdown {
        self.price.borrow().clone()
    }

    pub fn price_display(&self) -> PriceDisplay {
        let price = self.price();
        let symbol = &self.config.currency_symbol;
        PriceDisplay {
            room_charge: format_currency(price.room_charge, symbol),
            addons_charge: format_currency(price.addons_charge, symbol),
            total: format_currency(price.total, symbol),
        }
    }

    pub fn subscribe_price(&self) -> watch::Receiver<PriceBreakdown> {
        self.price.subscribe()
    }

    pub fn availability(&self) -> AvailabilityStatus {
        self.checker.status()
    }

    pub fn subscribe_availability(&self) -> watch::Receiver<AvailabilityStatus> {
        self.checker.subscribe()
    }

    pub fn capacity_warning(&self) -> Option<CapacityWarning> {
        let fields = self.fields.lock();
        let room = fields.room.as_ref()?;
        capacity_warning(&room.rates, parse_count(&fields.attendees))
    }

    /// Advisory time rules, empty while either time is unset or unparsable.
    pub fn rule_violations(&self, now: NaiveDateTime) -> Vec<RuleViolation> {
        let fields = self.fields.lock();
        match (parse_datetime(&fields.start_time), parse_datetime(&fields.end_time)) {
            (Ok(start), Ok(end)) => check_booking_times(start, end, now),
            _ => Vec::new(),
        }
    }

    fn recalculate(&self) -> PriceBreakdown {
        recompute(&self.fields, &self.price)
    }

    fn check_availability(&self) -> Option<u64> {
        let input = self.fields.lock().availability_input();
        self.checker.trigger(&input)
    }

    fn on_schedule_change(&self) -> PriceBreakdown {
        let breakdown = self.recalculate();
        self.check_availability();
        breakdown
    }
}
