// Pricing and availability logic behind the conference room booking form

pub mod availability;
pub mod booking_form;
pub mod config;
pub mod debounce;
pub mod interval;
pub mod mock_backend;
pub mod money;
pub mod pricing;
pub mod rules;

// Re-export key types for convenience
pub use availability::{
    AvailabilityBackend, AvailabilityChecker, AvailabilityError, AvailabilityInput,
    AvailabilityQuery, AvailabilityStatus, HttpAvailabilityBackend,
};
pub use booking_form::{AddonOption, BookingForm, PriceDisplay, RoomOption};
pub use config::{ClientConfig, ClientError};
pub use debounce::Debouncer;
pub use interval::{IntervalError, TimeInterval};
pub use pricing::{
    calculate_total, AddonSelection, AddonSelections, CapacityWarning, PriceBreakdown,
    PricingRequest, RateTier, RoomRateCard,
};
pub use rules::RuleViolation;
