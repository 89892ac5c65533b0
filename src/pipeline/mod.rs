//! Pipeline entry points.
//!
//! - `BinService`: query → collection schedule, address listing, council list
//! - `render_calendar`: schedule → iCalendar feed

pub mod calendar;
mod lookup;

pub use calendar::render_calendar;
pub use lookup::BinService;
