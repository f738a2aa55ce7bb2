//! Domain models for shift-board
//!
//! Contains the lifecycle, layout and query logic without any I/O concerns.

mod id;
mod shift;
mod actor;
mod holiday;
pub mod lifecycle;
pub mod layout;
pub mod query;

pub use id::{IdError, ResourceId, ShiftId};
pub use shift::{
    hhmm, parse_stored_time, parse_time, validate_intervals, IntervalError, NewShift, ParseError,
    ShiftDelta, ShiftKind, ShiftRecord, ShiftStatus, TimeRange,
};
pub use actor::{Actor, ActorRole};
pub use holiday::HolidayCalendar;
pub use lifecycle::{Action, TransitionError};
pub use layout::{DayLayout, LayoutError, LayoutWindow, Placement, SlotPlacement};
pub use query::{Period, QueryError, QueryOptions, ShiftFilter};
