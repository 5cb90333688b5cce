pub mod book;
pub mod stop;

pub use book::{AppendSummary, BookError, RouteBook};
pub use stop::{StopField, StopRecord, DEFAULT_DELIVERY_TYPE};
