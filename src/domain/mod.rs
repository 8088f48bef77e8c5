pub mod event;
pub mod numeric;
pub mod odds;
pub mod result;
pub mod sport;

pub use event::{Event, EventStatus, UpstreamEventRecord};
pub use odds::{OddsRecord, OddsTriple, VariationVector};
pub use result::{EventResult, WinnerSide};
pub use sport::{profile_for, SportKind, SportProfile, CANCELLATION_CODES, TERMINAL_RESULT_CODES};
