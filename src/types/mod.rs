pub(crate) mod af;
pub(crate) mod bit_string;
pub(crate) mod record;
pub(crate) mod validity;

pub use af::AddressFamily;
pub use bit_string::{parse_addr, BitString};
pub use record::{RecordId, Route, RouteFilter, RouteUpdate, Stored, Vrp};
pub use validity::Validity;

pub mod errors;
pub mod stats;
pub mod test_types;
