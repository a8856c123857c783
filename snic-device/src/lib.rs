mod bar2;
mod bus_id;
mod device;

pub use bar2::{Bar2, Bar2Error};
pub use bus_id::{PciBusId, PciBusIdParseError};
pub use device::Device;
