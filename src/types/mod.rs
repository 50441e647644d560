pub mod device;
pub mod gps;
pub mod klv;
pub mod track;

pub use device::*;
pub use gps::*;
pub use klv::*;
pub use track::*;
