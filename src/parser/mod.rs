pub mod block;
pub mod gps;
pub mod main;
pub mod stream;
pub mod track;
pub mod value;

pub use block::*;
pub use gps::*;
pub use main::*;
pub use stream::*;
pub use track::*;
pub use value::*;
