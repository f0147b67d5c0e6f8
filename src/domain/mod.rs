pub mod action;
pub mod feeder;
pub mod observation;

pub use action::*;
pub use feeder::*;
pub use observation::*;
