pub mod descriptor;
pub mod info;

pub use descriptor::*;
pub use info::*;
