//! This is not a real library!  It should be used from within the dpdkinfo binary only.

pub mod conf;
pub mod driver;
pub mod msg;
pub mod transport;
