pub mod describe;
pub mod tenant;
