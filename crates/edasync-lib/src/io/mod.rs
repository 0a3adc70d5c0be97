pub mod csv;
pub mod video;
