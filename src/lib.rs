pub mod geometry;
pub mod instance;
pub mod reconstruction;
pub mod track;
