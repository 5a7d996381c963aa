pub mod geo;
pub mod position;
pub mod run;
pub mod status;
