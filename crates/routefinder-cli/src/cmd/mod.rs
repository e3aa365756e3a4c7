pub mod guide;
pub mod run;
pub mod season;
