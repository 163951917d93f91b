pub mod run;
pub mod wait;
