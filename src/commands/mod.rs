pub mod remind;
pub mod run;
pub mod status;
pub mod sync;
