pub mod goal;
pub mod run;
