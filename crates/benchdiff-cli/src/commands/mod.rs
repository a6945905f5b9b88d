pub mod compare;
pub mod discover;
pub mod queue;
pub mod run;
pub mod version;
