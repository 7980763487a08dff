pub mod matching;
pub mod requests;
pub mod transfersystem;
