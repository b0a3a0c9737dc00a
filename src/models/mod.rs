pub mod asha_worker;
pub mod chat;
pub mod patient;
pub mod user;

pub use asha_worker::*;
pub use chat::*;
pub use patient::*;
pub use user::*;
