pub mod collab;
pub mod handler;
pub mod registry;
pub mod rtc;
pub mod session;
