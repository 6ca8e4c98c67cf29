pub mod events;
pub mod health;
pub mod user;

pub use events::*;
pub use health::*;
pub use user::*;
