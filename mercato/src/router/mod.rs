pub mod aggregate;
pub mod health;
pub mod verify;

pub mod util;
