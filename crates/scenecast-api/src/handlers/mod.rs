pub mod compose;
pub mod health;
