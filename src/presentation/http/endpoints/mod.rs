pub mod blasts;
pub mod emojis;
pub mod health;
pub mod root;
