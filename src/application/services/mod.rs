pub mod authorization;
pub mod confirmation;
pub mod emoji;
pub mod jwt;
pub mod messenger;
pub mod progress;
pub mod rate_governor;
pub mod status_board;
