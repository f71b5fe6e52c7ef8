pub mod get_run;
pub mod reload_emojis;
pub mod resolve_confirmation;
pub mod start_blast;
