pub mod discord;
pub mod in_memory;
