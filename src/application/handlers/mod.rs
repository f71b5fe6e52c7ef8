pub mod delivery_worker;
pub mod dispatch_pool;
