#[path = "../common/support.rs"]
mod support;

mod core;
mod durability;
mod sharding;
