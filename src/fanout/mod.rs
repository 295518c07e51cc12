//! The `fanout` module pushes enriched readings to the observers watching
//! a channel.
//!
//! Each channel has a room: the set of sessions currently joined to it.
//! Rooms are independent: one room's membership churn never blocks
//! another room's emit, which is why the map holds one mutex per room
//! rather than a single lock around everything.

pub mod router;

pub use router::FanoutRouter;

#[cfg(test)]
mod tests;
