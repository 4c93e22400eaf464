//! Value objects - identifiers addressed across the registry, hub, and bus

mod ids;
mod room;
mod target;

pub use ids::{ConnectionId, UserId};
pub use room::{RoomId, RoomType};
pub use target::DeliveryTarget;
