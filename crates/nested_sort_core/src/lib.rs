mod codec;
mod config;
mod depth;
mod geometry;
mod session;
mod sortable;
mod tree;

pub use crate::codec::*;
pub use crate::config::*;
pub use crate::depth::*;
pub use crate::geometry::*;
pub use crate::session::*;
pub use crate::sortable::*;
pub use crate::tree::*;
