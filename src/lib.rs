pub mod alloc;
pub mod map;
pub mod set;

mod ctrl;
mod group;
mod probe;
mod raw;

pub use crate::alloc::{Allocator, Arena, Global};
pub use crate::map::HashMap;
pub use crate::set::HashSet;
