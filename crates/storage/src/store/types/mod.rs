#![forbid(unsafe_code)]

mod actions;
mod boards;
mod cascade;
mod items;
mod sync_history;

pub use actions::*;
pub use boards::*;
pub use cascade::*;
pub use items::*;
pub use sync_history::*;
