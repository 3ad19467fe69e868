//! Form domain state

mod answer;
mod identity;
mod ordering;
mod question;
mod snapshot;
mod upload;

pub use answer::*;
pub use identity::*;
pub use ordering::*;
pub use question::*;
pub use snapshot::*;
pub use upload::*;
