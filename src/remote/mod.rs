//! Form server access

mod client;
mod traits;

pub use client::HttpFormClient;
pub use traits::FormRemote;

#[cfg(test)]
pub use traits::MockFormRemote;
