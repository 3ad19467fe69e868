//! Client-side answer synchronization for multi-type forms.
//!
//! Local answers are kept as a [`state::FormDraftSnapshot`] and translated to
//! the wire shape by the [`codec`]. The [`engine`] components mirror drafts to
//! the server, reorder form elements, stage uploads and finalize submissions
//! through a [`remote::FormRemote`].

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod remote;
pub mod state;

pub use config::{DraftSettings, SyncConfig};
pub use error::{ConsistencyError, FinalizeError, ReorderError, ValidationError};
