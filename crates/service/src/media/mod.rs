//! Media file manager speaking the Roxy Fileman protocol.

pub mod fs;
pub mod roxy;

pub use fs::{LocalMediaFileSystem, MediaEntry, MediaFileSystem};
pub use roxy::{FileManager, RoxyAction, RoxyOutput, RoxyParams, RoxyStatus};
