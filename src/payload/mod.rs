// src/payload/mod.rs
//! Typed views over the two inbound webhook bodies.

pub mod note;
pub mod tweet;

pub use note::{DriveFile, InboundNote, Renote, RenoteUser, Visibility};
pub use tweet::InboundTweet;
