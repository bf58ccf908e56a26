//! Host protocol adapters

pub mod i3bar;

pub use i3bar::{EventReader, Header, ProtocolError, StatusWriter};
