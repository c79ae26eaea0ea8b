pub mod controller;
pub(crate) mod manager;
pub(crate) mod picture;
pub(crate) mod preview;
