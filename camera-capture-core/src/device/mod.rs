pub mod guard;
pub(crate) mod supervisor;
