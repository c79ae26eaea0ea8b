pub mod backend;
pub mod delegate;
pub mod session_observer;
