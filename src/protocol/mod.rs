//! Viewer-facing call protocol

pub mod call;

pub use call::ServiceCall;
