//! HTTP request handlers.
//!
//! Handlers translate between HTTP and the workflows in [`crate::library`]: they extract and
//! reject malformed input, call one workflow and serialize its result. Errors are returned as
//! [`crate::errors::Error`] and turned into problem bodies by [`crate::problem_details`].

pub mod songs;
