//! Bridge between the terminal control thread and the backend worker that
//! hosts the session controller.

pub mod commands;
pub mod runtime;
