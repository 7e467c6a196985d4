#![forbid(unsafe_code)]

pub mod topbar;
pub mod filters;
pub mod list;
pub mod statusbar;
pub mod toasts;
pub mod blocking;
