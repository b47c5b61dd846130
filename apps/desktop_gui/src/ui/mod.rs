//! UI layer for the desktop form: egui shell and the element view model it renders.

pub mod app;
pub mod view_model;

pub use app::{BlendStudioApp, StartupConfig};
