//! TabFlow Rust Library
//!
//! Este crate actúa como la fachada de TabFlow:
//! - Re-exporta el motor (`tab_core`) y los steps en memoria
//!   (`tab_adapters`).
//! - Expone `config` con la configuración por entorno.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub mod config;

pub use tab_adapters;
pub use tab_core;
