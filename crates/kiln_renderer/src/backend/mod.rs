//! Backend implementations of [`Context`](crate::Context)

pub mod headless;

#[cfg(feature = "wgpu")]
pub mod wgpu_backend;
