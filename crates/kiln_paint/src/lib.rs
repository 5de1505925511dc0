//! Kiln paint
//!
//! Drawing API on top of `kiln_entity`. A [`Canvas`] records draws, clips and
//! layers against a graphics-state stack into a [`Picture`], which an
//! [`AiksContext`] renders into a render target.
//!
//! # Example
//!
//! ```rust
//! use kiln_core::{Color, Rect};
//! use kiln_paint::{Canvas, Paint};
//!
//! let mut canvas = Canvas::new();
//! canvas.save();
//! canvas.translate(10.0, 10.0);
//! canvas.draw_rect(Rect::new(0.0, 0.0, 20.0, 20.0), &Paint::fill(Color::RED));
//! assert!(canvas.restore());
//! assert!(!canvas.restore());
//!
//! let picture = canvas.end_recording();
//! assert_eq!(picture.bounds(), Some(Rect::new(10.0, 10.0, 20.0, 20.0)));
//! ```

pub mod aiks_context;
pub mod canvas;
pub mod paint;
pub mod picture;

pub use aiks_context::AiksContext;
pub use canvas::Canvas;
pub use paint::{Paint, PaintStyle};
pub use picture::Picture;
