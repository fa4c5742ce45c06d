//! LimbLink Render Library
//!
//! Renderer abstraction and implementations for LimbLink.
//! The default implementation uses Vello for GPU-accelerated rendering.

mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloRenderer;
