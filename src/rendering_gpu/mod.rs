pub mod webgl;

use log::debug;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::{
    error::{PlayerError, PlayerResult},
    geometry::PackingConvention,
    rendering::{Canvas2dTarget, PixelBufferCompositor},
};

pub use webgl::GpuCompositor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    WebGl,
    Canvas2d,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::WebGl => "webgl",
            Backend::Canvas2d => "canvas2d",
        }
    }
}

/// A strategy that combines the color and alpha halves of the current frame
/// and presents the result.
pub trait Compositor {
    fn backend(&self) -> Backend;

    /// Allocates every resource the strategy needs. On failure nothing
    /// allocated so far stays reachable.
    fn initialize(&mut self) -> PlayerResult<()>;

    /// Re-derives geometry for a new packing convention.
    fn set_packing(&mut self, packing: PackingConvention) -> PlayerResult<()>;

    /// Composites and presents one frame. A no-op before `initialize` or after
    /// `teardown`.
    fn composite_frame(&mut self) -> PlayerResult<()>;

    /// Clears the visible surface.
    fn clear(&mut self);

    /// Releases everything and removes the surface from its container.
    /// Safe to call more than once.
    fn teardown(&mut self) -> PlayerResult<()>;
}

/// The compositor selected for a session, fixed for its whole life.
pub enum DynamicCompositor {
    WebGl(GpuCompositor),
    Canvas2d(PixelBufferCompositor<Canvas2dTarget>),
}

impl Compositor for DynamicCompositor {
    fn backend(&self) -> Backend {
        match self {
            DynamicCompositor::WebGl(c) => c.backend(),
            DynamicCompositor::Canvas2d(c) => c.backend(),
        }
    }

    fn initialize(&mut self) -> PlayerResult<()> {
        match self {
            DynamicCompositor::WebGl(c) => c.initialize(),
            DynamicCompositor::Canvas2d(c) => c.initialize(),
        }
    }

    fn set_packing(&mut self, packing: PackingConvention) -> PlayerResult<()> {
        match self {
            DynamicCompositor::WebGl(c) => c.set_packing(packing),
            DynamicCompositor::Canvas2d(c) => c.set_packing(packing),
        }
    }

    fn composite_frame(&mut self) -> PlayerResult<()> {
        match self {
            DynamicCompositor::WebGl(c) => c.composite_frame(),
            DynamicCompositor::Canvas2d(c) => c.composite_frame(),
        }
    }

    fn clear(&mut self) {
        match self {
            DynamicCompositor::WebGl(c) => c.clear(),
            DynamicCompositor::Canvas2d(c) => c.clear(),
        }
    }

    fn teardown(&mut self) -> PlayerResult<()> {
        match self {
            DynamicCompositor::WebGl(c) => c.teardown(),
            DynamicCompositor::Canvas2d(c) => c.teardown(),
        }
    }
}

/// What the host can render with.
pub trait CapabilityProbe {
    fn supports_webgl(&self) -> bool;
    fn supports_canvas2d(&self) -> bool;
}

/// Picks the GPU path when possible, the pixel-buffer path otherwise.
pub fn select_backend<P: CapabilityProbe + ?Sized>(probe: &P) -> PlayerResult<Backend> {
    let backend = if probe.supports_webgl() {
        Backend::WebGl
    } else if probe.supports_canvas2d() {
        Backend::Canvas2d
    } else {
        return Err(PlayerError::Unsupported);
    };
    debug!("Selected {} compositor", backend.name());
    Ok(backend)
}

/// Probes by asking a throwaway canvas for contexts.
pub struct BrowserProbe;

impl BrowserProbe {
    fn scratch_canvas() -> Option<HtmlCanvasElement> {
        web_sys::window()?
            .document()?
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()
    }

    fn has_context(canvas: &HtmlCanvasElement, id: &str) -> bool {
        matches!(canvas.get_context(id), Ok(Some(_)))
    }
}

impl CapabilityProbe for BrowserProbe {
    fn supports_webgl(&self) -> bool {
        is_webgl_supported()
    }

    fn supports_canvas2d(&self) -> bool {
        Self::scratch_canvas().map_or(false, |canvas| Self::has_context(&canvas, "2d"))
    }
}

/// Check if WebGL is supported in the browser
pub fn is_webgl_supported() -> bool {
    BrowserProbe::scratch_canvas().map_or(false, |canvas| {
        webgl::WEBGL_CONTEXT_IDS
            .iter()
            .any(|id| BrowserProbe::has_context(&canvas, id))
    })
}
