//! Pixel-buffer compositor: the CPU fallback when WebGL is unavailable.
//!
//! Each tick the packed frame is drawn into an offscreen buffer twice the
//! size of the surface along the split axis, both halves are read back, and
//! the alpha half is spliced into the color half's alpha channel before the
//! result is put on the visible canvas.

use image::RgbaImage;
use log::debug;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement, ImageData};

use crate::{
    error::{PlayerError, PlayerResult},
    geometry::{compute_image_regions, offscreen_size, ImageRect, ImageRegions, PackingConvention},
    rendering_gpu::{Backend, Compositor},
};

/// Byte offset of the blue channel inside an RGBA pixel. The alpha half of a
/// packed frame is grayscale, so its blue byte carries the alpha value.
const ALPHA_SOURCE_CHANNEL: usize = 2;
const ALPHA_CHANNEL: usize = 3;

/// Replaces every alpha byte of `color` with the blue byte of the pixel at
/// the same position in `alpha`.
pub fn splice_alpha(color: &mut RgbaImage, alpha: &RgbaImage) {
    debug_assert_eq!(color.dimensions(), alpha.dimensions());
    for (dst, src) in color.pixels_mut().zip(alpha.pixels()) {
        dst.0[ALPHA_CHANNEL] = src.0[ALPHA_SOURCE_CHANNEL];
    }
}

/// Drawing backend for the pixel-buffer compositor.
pub trait RasterTarget {
    /// Size of the visible surface in device pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Allocates the offscreen buffer.
    fn prepare(&mut self, buffer_size: (u32, u32)) -> PlayerResult<()>;

    /// Draws the current source frame scaled to fill the offscreen buffer.
    /// Returns `false` when the source has no frame to draw yet.
    fn draw_source(&mut self) -> PlayerResult<bool>;

    /// Reads a region of the offscreen buffer as RGBA pixels.
    fn read_region(&self, rect: ImageRect) -> PlayerResult<RgbaImage>;

    /// Writes `image` to the visible surface at the origin.
    fn present(&mut self, image: &RgbaImage) -> PlayerResult<()>;

    fn clear(&mut self);

    fn release(&mut self) -> PlayerResult<()>;
}

pub struct PixelBufferCompositor<T> {
    target: T,
    packing: PackingConvention,
    /// `None` until initialized, and while the surface has no area.
    regions: Option<ImageRegions>,
    initialized: bool,
    released: bool,
}

impl<T: RasterTarget> PixelBufferCompositor<T> {
    pub fn new(target: T, packing: PackingConvention) -> Self {
        Self {
            target,
            packing,
            regions: None,
            initialized: false,
            released: false,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn regions(&self) -> Option<ImageRegions> {
        self.regions
    }

    /// A surface without area (e.g. a hidden container) leaves the regions
    /// unset and every composite a no-op, like the GPU path.
    fn derive_geometry(&mut self) -> PlayerResult<()> {
        let (width, height) = self.target.surface_size();
        if width == 0 || height == 0 {
            debug!("Pixel buffer surface has no area, nothing will be drawn");
            self.regions = None;
            return Ok(());
        }
        let buffer_size = offscreen_size(self.packing.orientation, width, height);
        self.target.prepare(buffer_size)?;
        self.regions = Some(compute_image_regions(self.packing, width, height));
        debug!(
            "Pixel buffer {}x{}, regions {:?}",
            buffer_size.0, buffer_size.1, self.regions
        );
        Ok(())
    }
}

impl<T: RasterTarget> Compositor for PixelBufferCompositor<T> {
    fn backend(&self) -> Backend {
        Backend::Canvas2d
    }

    fn initialize(&mut self) -> PlayerResult<()> {
        if self.released {
            return Err(PlayerError::strategy_init("compositor already torn down"));
        }
        self.derive_geometry()?;
        self.initialized = true;
        Ok(())
    }

    fn set_packing(&mut self, packing: PackingConvention) -> PlayerResult<()> {
        if packing == self.packing {
            return Ok(());
        }
        self.packing = packing;
        if self.initialized {
            self.derive_geometry()?;
        }
        Ok(())
    }

    fn composite_frame(&mut self) -> PlayerResult<()> {
        let regions = match self.regions {
            Some(regions) => regions,
            None => return Ok(()),
        };
        if !self.target.draw_source()? {
            return Ok(());
        }

        let mut color = self.target.read_region(regions.color)?;
        let alpha = self.target.read_region(regions.alpha)?;
        splice_alpha(&mut color, &alpha);
        self.target.present(&color)
    }

    fn clear(&mut self) {
        if self.regions.is_some() {
            self.target.clear();
        }
    }

    fn teardown(&mut self) -> PlayerResult<()> {
        self.regions = None;
        self.initialized = false;
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.target.release()
    }
}

/// Canvas2D implementation backed by a detached offscreen canvas.
pub struct Canvas2dTarget {
    canvas: HtmlCanvasElement,
    video: HtmlVideoElement,
    ctx2d: Option<CanvasRenderingContext2d>,
    offscreen: Option<(HtmlCanvasElement, CanvasRenderingContext2d)>,
    buffer_size: (u32, u32),
}

impl Canvas2dTarget {
    pub fn new(canvas: HtmlCanvasElement, video: HtmlVideoElement) -> Self {
        Self {
            canvas,
            video,
            ctx2d: None,
            offscreen: None,
            buffer_size: (0, 0),
        }
    }

    fn context_2d(
        canvas: &HtmlCanvasElement,
        will_read_frequently: bool,
    ) -> PlayerResult<CanvasRenderingContext2d> {
        let options = js_sys::Object::new();
        js_sys::Reflect::set(
            &options,
            &"willReadFrequently".into(),
            &JsValue::from_bool(will_read_frequently),
        )?;
        canvas
            .get_context_with_context_options("2d", &options)?
            .ok_or_else(|| PlayerError::strategy_init("2D canvas context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| PlayerError::strategy_init("unexpected 2D context type"))
    }

    fn offscreen_ctx(&self) -> PlayerResult<&CanvasRenderingContext2d> {
        self.offscreen
            .as_ref()
            .map(|(_, ctx)| ctx)
            .ok_or_else(|| PlayerError::host("offscreen buffer not allocated"))
    }
}

impl RasterTarget for Canvas2dTarget {
    fn surface_size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn prepare(&mut self, buffer_size: (u32, u32)) -> PlayerResult<()> {
        if self.ctx2d.is_none() {
            self.ctx2d = Some(Self::context_2d(&self.canvas, false)?);
        }

        let offscreen = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| PlayerError::host("no document"))?
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| PlayerError::host("created element is not a canvas"))?;
        offscreen.set_width(buffer_size.0);
        offscreen.set_height(buffer_size.1);
        let offscreen_ctx = Self::context_2d(&offscreen, true)?;

        self.offscreen = Some((offscreen, offscreen_ctx));
        self.buffer_size = buffer_size;
        Ok(())
    }

    fn draw_source(&mut self) -> PlayerResult<bool> {
        let (video_width, video_height) = (self.video.video_width(), self.video.video_height());
        if video_width == 0 || video_height == 0 {
            return Ok(false);
        }
        let (buffer_width, buffer_height) = self.buffer_size;
        self.offscreen_ctx()?
            .draw_image_with_html_video_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                &self.video,
                0.0,
                0.0,
                video_width as f64,
                video_height as f64,
                0.0,
                0.0,
                buffer_width as f64,
                buffer_height as f64,
            )?;
        Ok(true)
    }

    fn read_region(&self, rect: ImageRect) -> PlayerResult<RgbaImage> {
        let image_data = self.offscreen_ctx()?.get_image_data(
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        )?;
        RgbaImage::from_raw(rect.width, rect.height, image_data.data().0)
            .ok_or_else(|| PlayerError::host("image data size mismatch"))
    }

    fn present(&mut self, image: &RgbaImage) -> PlayerResult<()> {
        let ctx = self
            .ctx2d
            .as_ref()
            .ok_or_else(|| PlayerError::host("surface context not allocated"))?;
        let image_data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(image.as_raw().as_slice()),
            image.width(),
            image.height(),
        )?;
        ctx.put_image_data(&image_data, 0.0, 0.0)?;
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(ctx) = &self.ctx2d {
            ctx.clear_rect(0.0, 0.0, self.canvas.width() as f64, self.canvas.height() as f64);
        }
    }

    fn release(&mut self) -> PlayerResult<()> {
        self.ctx2d = None;
        self.offscreen = None;
        self.canvas.remove();
        Ok(())
    }
}
