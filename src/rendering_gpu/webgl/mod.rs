//! WebGL GPU-accelerated compositor
//!
//! Uploads the packed video frame as a single texture and draws one quad
//! whose fragment stage samples color and alpha from the two halves.

mod quad;
mod shaders;

use log::debug;
use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, HtmlMediaElement, HtmlVideoElement, WebGlRenderingContext as Gl,
    WebGlTexture, WebglLoseContext,
};

use crate::{
    error::{PlayerError, PlayerResult},
    geometry::PackingConvention,
};

use super::{Backend, Compositor};

pub use quad::QuadGeometry;
pub use shaders::ShaderProgram;

/// Context ids tried in order.
pub const WEBGL_CONTEXT_IDS: [&str; 2] = ["webgl", "experimental-webgl"];

/// Everything allocated on the GL context. Fields are filled in as
/// initialization progresses so a failure can release exactly what exists.
#[derive(Default)]
struct GlResources {
    gl: Option<Gl>,
    program: Option<ShaderProgram>,
    texture: Option<WebGlTexture>,
    quad: Option<QuadGeometry>,
}

impl GlResources {
    /// Best-effort and order-independent.
    fn release(&mut self) {
        let gl = match self.gl.take() {
            Some(gl) => gl,
            None => return,
        };
        if let Some(program) = self.program.take() {
            program.release(&gl);
        }
        if let Some(texture) = self.texture.take() {
            gl.delete_texture(Some(&texture));
        }
        if let Some(quad) = self.quad.take() {
            quad.release(&gl);
        }
        if let Ok(Some(ext)) = gl.get_extension("WEBGL_lose_context") {
            if let Ok(ext) = ext.dyn_into::<WebglLoseContext>() {
                ext.lose_context();
            }
        }
    }
}

/// WebGL compositor
pub struct GpuCompositor {
    canvas: HtmlCanvasElement,
    video: HtmlVideoElement,
    packing: PackingConvention,
    debug: bool,
    resources: GlResources,
    ready: bool,
}

impl GpuCompositor {
    pub fn new(
        canvas: HtmlCanvasElement,
        video: HtmlVideoElement,
        packing: PackingConvention,
        debug: bool,
    ) -> Self {
        Self {
            canvas,
            video,
            packing,
            debug,
            resources: GlResources::default(),
            ready: false,
        }
    }

    fn get_context(&self) -> PlayerResult<Gl> {
        for id in WEBGL_CONTEXT_IDS.iter() {
            if let Ok(Some(context)) = self.canvas.get_context(id) {
                return context
                    .dyn_into::<Gl>()
                    .map_err(|_| PlayerError::strategy_init("unexpected WebGL context type"));
            }
        }
        Err(PlayerError::strategy_init("WebGL context unavailable"))
    }

    fn create_texture(gl: &Gl) -> PlayerResult<WebGlTexture> {
        let texture = gl
            .create_texture()
            .ok_or_else(|| PlayerError::strategy_init("unable to create texture"))?;
        gl.pixel_storei(Gl::UNPACK_FLIP_Y_WEBGL, 1);
        gl.active_texture(Gl::TEXTURE0);
        gl.bind_texture(Gl::TEXTURE_2D, Some(&texture));
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, Gl::LINEAR as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, Gl::CLAMP_TO_EDGE as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, Gl::CLAMP_TO_EDGE as i32);
        Ok(texture)
    }

    fn build(&mut self) -> PlayerResult<()> {
        let gl = self.get_context()?;
        self.resources.gl = Some(gl.clone());

        // the video already carries final alpha
        gl.disable(Gl::BLEND);
        gl.viewport(0, 0, self.canvas.width() as i32, self.canvas.height() as i32);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);

        let program = ShaderProgram::new(&gl, self.debug)?;
        let sampler = gl.get_uniform_location(&program.program, shaders::U_SAMPLER);
        self.resources.program = Some(program);

        self.resources.texture = Some(Self::create_texture(&gl)?);

        let program = self
            .resources
            .program
            .as_ref()
            .ok_or_else(|| PlayerError::strategy_init("program missing"))?;
        self.resources.quad = Some(QuadGeometry::new(&gl, program, self.packing)?);

        let sampler =
            sampler.ok_or_else(|| PlayerError::strategy_init("uniform u_sampler not found"))?;
        gl.uniform1i(Some(&sampler), 0);
        Ok(())
    }

    fn has_current_frame(&self) -> bool {
        self.video.ready_state() >= HtmlMediaElement::HAVE_CURRENT_DATA
    }
}

impl Compositor for GpuCompositor {
    fn backend(&self) -> Backend {
        Backend::WebGl
    }

    fn initialize(&mut self) -> PlayerResult<()> {
        if self.ready {
            return Ok(());
        }
        match self.build() {
            Ok(()) => {
                self.ready = true;
                debug!(
                    "WebGL compositor ready ({}x{})",
                    self.canvas.width(),
                    self.canvas.height()
                );
                Ok(())
            }
            Err(err) => {
                self.resources.release();
                Err(err)
            }
        }
    }

    fn set_packing(&mut self, packing: PackingConvention) -> PlayerResult<()> {
        if packing == self.packing {
            return Ok(());
        }
        self.packing = packing;
        if let (Some(gl), Some(quad)) = (&self.resources.gl, &self.resources.quad) {
            quad.upload(gl, packing);
        }
        Ok(())
    }

    fn composite_frame(&mut self) -> PlayerResult<()> {
        if !self.ready || !self.has_current_frame() {
            return Ok(());
        }
        let (gl, quad) = match (&self.resources.gl, &self.resources.quad) {
            (Some(gl), Some(quad)) => (gl, quad),
            _ => return Ok(()),
        };

        gl.clear(Gl::COLOR_BUFFER_BIT);
        gl.tex_image_2d_with_u32_and_u32_and_video(
            Gl::TEXTURE_2D,
            0,
            Gl::RGB as i32,
            Gl::RGB,
            Gl::UNSIGNED_BYTE,
            &self.video,
        )?;
        quad.draw(gl);
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(gl) = &self.resources.gl {
            gl.clear(Gl::COLOR_BUFFER_BIT);
        }
    }

    fn teardown(&mut self) -> PlayerResult<()> {
        self.ready = false;
        self.resources.release();
        self.canvas.remove();
        Ok(())
    }
}
