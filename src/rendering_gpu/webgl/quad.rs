use web_sys::{WebGlBuffer, WebGlRenderingContext as Gl};

use crate::{
    error::{PlayerError, PlayerResult},
    geometry::{
        compute_vertex_coords, PackingConvention, ALPHA_COORD_OFFSET, COLOR_COORD_OFFSET,
        FLOATS_PER_VERTEX, POSITION_OFFSET, QUAD_VERTEX_COUNT,
    },
};

use super::shaders::{ShaderProgram, A_ALPHA_COORD, A_COLOR_COORD, A_POSITION};

const FLOAT_SIZE: i32 = std::mem::size_of::<f32>() as i32;
const STRIDE: i32 = FLOATS_PER_VERTEX as i32 * FLOAT_SIZE;

/// Full-viewport quad carrying position plus color and alpha texcoords.
pub struct QuadGeometry {
    buffer: WebGlBuffer,
}

impl QuadGeometry {
    pub fn new(gl: &Gl, program: &ShaderProgram, packing: PackingConvention) -> PlayerResult<Self> {
        let buffer = gl
            .create_buffer()
            .ok_or_else(|| PlayerError::strategy_init("unable to create vertex buffer"))?;
        let quad = Self { buffer };
        quad.upload(gl, packing);

        let bound = [
            (A_POSITION, POSITION_OFFSET),
            (A_COLOR_COORD, COLOR_COORD_OFFSET),
            (A_ALPHA_COORD, ALPHA_COORD_OFFSET),
        ]
        .iter()
        .try_for_each(|(name, offset)| {
            let location = program.attrib_location(gl, name)?;
            gl.vertex_attrib_pointer_with_i32(
                location,
                2,
                Gl::FLOAT,
                false,
                STRIDE,
                *offset as i32 * FLOAT_SIZE,
            );
            gl.enable_vertex_attrib_array(location);
            Ok::<_, PlayerError>(())
        });

        match bound {
            Ok(()) => Ok(quad),
            Err(err) => {
                quad.release(gl);
                Err(err)
            }
        }
    }

    /// Replaces the vertex data, e.g. after the packing convention changed.
    pub fn upload(&self, gl: &Gl, packing: PackingConvention) {
        let coords = compute_vertex_coords(packing);
        let data = js_sys::Float32Array::from(&coords[..]);
        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&self.buffer));
        gl.buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &data, Gl::STATIC_DRAW);
    }

    pub fn draw(&self, gl: &Gl) {
        gl.draw_arrays(Gl::TRIANGLE_STRIP, 0, QUAD_VERTEX_COUNT as i32);
    }

    pub fn release(&self, gl: &Gl) {
        gl.delete_buffer(Some(&self.buffer));
    }
}
