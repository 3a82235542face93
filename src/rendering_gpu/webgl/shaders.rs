use log::debug;
use web_sys::{WebGlProgram, WebGlRenderingContext as Gl, WebGlShader};

use crate::error::{PlayerError, PlayerResult};

pub const A_POSITION: &str = "a_position";
pub const A_COLOR_COORD: &str = "a_color_coord";
pub const A_ALPHA_COORD: &str = "a_alpha_coord";
pub const U_SAMPLER: &str = "u_sampler";

const VERTEX_SHADER: &str = r#"
attribute vec2 a_position;
attribute vec2 a_color_coord;
attribute vec2 a_alpha_coord;

varying vec2 v_color_coord;
varying vec2 v_alpha_coord;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
    v_color_coord = a_color_coord;
    v_alpha_coord = a_alpha_coord;
}
"#;

// The alpha half is grayscale; its blue channel is the alpha value, same as
// the pixel-buffer path. Output is premultiplied for the default canvas.
const FRAGMENT_SHADER: &str = r#"
precision mediump float;

uniform sampler2D u_sampler;

varying vec2 v_color_coord;
varying vec2 v_alpha_coord;

void main() {
    vec3 color = texture2D(u_sampler, v_color_coord).rgb;
    float alpha = texture2D(u_sampler, v_alpha_coord).b;
    gl_FragColor = vec4(color * alpha, alpha);
}
"#;

/// The linked color+alpha program and its two stages.
pub struct ShaderProgram {
    pub program: WebGlProgram,
    vertex: WebGlShader,
    fragment: WebGlShader,
}

impl ShaderProgram {
    pub fn new(gl: &Gl, debug: bool) -> PlayerResult<Self> {
        let vertex = compile_shader(gl, Gl::VERTEX_SHADER, VERTEX_SHADER, debug)?;
        let fragment = match compile_shader(gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER, debug) {
            Ok(shader) => shader,
            Err(err) => {
                gl.delete_shader(Some(&vertex));
                return Err(err);
            }
        };

        match link_program(gl, &vertex, &fragment, debug) {
            Ok(program) => Ok(Self {
                program,
                vertex,
                fragment,
            }),
            Err(err) => {
                gl.delete_shader(Some(&vertex));
                gl.delete_shader(Some(&fragment));
                Err(err)
            }
        }
    }

    pub fn attrib_location(&self, gl: &Gl, name: &str) -> PlayerResult<u32> {
        let location = gl.get_attrib_location(&self.program, name);
        if location < 0 {
            return Err(PlayerError::strategy_init(format!("attribute {} not found", name)));
        }
        Ok(location as u32)
    }

    pub fn release(&self, gl: &Gl) {
        gl.detach_shader(&self.program, &self.vertex);
        gl.delete_shader(Some(&self.vertex));
        gl.detach_shader(&self.program, &self.fragment);
        gl.delete_shader(Some(&self.fragment));
        gl.delete_program(Some(&self.program));
    }
}

fn stage_name(shader_type: u32) -> &'static str {
    if shader_type == Gl::VERTEX_SHADER {
        "vertex"
    } else {
        "fragment"
    }
}

fn compile_shader(
    gl: &Gl,
    shader_type: u32,
    source: &str,
    debug: bool,
) -> PlayerResult<WebGlShader> {
    let stage = stage_name(shader_type);
    let shader = gl
        .create_shader(shader_type)
        .ok_or_else(|| PlayerError::strategy_init(format!("unable to create {} shader", stage)))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    let compiled = gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if debug {
        debug!("{} shader compile result: {}", stage, compiled);
    }
    if !compiled {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        return Err(PlayerError::strategy_init(format!(
            "{} shader compile failed: {}",
            stage, log
        )));
    }
    Ok(shader)
}

fn link_program(
    gl: &Gl,
    vertex: &WebGlShader,
    fragment: &WebGlShader,
    debug: bool,
) -> PlayerResult<WebGlProgram> {
    let program = gl
        .create_program()
        .ok_or_else(|| PlayerError::strategy_init("unable to create program"))?;
    gl.attach_shader(&program, vertex);
    gl.attach_shader(&program, fragment);
    gl.link_program(&program);

    let linked = gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if debug {
        debug!("program link result: {}", linked);
    }
    if !linked {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        return Err(PlayerError::strategy_init(format!("program link failed: {}", log)));
    }
    gl.use_program(Some(&program));
    Ok(program)
}
