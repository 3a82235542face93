use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement};

use crate::error::{PlayerError, PlayerResult};

/// Device-pixel size of a surface: explicit CSS size if given, else the
/// container's layout size, scaled by the device pixel ratio.
pub fn surface_size(
    container_size: (i32, i32),
    width: Option<f64>,
    height: Option<f64>,
    device_pixel_ratio: f64,
) -> (u32, u32) {
    let css_width = width.filter(|w| *w > 0.0).unwrap_or(container_size.0 as f64);
    let css_height = height.filter(|h| *h > 0.0).unwrap_or(container_size.1 as f64);
    (
        (css_width * device_pixel_ratio).max(0.0) as u32,
        (css_height * device_pixel_ratio).max(0.0) as u32,
    )
}

/// Creates the visible canvas and appends it to `container`.
pub fn create_surface(
    container: &HtmlElement,
    width: Option<f64>,
    height: Option<f64>,
) -> PlayerResult<HtmlCanvasElement> {
    let window = web_sys::window().ok_or_else(|| PlayerError::host("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| PlayerError::host("no document"))?;
    let canvas = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| PlayerError::host("created element is not a canvas"))?;

    let (device_width, device_height) = surface_size(
        (container.offset_width(), container.offset_height()),
        width,
        height,
        window.device_pixel_ratio(),
    );
    canvas.set_width(device_width);
    canvas.set_height(device_height);
    set_overlay_canvas_style(&canvas)?;

    container.append_child(&canvas)?;
    Ok(canvas)
}

/// Stretch over the container and let pointer events through.
fn set_overlay_canvas_style(canvas: &HtmlCanvasElement) -> PlayerResult<()> {
    let style = canvas.style();
    style.set_property("width", "100%")?;
    style.set_property("height", "100%")?;
    style.set_property("pointer-events", "none")?;
    Ok(())
}
