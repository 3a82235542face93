//! Browser collaborators: the decoding `<video>`, scheduling primitives and
//! the visible canvas.

pub mod scheduler;
pub mod surface;
pub mod video;

pub use scheduler::WebScheduler;
pub use surface::create_surface;
pub use video::{create_video_element, VideoElementSource};
