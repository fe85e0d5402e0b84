//! Text CAPTCHA generation, validation, and rendering.

mod generator;
mod render;

pub use generator::ChallengeGenerator;
pub use render::{render_svg, svg_markup};
