//! SVG rendering of a text challenge.
//!
//! Glyph rotation and hue come from the challenge styling; only the
//! background noise is drawn fresh on every render.

use base64::{Engine, engine::general_purpose::STANDARD};
use checkpoint_common::Challenge;
use rand::Rng;

const WIDTH: u32 = 200;
const HEIGHT: u32 = 80;
const NOISE_LINES: usize = 15;

/// Render a challenge as a `data:image/svg+xml;base64,...` URI
pub fn render_svg(challenge: &Challenge, rng: &mut impl Rng) -> String {
    let svg = svg_markup(challenge, rng);
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(&svg))
}

/// Raw SVG markup for a challenge
pub fn svg_markup(challenge: &Challenge, rng: &mut impl Rng) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
        WIDTH, HEIGHT
    );

    svg.push_str(r##"<rect width="100%" height="100%" fill="#1a1a2e"/>"##);

    for _ in 0..NOISE_LINES {
        let x1 = rng.random_range(0..WIDTH);
        let y1 = rng.random_range(0..HEIGHT);
        let x2 = rng.random_range(0..WIDTH);
        let y2 = rng.random_range(0..HEIGHT);
        let opacity = rng.random_range(20..50);
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="rgba(255,255,255,0.{})" stroke-width="1"/>"#,
            x1, y1, x2, y2, opacity
        ));
    }

    let char_width = WIDTH as f32 / (challenge.len() as f32 + 1.0);
    for (i, (c, style)) in challenge.glyphs().enumerate() {
        let x = char_width * (i as f32 + 0.8);
        let y = 50;
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="monospace" font-size="32" font-weight="bold" fill="hsl({}, 70%, 75%)" transform="rotate({} {} {})">{}</text>"#,
            x, y, style.hue_degrees, style.rotation_degrees, x, y, c
        ));
    }

    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_common::GlyphStyle;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn challenge() -> Challenge {
        Challenge {
            text: "K7QP2M".to_string(),
            styling: (0..6)
                .map(|i| GlyphStyle {
                    rotation_degrees: i - 10,
                    hue_degrees: i * 60,
                })
                .collect(),
        }
    }

    #[test]
    fn test_glyphs_carry_styling() {
        let mut rng = StdRng::seed_from_u64(1);
        let svg = svg_markup(&challenge(), &mut rng);

        assert_eq!(svg.matches("<text ").count(), 6);
        assert_eq!(svg.matches("<line ").count(), NOISE_LINES);
        assert!(svg.contains(r#"fill="hsl(300, 70%, 75%)""#));
        assert!(svg.contains("transform=\"rotate(-10 "));
        assert!(svg.contains(">K</text>"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_data_uri_round_trips() {
        let mut rng = StdRng::seed_from_u64(2);
        let uri = render_svg(&challenge(), &mut rng);
        let encoded = uri.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let decoded = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(decoded.starts_with("<svg "));
    }
}
