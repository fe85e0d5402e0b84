//! Text challenge generation and answer checking.
//!
//! Every semantic slot (character, rotation, hue) gets its own fresh draw
//! from the injected CSPRNG. Raw `u32` draws are reduced modulo the slot's
//! range; the ranges are tiny next to 2^32 so the bias is negligible.

use checkpoint_common::constants::{
    CHALLENGE_ALPHABET, CHALLENGE_LENGTH, HUE_SPAN, ROTATION_OFFSET, ROTATION_SPAN,
};
use checkpoint_common::{Challenge, CheckpointError, GlyphStyle};
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use tokio::sync::watch;

use super::render;

/// CAPTCHA challenge generator.
///
/// Owns the current challenge and the answer typed so far, and publishes
/// whether that answer is currently valid to every subscriber.
pub struct ChallengeGenerator<R = StdRng> {
    rng: R,
    current: Challenge,
    answer: String,
    valid_tx: watch::Sender<bool>,
}

impl ChallengeGenerator<StdRng> {
    /// Create a generator seeded from the operating system.
    ///
    /// This is the only place the secure random source can fail; the
    /// feature cannot work without it, so callers treat the error as fatal.
    pub fn from_os_rng() -> Result<Self, CheckpointError> {
        let rng = StdRng::try_from_os_rng().map_err(|e| CheckpointError::Entropy(e.to_string()))?;
        Ok(Self::new(rng))
    }
}

impl<R: CryptoRng> ChallengeGenerator<R> {
    /// Create a generator and draw the first challenge
    pub fn new(mut rng: R) -> Self {
        let current = draw_challenge(&mut rng);
        let (valid_tx, _) = watch::channel(false);

        tracing::debug!(length = current.len(), "Generated initial CAPTCHA challenge");

        Self {
            rng,
            current,
            answer: String::new(),
            valid_tx,
        }
    }

    /// Replace the current challenge and clear the typed answer
    pub fn generate(&mut self) -> &Challenge {
        self.current = draw_challenge(&mut self.rng);
        self.answer.clear();
        self.publish();

        tracing::debug!(length = self.current.len(), "Regenerated CAPTCHA challenge");

        &self.current
    }

    /// Case-insensitive exact match against the current challenge.
    ///
    /// Only ASCII letters are case-folded.
    pub fn validate(&self, candidate: &str) -> bool {
        candidate.to_ascii_uppercase() == self.current.text
    }

    /// Record the answer typed so far and re-evaluate it
    pub fn set_answer(&mut self, answer: impl Into<String>) -> bool {
        self.answer = answer.into();
        self.publish()
    }

    /// The challenge currently on display
    pub fn challenge(&self) -> &Challenge {
        &self.current
    }

    /// The answer typed so far
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Whether the typed answer matches the current challenge
    pub fn is_valid(&self) -> bool {
        *self.valid_tx.borrow()
    }

    /// Subscribe to the "currently valid" signal
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.valid_tx.subscribe()
    }

    /// Render the current challenge as an SVG data URI
    pub fn render_svg(&mut self) -> String {
        render::render_svg(&self.current, &mut self.rng)
    }

    /// Render the current challenge as raw SVG markup
    pub fn render_markup(&mut self) -> String {
        render::svg_markup(&self.current, &mut self.rng)
    }

    fn publish(&self) -> bool {
        let valid = self.validate(&self.answer);
        self.valid_tx.send_replace(valid);
        valid
    }
}

/// Draw a fresh challenge: three independent values per character
fn draw_challenge(rng: &mut impl CryptoRng) -> Challenge {
    let mut text = String::with_capacity(CHALLENGE_LENGTH);
    let mut styling = Vec::with_capacity(CHALLENGE_LENGTH);

    for _ in 0..CHALLENGE_LENGTH {
        let index = rng.next_u32() as usize % CHALLENGE_ALPHABET.len();
        let rotation = (rng.next_u32() % ROTATION_SPAN) as i32 + ROTATION_OFFSET;
        let hue = (rng.next_u32() % HUE_SPAN) as i32;

        text.push(CHALLENGE_ALPHABET[index] as char);
        styling.push(GlyphStyle {
            rotation_degrees: rotation,
            hue_degrees: hue,
        });
    }

    Challenge { text, styling }
}
