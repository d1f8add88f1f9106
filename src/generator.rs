//! Generative face synthesis.
//!
//! [`FaceGenerator`] owns one loaded generative model at a time and drives it with random
//! latent input to synthesize small face images. It is a strict state machine:
//!
//! ```text
//! Unloaded --load_default/load_from_path--> Loaded --close--> Closed
//! ```
//!
//! `Closed` is terminal; a closed generator can never be loaded again and a fresh instance is
//! required. Generation requires exclusive access (`&mut self`), since the underlying runtime
//! handle is not guaranteed to be reentrant. Independent generator instances may run
//! concurrently without interacting.

use std::path::Path;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::image::{Color, Image};
use crate::nn::NeuralNetwork;
use crate::{asset, Error, Result};

/// Length of the latent vector driving the generative model.
pub const LATENT_DIM: usize = 100;

/// Width and height of generated face images.
pub const FACE_SIZE: u32 = 28;

enum State {
    Unloaded,
    Loaded(NeuralNetwork),
    Closed,
}

/// Synthesizes face images from a pretrained generative model.
pub struct FaceGenerator {
    state: State,
}

impl FaceGenerator {
    /// Creates a generator with no model loaded.
    ///
    /// [`FaceGenerator::generate_face`] fails with [`Error::NotLoaded`] until a model has been
    /// loaded successfully.
    pub fn new() -> Self {
        Self {
            state: State::Unloaded,
        }
    }

    /// Loads the default generator model from [`asset::DEFAULT_MODEL_ASSET`].
    pub fn load_default(&mut self) -> Result<()> {
        self.load_from_path(asset::DEFAULT_MODEL_ASSET)
    }

    /// Loads a generator model from a packaged asset path.
    ///
    /// GPU execution is probed as part of the load; if it is unavailable the model silently
    /// runs on the CPU (a capability downgrade, not an error). The load fails with
    /// [`Error::ModelLoad`] if the runtime rejects the bytes or if the model's tensor shapes
    /// don't match the `float32[1,100] -> float32[1,28,28,3]` generator contract.
    ///
    /// Loading while a model is already loaded replaces it; at most one model is live per
    /// generator. Loading a closed generator fails with [`Error::AlreadyClosed`].
    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.load_impl(path.as_ref())
    }

    fn load_impl(&mut self, path: &Path) -> Result<()> {
        if let State::Closed = self.state {
            return Err(Error::AlreadyClosed);
        }

        let bytes = asset::load(path)?;
        let nn = NeuralNetwork::from_onnx(bytes.as_slice())?;
        validate_shapes(&nn)?;

        log::debug!(
            "loaded generator model from '{}' (accelerator: {})",
            path.display(),
            nn.uses_accelerator(),
        );

        self.state = State::Loaded(nn);
        Ok(())
    }

    /// Returns whether a model is loaded and the generator can produce faces.
    ///
    /// Valid in every state; `false` before loading and after closing.
    pub fn is_operational(&self) -> bool {
        matches!(self.state, State::Loaded(_))
    }

    /// Returns whether the loaded model executes on an acquired GPU session.
    ///
    /// Always `false` when no model is loaded.
    pub fn uses_accelerator(&self) -> bool {
        match &self.state {
            State::Loaded(nn) => nn.uses_accelerator(),
            _ => false,
        }
    }

    /// Generates one face image from fresh random noise.
    ///
    /// Draws a [`LATENT_DIM`]-element latent vector of independent standard-normal samples,
    /// runs it through the loaded model, and converts the resulting `1×28×28×3` float tensor
    /// into a fully opaque [`FACE_SIZE`]² image.
    ///
    /// Fails with [`Error::NotLoaded`] unless a model is currently loaded.
    pub fn generate_face(&mut self) -> Result<Image> {
        self.generate_face_with(&mut rand::thread_rng())
    }

    /// Like [`FaceGenerator::generate_face`], but draws the latent vector from the given RNG.
    ///
    /// Useful for deterministic callers and tests.
    pub fn generate_face_with<R: Rng>(&mut self, rng: &mut R) -> Result<Image> {
        let nn = match &self.state {
            State::Loaded(nn) => nn,
            State::Unloaded | State::Closed => return Err(Error::NotLoaded),
        };

        let latent = sample_latent(rng);
        let raw = nn.estimate(&latent)?;
        if raw.len() != output_len() {
            return Err(Error::Inference(format!(
                "generator produced {} values, expected {}",
                raw.len(),
                output_len(),
            )));
        }

        Ok(tensor_to_image(&raw))
    }

    /// Releases the model and, if one was acquired, the GPU session.
    ///
    /// After closing, the generator is permanently unusable; there is no `Closed -> Loaded`
    /// transition. A second call fails with [`Error::AlreadyClosed`]. Dropping the generator
    /// without closing releases the same resources.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            State::Closed => Err(Error::AlreadyClosed),
            _ => {
                self.state = State::Closed;
                Ok(())
            }
        }
    }
}

impl Default for FaceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn output_len() -> usize {
    (FACE_SIZE * FACE_SIZE * 3) as usize
}

fn validate_shapes(nn: &NeuralNetwork) -> Result<()> {
    if nn.num_inputs() != 1 || nn.num_outputs() != 1 {
        return Err(Error::ModelLoad(format!(
            "generator model must have 1 input and 1 output, this one has {} and {}",
            nn.num_inputs(),
            nn.num_outputs(),
        )));
    }

    let size = FACE_SIZE as usize;
    match nn.input_shape() {
        Some([1, LATENT_DIM]) => {}
        other => {
            return Err(Error::ModelLoad(format!(
                "invalid generator input shape {:?}, expected [1, {}]",
                other, LATENT_DIM,
            )));
        }
    }
    match nn.output_shape() {
        Some(&[1, h, w, 3]) if h == size && w == size => {}
        other => {
            return Err(Error::ModelLoad(format!(
                "invalid generator output shape {:?}, expected [1, {size}, {size}, 3]",
                other,
            )));
        }
    }

    Ok(())
}

fn sample_latent<R: Rng>(rng: &mut R) -> [f32; LATENT_DIM] {
    let mut latent = [0.0; LATENT_DIM];
    for value in &mut latent {
        *value = rng.sample(StandardNormal);
    }
    latent
}

/// Converts a raw `28×28×3` float tensor (row-major RGB triples, nominally in `[0, 1]`) into a
/// fully opaque image.
///
/// Channel values are scaled by 255 and clamped to `[0, 255]`; models occasionally emit values
/// slightly outside their nominal range and clamping beats wraparound.
fn tensor_to_image(raw: &[f32]) -> Image {
    debug_assert_eq!(raw.len(), output_len());

    let mut image = Image::new(FACE_SIZE, FACE_SIZE);
    let mut channels = raw.chunks_exact(3);
    for y in 0..FACE_SIZE {
        for x in 0..FACE_SIZE {
            let rgb = channels.next().unwrap();
            image.set(
                x,
                y,
                Color::from_rgb8(
                    scale_channel(rgb[0]),
                    scale_channel(rgb[1]),
                    scale_channel(rgb[2]),
                ),
            );
        }
    }
    image
}

fn scale_channel(value: f32) -> u8 {
    (value * 255.0).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_before_load_fails() {
        let mut gen = FaceGenerator::new();
        assert!(!gen.is_operational());
        assert!(!gen.uses_accelerator());
        match gen.generate_face() {
            Err(Error::NotLoaded) => {}
            other => panic!("expected `NotLoaded`, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn generate_after_close_fails() {
        let mut gen = FaceGenerator::new();
        gen.close().unwrap();
        assert!(!gen.is_operational());
        match gen.generate_face() {
            Err(Error::NotLoaded) => {}
            other => panic!("expected `NotLoaded`, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn double_close_fails() {
        let mut gen = FaceGenerator::new();
        gen.close().unwrap();
        match gen.close() {
            Err(Error::AlreadyClosed) => {}
            other => panic!("expected `AlreadyClosed`, got {other:?}"),
        }
    }

    #[test]
    fn load_after_close_fails() {
        let mut gen = FaceGenerator::new();
        gen.close().unwrap();
        match gen.load_default() {
            Err(Error::AlreadyClosed) => {}
            other => panic!("expected `AlreadyClosed`, got {other:?}"),
        }
    }

    #[test]
    fn load_missing_asset_fails() {
        let mut gen = FaceGenerator::new();
        match gen.load_from_path("no/such/model.onnx") {
            Err(Error::AssetNotFound { .. }) => {}
            other => panic!("expected `AssetNotFound`, got {other:?}"),
        }
        assert!(!gen.is_operational());
    }

    #[test]
    fn load_rejects_malformed_model() {
        let path = std::env::temp_dir().join("facegen-malformed-model.onnx");
        std::fs::write(&path, b"these bytes are no model").unwrap();

        let mut gen = FaceGenerator::new();
        match gen.load_from_path(&path) {
            Err(Error::ModelLoad(_)) => {}
            other => panic!("expected `ModelLoad`, got {other:?}"),
        }
        assert!(!gen.is_operational());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn latent_sampling_varies() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let a = sample_latent(&mut StdRng::seed_from_u64(1));
        let b = sample_latent(&mut StdRng::seed_from_u64(2));
        assert_eq!(a.len(), LATENT_DIM);
        assert_ne!(a, b);

        // Same seed, same vector.
        let c = sample_latent(&mut StdRng::seed_from_u64(1));
        assert_eq!(a, c);
    }

    #[test]
    fn tensor_conversion_size_and_opacity() {
        let raw = vec![0.5; output_len()];
        let image = tensor_to_image(&raw);
        assert_eq!(image.width(), FACE_SIZE);
        assert_eq!(image.height(), FACE_SIZE);
        for y in 0..FACE_SIZE {
            for x in 0..FACE_SIZE {
                assert_eq!(image.get(x, y).a(), 255);
            }
        }
    }

    #[test]
    fn tensor_conversion_is_row_major() {
        let mut raw = vec![0.0; output_len()];
        // Second pixel of the first row: pure red.
        raw[3] = 1.0;
        let image = tensor_to_image(&raw);
        assert_eq!(image.get(1, 0), Color::from_rgb8(255, 0, 0));
        assert_eq!(image.get(0, 0), Color::from_rgb8(0, 0, 0));
        assert_eq!(image.get(0, 1), Color::from_rgb8(0, 0, 0));
    }

    #[test]
    fn tensor_conversion_clamps() {
        let mut raw = vec![0.5; output_len()];
        raw[0] = 1.7; // would wrap to a small value without clamping
        raw[1] = -0.3;
        let image = tensor_to_image(&raw);
        let first = image.get(0, 0);
        assert_eq!(first.r(), 255);
        assert_eq!(first.g(), 0);
        assert_eq!(first.b(), 127);
    }
}
