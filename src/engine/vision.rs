//! Image token splicing for multimodal prompts.
//!
//! A `VisionPreprocessor` rewrites the padded prompt buffer so that each
//! image occupies a run of placeholder slots, and returns the embeddings the
//! backend substitutes at those slots. Placeholder runs form the
//! bidirectional attention region during prefill.

use ndarray::{s, Array2, Array3, Array4, ArrayView4};

use super::error::VisionError;

/// Token id written into placeholder slots. Outside any real vocabulary.
pub const PLACEHOLDER_TOKEN: u32 = u32::MAX - 1;

/// Patched images, `[batch, images_per_sequence, patches, patch_dim]`.
pub type PatchedImages = Array4<f32>;

/// Result of splicing images into the prompt buffer.
#[derive(Debug, Clone)]
pub struct VisionOutput {
    /// `[batch, image_tokens, dim]` embeddings, if any images were present.
    pub embeddings: Option<Array3<f32>>,
    pub token_buffer: Array2<u32>,
    pub num_input_tokens: Vec<usize>,
}

/// Converts image patches into placeholder tokens plus embeddings.
pub trait VisionPreprocessor: Send + Sync {
    /// Extra buffer slots the spliced prompt needs beyond the text prompt.
    fn extra_tokens(&self, images: &PatchedImages) -> usize;

    fn prepare(
        &self,
        images: &PatchedImages,
        token_buffer: Array2<u32>,
        num_input_tokens: Vec<usize>,
    ) -> Result<VisionOutput, VisionError>;
}

/// Turns raw patches into one embedding row per placeholder slot.
pub trait PatchEncoder: Send + Sync {
    /// Output is `[batch, images * tokens_per_image, dim]`.
    fn encode(&self, images: ArrayView4<'_, f32>) -> Result<Array3<f32>, VisionError>;
}

/// Token ids framing each spliced image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTokens {
    pub start_of_image: u32,
    pub end_of_image: u32,
    pub double_newline: u32,
    pub tokens_per_image: usize,
}

impl ImageTokens {
    /// Slots one image adds on top of its start-of-image marker.
    pub fn overhead_per_image(&self) -> usize {
        self.tokens_per_image + 4
    }

    fn expansion(&self) -> impl Iterator<Item = u32> + '_ {
        [self.double_newline, self.start_of_image]
            .into_iter()
            .chain(std::iter::repeat(PLACEHOLDER_TOKEN).take(self.tokens_per_image))
            .chain([self.end_of_image, self.double_newline])
    }
}

/// Expands every start-of-image marker in a prompt into a framed run of
/// placeholder slots and encodes the patches with `E`.
#[derive(Debug, Clone)]
pub struct ImageSplicer<E> {
    encoder: E,
    tokens: ImageTokens,
}

impl<E: PatchEncoder> ImageSplicer<E> {
    pub fn new(encoder: E, tokens: ImageTokens) -> Self {
        Self { encoder, tokens }
    }

    fn splice_row(&self, prompt: &[u32]) -> Vec<u32> {
        let mut spliced = Vec::with_capacity(prompt.len());
        for &token in prompt {
            if token == self.tokens.start_of_image {
                spliced.extend(self.tokens.expansion());
            } else {
                spliced.push(token);
            }
        }
        spliced
    }
}

impl<E: PatchEncoder> VisionPreprocessor for ImageSplicer<E> {
    fn extra_tokens(&self, images: &PatchedImages) -> usize {
        images.dim().1 * self.tokens.overhead_per_image()
    }

    fn prepare(
        &self,
        images: &PatchedImages,
        mut token_buffer: Array2<u32>,
        mut num_input_tokens: Vec<usize>,
    ) -> Result<VisionOutput, VisionError> {
        let expected = images.dim().1;
        let width = token_buffer.ncols();

        for (sequence, num_tokens) in num_input_tokens.iter_mut().enumerate() {
            let prompt = token_buffer.slice(s![sequence, ..*num_tokens]).to_vec();
            let found = prompt.iter().filter(|&&t| t == self.tokens.start_of_image).count();
            if found != expected {
                return Err(VisionError::MarkerMismatch { sequence, expected, found });
            }

            let spliced = self.splice_row(&prompt);
            if spliced.len() > width {
                return Err(VisionError::BufferOverflow {
                    sequence,
                    needed: spliced.len(),
                    width,
                });
            }
            for (slot, token) in token_buffer.row_mut(sequence).iter_mut().zip(&spliced) {
                *slot = *token;
            }
            *num_tokens = spliced.len();
        }

        let embeddings = self.encoder.encode(images.view())?;
        let image_slots = expected * self.tokens.tokens_per_image;
        if embeddings.dim().0 != token_buffer.nrows() || embeddings.dim().1 != image_slots {
            return Err(VisionError::Encoder(format!(
                "encoder returned {:?}, expected [{}, {}, _]",
                embeddings.shape(),
                token_buffer.nrows(),
                image_slots
            )));
        }

        Ok(VisionOutput {
            embeddings: Some(embeddings),
            token_buffer,
            num_input_tokens,
        })
    }
}
