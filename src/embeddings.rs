//! # Sentence embeddings
//!
//! Embeds text into 384-dimensional vectors with
//! `sentence-transformers/all-MiniLM-L6-v2` running on Candle (pure Rust ML
//! framework). Model weights and the tokenizer are fetched from the Hugging
//! Face Hub on first use and cached locally by `hf-hub`.
//!
//! The [`TextEmbedder`] trait is the seam between the ingestion/retrieval
//! pipeline and the model: [`vector_store::DocumentStore`](crate::vector_store::DocumentStore)
//! only ever sees the trait, so tests can substitute a stub and skip the
//! model download entirely.
//!
//! ## Quick Example
//! ```no_run
//! use agentbot::embeddings::{SentenceEmbedder, TextEmbedder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = SentenceEmbedder::load()?;
//! let v = embedder.embed("Rust is great!")?;
//! assert_eq!(v.len(), agentbot::embeddings::EMBEDDING_DIMENSION);
//! # Ok(()) }
//! ```

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use std::error::Error;
use tokenizers::Tokenizer;

/// Output dimensionality of the embedding model. The Pinecone index is
/// created with the same dimension; inserts fail if they ever disagree.
pub const EMBEDDING_DIMENSION: usize = 384;

/// Model identifier on the Hugging Face Hub.
const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Anything that can turn text into a fixed-size dense vector.
///
/// Implemented by [`SentenceEmbedder`]; tests implement it with canned
/// vectors so no network or model weights are needed.
pub trait TextEmbedder {
    /// Embed `text` into a vector of [`EMBEDDING_DIMENSION`] floats.
    fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>>;
}

/// MiniLM sentence embedder backed by Candle.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl SentenceEmbedder {
    /// Load the model and tokenizer from the Hugging Face Hub.
    ///
    /// Files are cached by `hf-hub`; subsequent loads are purely local.
    ///
    /// # Errors
    /// Returns an error if the download fails or the weights cannot be read.
    pub fn load() -> Result<Self, Box<dyn Error>> {
        let device = Device::Cpu;

        let repo = Repo::with_revision(MODEL_ID.to_string(), RepoType::Model, "main".to_string());
        let api = Api::new()?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json")?;
        let tokenizer_filename = api_repo.get("tokenizer.json")?;
        let weights_filename = api_repo.get("model.safetensors")?;

        let config = std::fs::read_to_string(config_filename)?;
        let config: Config = serde_json::from_str(&config)?;

        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| format!("Failed to load tokenizer: {}", e))?;

        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Mean pooling over token embeddings, weighted by the attention mask.
    ///
    /// Input shape is `[1, seq_len, 384]`; the mask is broadcast to
    /// `[1, seq_len, 1]` and the result squeezed down to `[384]`.
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &[u32],
    ) -> Result<Tensor, Box<dyn Error>> {
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let masked = embeddings.broadcast_mul(&mask)?;
        let sum = masked.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;
        let mean = sum.broadcast_div(&count)?;

        Ok(mean.squeeze(0)?)
    }

    /// L2 normalize the embedding vector.
    fn normalize(&self, tensor: &Tensor) -> Result<Tensor, Box<dyn Error>> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl TextEmbedder for SentenceEmbedder {
    /// Encode text into a normalized 384-d embedding.
    ///
    /// The tokenizer truncates input beyond 512 tokens automatically.
    fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| format!("Tokenization error: {}", e))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;

        let embedding = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let embedding = self.normalize(&embedding)?;

        Ok(embedding.to_vec1::<f32>()?)
    }
}
