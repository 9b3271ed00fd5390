//! Token counting for context documents
//!
//! Counts follow the BPE encoding of the chat model the document is meant
//! for. Models tiktoken does not know are counted with `o200k_base`, the
//! encoding of the default model.

use crate::error::{IsyError, Result};
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Tokenizer for `model`, falling back to `o200k_base`
///
/// # Errors
///
/// - [`IsyError::Internal`] if the encoding tables cannot be loaded
pub fn tokenizer_for(model: &str) -> Result<CoreBPE> {
    match tiktoken_rs::get_bpe_from_model(model) {
        Ok(bpe) => Ok(bpe),
        Err(e) => {
            debug!("No tokenizer for model {:?} ({}), using o200k_base", model, e);
            tiktoken_rs::o200k_base()
                .map_err(|e| IsyError::internal(format!("cannot load o200k_base: {}", e)))
        }
    }
}

/// Number of tokens `text` takes for `model`
pub fn count_tokens(model: &str, text: &str) -> Result<usize> {
    let bpe = tokenizer_for(model)?;
    Ok(bpe.encode_ordinary(text).len())
}
