use std::path::Path;

use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

use super::error::NliError;

/// Pad tokens tried in order when the tokenizer has no padding configured.
const PAD_TOKENS: [&str; 2] = ["<pad>", "[PAD]"];

/// Loads `tokenizer.json` from `model_dir`, truncating pairs to `max_len` tokens and padding
/// each batch to its longest member.
pub fn load_pair_tokenizer(model_dir: &Path, max_len: usize) -> Result<Tokenizer, NliError> {
    let path = model_dir.join("tokenizer.json");
    let mut tokenizer = Tokenizer::from_file(&path).map_err(|e| NliError::ModelLoadFailed {
        reason: format!("Failed to load tokenizer {}: {e}", path.display()),
    })?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))
        .map_err(|e| NliError::TokenizationFailed {
            reason: format!("Failed to configure truncation: {e}"),
        })?;

    if tokenizer.get_padding().is_none() {
        let mut padding = PaddingParams::default();
        if let Some((token, id)) = PAD_TOKENS
            .iter()
            .find_map(|t| tokenizer.token_to_id(t).map(|id| (*t, id)))
        {
            padding.pad_token = token.to_string();
            padding.pad_id = id;
        }
        tokenizer.with_padding(Some(padding));
    }

    Ok(tokenizer)
}
