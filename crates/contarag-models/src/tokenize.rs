use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams, TruncationStrategy};

use contarag_core::error::{Error, Result};

/// Token tensors for a batch of `(query, document)` pairs, each `[B, T]`.
pub struct PairBatch {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Truncates pairs longest-first to `max_len` and pads each batch to its
/// longest member.
pub fn configure_pair_tokenizer(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            strategy: TruncationStrategy::LongestFirst,
            ..Default::default()
        }))
        .map_err(|e| Error::resource_load("cross-encoder tokenizer", e))?;
    tokenizer.with_padding(Some(PaddingParams { strategy: PaddingStrategy::BatchLongest, ..Default::default() }));
    Ok(())
}

pub fn tokenize_pairs_on_device(tokenizer: &Tokenizer, pairs: &[(String, String)], device: &Device) -> Result<PairBatch> {
    let inputs: Vec<(&str, &str)> = pairs.iter().map(|(q, d)| (q.as_str(), d.as_str())).collect();
    let encodings = tokenizer
        .encode_batch(inputs, true)
        .map_err(|e| Error::upstream("cross-encoder tokenizer", e))?;

    let mut ids = Vec::with_capacity(encodings.len());
    let mut type_ids = Vec::with_capacity(encodings.len());
    let mut mask = Vec::with_capacity(encodings.len());
    for enc in &encodings {
        ids.push(Tensor::new(enc.get_ids(), device).map_err(tensor_err)?);
        type_ids.push(Tensor::new(enc.get_type_ids(), device).map_err(tensor_err)?);
        mask.push(Tensor::new(enc.get_attention_mask(), device).map_err(tensor_err)?);
    }
    Ok(PairBatch {
        input_ids: Tensor::stack(&ids, 0).map_err(tensor_err)?,
        token_type_ids: Tensor::stack(&type_ids, 0).map_err(tensor_err)?,
        attention_mask: Tensor::stack(&mask, 0).map_err(tensor_err)?,
    })
}

pub(crate) fn tensor_err(e: candle_core::Error) -> Error {
    Error::upstream("cross-encoder", e)
}
