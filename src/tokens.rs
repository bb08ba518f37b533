//! Token counting for the bundle budget check.
use anyhow::{anyhow, Result};
use tiktoken_rs::CoreBPE;

pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;
}

/// `cl100k_base` byte-pair encoding, the tokenizer most assistant models
/// bill against.
pub struct Cl100kCounter {
    bpe: CoreBPE,
}

impl Cl100kCounter {
    pub fn load() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|err| anyhow!("load cl100k_base encoding: {err}"))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for Cl100kCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}
