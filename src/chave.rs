use std::fmt;

use thiserror::Error;

pub const CHAVE_LEN: usize = 44;

/// Key used when none is given on the command line.
pub static SAMPLE_CHAVE: &str = "51250209608375000103550010000047181000141540";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChaveError {
    #[error("empty key")]
    Empty,
    #[error("key has {0} characters, expected 44")]
    WrongLength(usize),
    #[error("key contains non digit character {0:?}")]
    NotNumeric(char),
}

/// NFe access key: exactly 44 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceKey(String);

impl InvoiceKey {
    pub fn parse(raw: &str) -> Result<Self, ChaveError> {
        if raw.is_empty() {
            return Err(ChaveError::Empty);
        }
        if let Some(c) = raw.chars().find(|c| !c.is_ascii_digit()) {
            return Err(ChaveError::NotNumeric(c));
        }
        // all ascii past this point, so byte length == char count
        if raw.len() != CHAVE_LEN {
            return Err(ChaveError::WrongLength(raw.len()));
        }
        Ok(InvoiceKey(raw.to_string()))
    }

    pub fn sample() -> Self {
        InvoiceKey(SAMPLE_CHAVE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
