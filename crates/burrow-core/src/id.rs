use serde::{Deserialize, Serialize};
use std::fmt::Display;
use typed_builder::TypedBuilder;

/// Characters used for generated ids unless configured otherwise.
pub const BASE62_ALPHABET: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const MAX_LENGTH: usize = 32;

/// Identifier of a shortened URL.
///
/// Ids are drawn from the key pool, so the only thing validated here is the
/// shape: 1-32 ASCII alphanumeric characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortId(String);

impl ShortId {
    /// Creates a new `ShortId` after validating the input.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Creates a `ShortId` without validation.
    ///
    /// Use this only for ids produced by trusted internal sources
    /// (the generator, or rows read back from the store).
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn validate(id: &str) -> Result<(), String> {
        if id.is_empty() || id.len() > MAX_LENGTH {
            return Err(format!(
                "length must be between 1 and {}, got {}",
                MAX_LENGTH,
                id.len()
            ));
        }

        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("must contain only alphanumeric characters: '{id}'"));
        }

        Ok(())
    }
}

impl Display for ShortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shape of generated ids.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortIdConfig {
    /// Number of characters in every generated id.
    #[builder(default = 6)]
    pub length: usize,
    /// Characters ids are drawn from.
    #[builder(default = BASE62_ALPHABET.to_string(), setter(into))]
    pub alphabet: String,
}

impl Default for ShortIdConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Draws fixed-length random ids over a configured alphabet.
///
/// The generator does not guarantee uniqueness; the key pool rejects
/// duplicates on insert.
#[derive(Debug, Clone)]
pub struct ShortIdGenerator {
    alphabet: Vec<char>,
    length: usize,
}

impl ShortIdGenerator {
    pub fn new(config: &ShortIdConfig) -> Result<Self, String> {
        let alphabet: Vec<char> = config.alphabet.chars().collect();
        if alphabet.is_empty() || !alphabet.iter().all(char::is_ascii_alphanumeric) {
            return Err(format!(
                "alphabet must be non-empty ASCII alphanumeric, got '{}'",
                config.alphabet
            ));
        }
        if config.length == 0 || config.length > MAX_LENGTH {
            return Err(format!(
                "id length must be between 1 and {MAX_LENGTH}, got {}",
                config.length
            ));
        }
        Ok(Self {
            alphabet,
            length: config.length,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn generate(&self) -> ShortId {
        let id: String = (0..self.length)
            .map(|_| self.alphabet[rand::random_range(0..self.alphabet.len())])
            .collect();
        ShortId::new_unchecked(id)
    }

    /// Generates `n` ids. Duplicates within the batch are possible and left
    /// for the store to skip.
    pub fn generate_batch(&self, n: usize) -> Vec<ShortId> {
        (0..n).map(|_| self.generate()).collect()
    }
}

impl Default for ShortIdGenerator {
    fn default() -> Self {
        Self {
            alphabet: BASE62_ALPHABET.chars().collect(),
            length: 6,
        }
    }
}
