use crate::error::FilterError;
use crate::id::ShortId;
use async_trait::async_trait;
use typed_builder::TypedBuilder;

pub type Result<T> = std::result::Result<T, FilterError>;

/// Sizing of a probabilistic membership filter.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct FilterConfig {
    /// Expected number of ids held at once.
    #[builder(default = 1_000_000)]
    pub expected_items: usize,
    /// Desired false positive rate, between 0.0 and 1.0 exclusive.
    #[builder(default = 0.01)]
    pub false_positive_rate: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Approximate set of ids that currently exist.
///
/// Implementations may report false positives but never false negatives for
/// an id that was added and not deleted since.
#[async_trait]
pub trait MembershipFilter: Send + Sync + 'static {
    async fn add(&self, id: &ShortId) -> Result<()>;

    /// `false` is a confident "never added (or deleted)"; `true` means "maybe".
    async fn exists(&self, id: &ShortId) -> Result<bool>;

    /// Returns `false` if the id was not present.
    async fn del(&self, id: &ShortId) -> Result<bool>;

    /// Returns `true` only if every id was present and removed.
    async fn del_many(&self, ids: &[ShortId]) -> Result<bool>;
}
