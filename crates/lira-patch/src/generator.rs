//! Patch generator
//!
//! Tries the remote model under a deadline, then falls back to the local
//! rewrite. [`PatchGenerator::generate`] always returns a result.

use crate::error::RemoteError;
use crate::fallback::{self, SuffixSequence, LEARNING_WARNING};
use crate::prompt::{build_prompt, parse_envelope, parse_plain};
use crate::remote::{RemoteGenerator, DEFAULT_TIMEOUT_SECS};
use crate::request::{ChangeRequest, ChangeResult, GenerationSource};
use crate::tips::enhance_explanation;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Generator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchConfig {
    /// Deadline for one remote call
    pub timeout: Duration,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PatchConfig {
    /// Set the remote deadline
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Produces proposed file content for a change request
pub struct PatchGenerator {
    remote: Option<Arc<dyn RemoteGenerator>>,
    config: PatchConfig,
    suffixes: SuffixSequence,
}

impl std::fmt::Debug for PatchGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchGenerator")
            .field("remote", &self.remote.as_ref().map(|r| r.name().to_string()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for PatchGenerator {
    fn default() -> Self {
        Self::new(PatchConfig::default())
    }
}

impl PatchGenerator {
    /// Create a fallback-only generator
    #[must_use]
    pub fn new(config: PatchConfig) -> Self {
        Self {
            remote: None,
            config,
            suffixes: SuffixSequence::new(),
        }
    }

    /// Attach a remote model
    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteGenerator>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Whether a remote model is attached
    #[inline]
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> PatchConfig {
        self.config
    }

    /// Generate proposed content; never fails
    pub async fn generate(&self, request: &ChangeRequest) -> ChangeResult {
        let mut remote_error = None;
        if let Some(remote) = &self.remote {
            match self.try_remote(remote.as_ref(), request).await {
                Ok(result) => {
                    tracing::info!(
                        path = %request.file_path,
                        model = remote.name(),
                        "Remote generation succeeded"
                    );
                    return result;
                }
                Err(e) => {
                    tracing::warn!(path = %request.file_path, error = %e, "Remote generation failed, using fallback");
                    remote_error = Some(e);
                }
            }
        }
        self.fallback(request, remote_error.as_ref())
    }

    async fn try_remote(
        &self,
        remote: &dyn RemoteGenerator,
        request: &ChangeRequest,
    ) -> Result<ChangeResult, RemoteError> {
        let prompt = build_prompt(request);
        let text = tokio::time::timeout(self.config.timeout, remote.generate(&prompt))
            .await
            .map_err(|_| RemoteError::Timeout(self.config.timeout.as_secs()))??;

        if request.learning_mode {
            let envelope = parse_envelope(&text)?;
            Ok(ChangeResult {
                updated_content: envelope.updated_content,
                explanation: envelope.explanation,
                warnings: envelope.warnings,
                success: true,
                source: GenerationSource::Remote,
            })
        } else {
            Ok(ChangeResult {
                updated_content: parse_plain(&text)?,
                explanation: None,
                warnings: Vec::new(),
                success: true,
                source: GenerationSource::Remote,
            })
        }
    }

    /// Local rewrite, with learning notes and the remote failure disclosed
    #[must_use]
    pub fn fallback(&self, request: &ChangeRequest, remote_error: Option<&RemoteError>) -> ChangeResult {
        let now = Utc::now();
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        let mut result = fallback::generate(request, self.suffixes.next(millis), now);

        if request.learning_mode {
            result.explanation = result
                .explanation
                .map(|base| enhance_explanation(&base, request));
            result.warnings.push(LEARNING_WARNING.to_string());
        }
        if let Some(e) = remote_error {
            result
                .warnings
                .push(format!("Remote generation failed ({e}); the local fallback was used."));
        }
        result
    }
}
