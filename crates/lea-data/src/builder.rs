use lea_core::error::Result;
use lea_core::models::Log;
use lea_core::session::{CompleteSession, SessionClassifier};
use lea_core::time_duration::{TimeDuration, ONE_HOUR};
use lea_core::time_utils::TimezoneHandler;
use tracing::debug;

use crate::history::{validate_bucket_size, SessionHistory};
use crate::reconstructor::{Reconstruction, SessionReconstructor};

// ── SessionHistoryBuilder ─────────────────────────────────────────────────────

/// Turns a log into a [`SessionHistory`]: reconstruction, then bucketing.
#[derive(Debug, Clone)]
pub struct SessionHistoryBuilder {
    bucket_size: TimeDuration,
    timezone: TimezoneHandler,
    classifier: SessionClassifier,
    reconstructor: SessionReconstructor,
}

impl Default for SessionHistoryBuilder {
    fn default() -> Self {
        Self {
            bucket_size: ONE_HOUR,
            timezone: TimezoneHandler::utc(),
            classifier: SessionClassifier::default(),
            reconstructor: SessionReconstructor::default(),
        }
    }
}

impl SessionHistoryBuilder {
    /// A builder with hourly buckets in `timezone`.
    pub fn new(timezone: TimezoneHandler) -> Self {
        Self {
            timezone,
            ..Self::default()
        }
    }

    /// Fails fast when `bucket_size` does not divide 24 hours.
    pub fn with_bucket_size(mut self, bucket_size: TimeDuration) -> Result<Self> {
        validate_bucket_size(bucket_size)?;
        self.bucket_size = bucket_size;
        Ok(self)
    }

    pub fn with_classifier(mut self, classifier: SessionClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_reconstructor(mut self, reconstructor: SessionReconstructor) -> Self {
        self.reconstructor = reconstructor;
        self
    }

    pub fn bucket_size(&self) -> TimeDuration {
        self.bucket_size
    }

    /// Reconstruct sessions from `logs` and bucket them.
    pub fn build(&self, logs: &[Log]) -> Result<SessionHistory> {
        self.build_with_report(logs).map(|(history, _)| history)
    }

    /// Like [`build`](Self::build), also returning the reconstruction
    /// diagnostics (discarded sessions, stray end markers). The returned
    /// [`Reconstruction`] has its `sessions` moved into the history.
    pub fn build_with_report(&self, logs: &[Log]) -> Result<(SessionHistory, Reconstruction)> {
        let mut history =
            SessionHistory::new(self.bucket_size, self.timezone, self.classifier.clone())?;
        let mut reconstruction = self.reconstructor.reconstruct(logs)?;

        for session in std::mem::take(&mut reconstruction.sessions) {
            history.add_session(session);
        }

        debug!(
            "SessionHistoryBuilder: bucketed {} sessions into {} buckets",
            history.size(),
            history.bucket_size()
        );
        Ok((history, reconstruction))
    }

    /// Bucket already-reconstructed sessions.
    pub fn build_from_sessions(
        &self,
        sessions: impl IntoIterator<Item = CompleteSession>,
    ) -> Result<SessionHistory> {
        let mut history =
            SessionHistory::new(self.bucket_size, self.timezone, self.classifier.clone())?;
        for session in sessions {
            history.add_session(session);
        }
        Ok(history)
    }

    /// Rebucket `history` at `bucket_size`.
    ///
    /// The old bucket structure is discarded entirely: every session is
    /// re-filed from its start time alone, so the old and new sizes need not
    /// be multiples of each other. Timezone and classifier carry over.
    pub fn rebuild_with_different_bucket_size(
        history: &SessionHistory,
        bucket_size: TimeDuration,
    ) -> Result<SessionHistory> {
        let mut rebuilt =
            SessionHistory::new(bucket_size, history.timezone(), history.classifier().clone())?;
        for session in history.sessions() {
            rebuilt.add_session(session.clone());
        }

        debug!(
            "SessionHistoryBuilder: rebuilt {} sessions from {} to {} buckets",
            rebuilt.size(),
            history.bucket_size(),
            bucket_size
        );
        Ok(rebuilt)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
