//! # Feature: RAT Cookie Re-authentication
//!
//! Periodically probes every stored RAT cookie against the SoT API. After
//! [`MAX_FAILED_TRIES`] consecutive rejections the owner gets a single DM
//! asking for a fresh cookie. Storing a new cookie resets both counters.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use super::client::{AuthProbe, SotError};
use crate::features::lifecycle::PeriodicTask;
use crate::features::secrets::{PreferenceStore, FAILED_RAT_NOTIFY, FAILED_RAT_TRIES, RAT_COOKIE};
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serenity::http::Http;
use serenity::model::id::UserId;
use std::sync::Arc;

/// Rejections in a row before the user is notified
pub const MAX_FAILED_TRIES: u32 = 3;

const EXPIRED_COOKIE_NOTICE: &str = "Hi! Your Sea of Thieves RAT cookie seems to have expired, \
so I can no longer look up your balance. Please send me a fresh one with `!setrat <cookie>`.";

/// Delivers a private notice to a subject
#[async_trait]
pub trait SubjectNotifier: Send + Sync {
    async fn notify(&self, subject: &str, message: &str) -> Result<()>;
}

/// Sends notices as Discord direct messages
pub struct DirectMessageNotifier {
    http: Arc<Http>,
}

impl DirectMessageNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SubjectNotifier for DirectMessageNotifier {
    async fn notify(&self, subject: &str, message: &str) -> Result<()> {
        let user = UserId(subject.parse::<u64>()?);
        let dm = user.create_dm_channel(&*self.http).await?;
        dm.say(&*self.http, message).await?;
        Ok(())
    }
}

/// Outcome of probing one subject, mostly useful for logs and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Valid,
    Rejected { tries: u32, notified: bool },
    Skipped,
}

pub struct AuthChecker {
    store: PreferenceStore,
    probe: Arc<dyn AuthProbe>,
    notifier: Arc<dyn SubjectNotifier>,
}

impl AuthChecker {
    pub fn new(
        store: PreferenceStore,
        probe: Arc<dyn AuthProbe>,
        notifier: Arc<dyn SubjectNotifier>,
    ) -> Self {
        Self {
            store,
            probe,
            notifier,
        }
    }

    /// Probe every subject that has a cookie stored
    pub async fn check_all(&self) -> Vec<(String, ProbeOutcome)> {
        let subjects = match self.store.subjects_with(RAT_COOKIE).await {
            Ok(subjects) => subjects,
            Err(e) => {
                error!("Failed to list users with a RAT cookie: {e}");
                return Vec::new();
            }
        };

        info!("🔐 Re-checking RAT cookies for {} users", subjects.len());
        let mut outcomes = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let outcome = self.check_subject(&subject).await;
            debug!("RAT cookie check for {subject}: {outcome:?}");
            outcomes.push((subject, outcome));
        }
        outcomes
    }

    async fn check_subject(&self, subject: &str) -> ProbeOutcome {
        let cookie = match self.store.get_decrypted(subject, RAT_COOKIE).await {
            Ok(cookie) => cookie,
            Err(e) => {
                error!("Failed to read RAT cookie for {subject}: {e}");
                return ProbeOutcome::Skipped;
            }
        };

        match self.probe.check_auth(&cookie).await {
            Ok(()) => {
                if let Err(e) = self.store.delete_preference(subject, FAILED_RAT_TRIES).await {
                    warn!("Failed to reset '{FAILED_RAT_TRIES}' for {subject}: {e}");
                }
                ProbeOutcome::Valid
            }
            Err(SotError::AuthRejected) => self.record_rejection(subject).await,
            Err(e) => {
                warn!("RAT cookie check for {subject} inconclusive: {e}");
                ProbeOutcome::Skipped
            }
        }
    }

    async fn record_rejection(&self, subject: &str) -> ProbeOutcome {
        let previous = match self.store.find_decrypted(subject, FAILED_RAT_TRIES).await {
            Ok(value) => value.and_then(|v| v.parse::<u32>().ok()).unwrap_or(0),
            Err(e) => {
                warn!("Unreadable '{FAILED_RAT_TRIES}' for {subject}, starting over: {e}");
                0
            }
        };
        let tries = previous.saturating_add(1);

        if let Err(e) = self
            .store
            .set_encrypted(subject, FAILED_RAT_TRIES, &tries.to_string())
            .await
        {
            error!("Failed to store '{FAILED_RAT_TRIES}' for {subject}: {e}");
        }

        if tries < MAX_FAILED_TRIES {
            return ProbeOutcome::Rejected {
                tries,
                notified: false,
            };
        }

        let already_notified = matches!(
            self.store.find_decrypted(subject, FAILED_RAT_NOTIFY).await,
            Ok(Some(_))
        );
        if already_notified {
            return ProbeOutcome::Rejected {
                tries,
                notified: false,
            };
        }

        if let Err(e) = self.notifier.notify(subject, EXPIRED_COOKIE_NOTICE).await {
            error!("Failed to notify {subject} about expired RAT cookie: {e}");
            return ProbeOutcome::Rejected {
                tries,
                notified: false,
            };
        }

        info!("📨 Notified {subject} about an expired RAT cookie");
        if let Err(e) = self.store.set_encrypted(subject, FAILED_RAT_NOTIFY, "1").await {
            error!("Failed to store '{FAILED_RAT_NOTIFY}' for {subject}: {e}");
        }
        ProbeOutcome::Rejected {
            tries,
            notified: true,
        }
    }
}

#[async_trait]
impl PeriodicTask for AuthChecker {
    async fn run(&self) {
        self.check_all().await;
    }
}
