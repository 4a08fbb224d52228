use crate::config::FollowUpOffsets;
use crate::error::{OutreachError, Result};
use crate::types::{EmailStatus, EmailType, ResponseType, Stage, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: Uuid,
    pub email_type: EmailType,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replied_at: Option<DateTime<Utc>>,
}

impl Email {
    pub fn new(
        email_type: EmailType,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email_type,
            subject: subject.into(),
            body: body.into(),
            status: EmailStatus::Draft,
            sent_at: None,
            scheduled_for: None,
            opened_at: None,
            replied_at: None,
        }
    }
}

/// Drafted content for one email, as returned by the drafting service.
#[derive(Debug, Clone)]
pub struct EmailDraft {
    pub email_type: EmailType,
    pub subject: String,
    pub body: String,
}

impl EmailDraft {
    pub fn new(
        email_type: EmailType,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            email_type,
            subject: subject.into(),
            body: body.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CampaignPatch
// ---------------------------------------------------------------------------

/// Partial descriptive-field update for the debounced write path.
///
/// Stage and email-sequence mutations go through the state-machine methods
/// instead; this patch only touches fields with no transition semantics.
#[derive(Debug, Clone, Default)]
pub struct CampaignPatch {
    pub show_name: Option<String>,
    pub host_name: Option<String>,
    /// `Some(None)` clears the contact email.
    pub contact_email: Option<Option<String>>,
    pub tier: Option<Tier>,
    pub response_type: Option<Option<ResponseType>>,
}

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

/// One outreach target and its email sequence/progress.
///
/// Mutated only through the state-machine methods below; the sync engine
/// owns the working copy these live in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub show_name: String,
    pub host_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub tier: Tier,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(default)]
    pub email_sequence: Vec<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contacted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_follow_up_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(
        id: impl Into<String>,
        show_name: impl Into<String>,
        host_name: impl Into<String>,
        tier: Tier,
    ) -> Self {
        Self {
            id: id.into(),
            show_name: show_name.into(),
            host_name: host_name.into(),
            contact_email: None,
            tier,
            stage: Stage::NotStarted,
            response_type: None,
            email_sequence: Vec::new(),
            last_contacted_at: None,
            next_follow_up_at: None,
            created_at: Utc::now(),
        }
    }

    // ---------------------------------------------------------------------------
    // Sequence helpers
    // ---------------------------------------------------------------------------

    pub fn email(&self, email_type: EmailType) -> Option<&Email> {
        self.email_sequence
            .iter()
            .find(|e| e.email_type == email_type)
    }

    pub fn email_mut(&mut self, email_type: EmailType) -> Option<&mut Email> {
        self.email_sequence
            .iter_mut()
            .find(|e| e.email_type == email_type)
    }

    /// Remaining sequence template given the current response classification.
    pub fn sequence_template(&self) -> &'static [EmailType] {
        self.response_type
            .map(ResponseType::template)
            .unwrap_or(ResponseType::NoResponse.template())
    }

    fn invalid(&self, to: Stage, reason: impl Into<String>) -> OutreachError {
        OutreachError::InvalidTransition {
            from: self.stage.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }

    // ---------------------------------------------------------------------------
    // Sequence mutations
    // ---------------------------------------------------------------------------

    /// Record a freshly generated email sequence and move into drafting.
    ///
    /// Rejects duplicate email types (at most one email per type per
    /// campaign) without applying any of the drafts.
    pub fn generate_sequence(&mut self, drafts: Vec<EmailDraft>) -> Result<()> {
        if self.stage != Stage::NotStarted {
            return Err(self.invalid(
                Stage::Drafting,
                "sequence can only be generated for a not-started campaign",
            ));
        }
        let mut seen: Vec<EmailType> = self.email_sequence.iter().map(|e| e.email_type).collect();
        for draft in &drafts {
            if seen.contains(&draft.email_type) {
                return Err(OutreachError::EmailExists {
                    campaign: self.id.clone(),
                    email_type: draft.email_type.to_string(),
                });
            }
            seen.push(draft.email_type);
        }
        self.email_sequence.extend(
            drafts
                .into_iter()
                .map(|d| Email::new(d.email_type, d.subject, d.body)),
        );
        self.stage = Stage::Drafting;
        Ok(())
    }

    /// Add one more drafted email to the sequence, e.g. a nurture email
    /// written after a reply changed the template. Uniqueness by type holds.
    pub fn add_email(&mut self, draft: EmailDraft) -> Result<()> {
        if self.email(draft.email_type).is_some() {
            return Err(OutreachError::EmailExists {
                campaign: self.id.clone(),
                email_type: draft.email_type.to_string(),
            });
        }
        self.email_sequence
            .push(Email::new(draft.email_type, draft.subject, draft.body));
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Stage transitions
    // ---------------------------------------------------------------------------

    /// Record that `email_type` was delivered by the mail service.
    ///
    /// Sets `sent`/`sent_at` on the email and `last_contacted_at` on the
    /// campaign. Sending the initial email also moves the campaign to
    /// `ready_to_send`. `next_follow_up_at` chains from this send using the
    /// per-step offset, clearing when the sequence has no next step.
    pub fn send_email(
        &mut self,
        email_type: EmailType,
        offsets: &FollowUpOffsets,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let id = self.id.clone();
        let email = self
            .email_mut(email_type)
            .ok_or_else(|| OutreachError::EmailNotFound {
                campaign: id,
                email_type: email_type.to_string(),
            })?;
        if !matches!(email.status, EmailStatus::Draft | EmailStatus::Scheduled) {
            return Err(OutreachError::InvalidTransition {
                from: email.status.to_string(),
                to: EmailStatus::Sent.to_string(),
                reason: format!("email '{email_type}' is not draft or scheduled"),
            });
        }
        email.status = EmailStatus::Sent;
        email.sent_at = Some(now);
        email.scheduled_for = None;

        self.last_contacted_at = Some(now);
        if email_type == EmailType::Initial {
            self.stage = Stage::ReadyToSend;
        }
        self.next_follow_up_at = offsets.after(email_type).map(|d| now + d);
        Ok(())
    }

    /// The follow-up window elapsed with no reply.
    pub fn mark_follow_up_due(&mut self) -> Result<()> {
        if self.stage != Stage::ReadyToSend {
            return Err(self.invalid(
                Stage::FollowUpDue,
                "only a ready-to-send campaign can become follow-up due",
            ));
        }
        self.stage = Stage::FollowUpDue;
        Ok(())
    }

    /// Stop the campaign: scheduled emails revert to draft and the
    /// follow-up clock is cleared.
    pub fn pause(&mut self) -> Result<()> {
        if !matches!(self.stage, Stage::ReadyToSend | Stage::FollowUpDue) {
            return Err(self.invalid(Stage::Paused, "campaign is not active"));
        }
        self.stage = Stage::Paused;
        for email in &mut self.email_sequence {
            if email.status == EmailStatus::Scheduled {
                email.status = EmailStatus::Draft;
                email.scheduled_for = None;
            }
        }
        self.next_follow_up_at = None;
        Ok(())
    }

    /// Resume a paused campaign.
    ///
    /// The first remaining draft in sequence order is rescheduled with its
    /// per-step offset; with no draft left, only the stage changes.
    pub fn resume(&mut self, offsets: &FollowUpOffsets, now: DateTime<Utc>) -> Result<()> {
        if self.stage != Stage::Paused {
            return Err(self.invalid(Stage::ReadyToSend, "campaign is not paused"));
        }
        self.stage = Stage::ReadyToSend;
        let next = self
            .email_sequence
            .iter_mut()
            .find(|e| e.status == EmailStatus::Draft);
        if let Some(email) = next {
            let at = now + offsets.for_step(email.email_type);
            email.status = EmailStatus::Scheduled;
            email.scheduled_for = Some(at);
            self.next_follow_up_at = Some(at);
        }
        Ok(())
    }

    /// Classify an inbound reply. Stage is deliberately untouched: a reply
    /// can arrive at any point, and moving to `responded` is a UI policy
    /// choice made via [`Campaign::mark_responded`].
    pub fn record_reply(&mut self, response_type: ResponseType) {
        self.response_type = Some(response_type);
    }

    pub fn mark_responded(&mut self) {
        self.stage = Stage::Responded;
    }

    pub fn book(&mut self) -> Result<()> {
        if self.stage != Stage::Responded {
            return Err(self.invalid(Stage::Booked, "only a responded campaign can be booked"));
        }
        if self.response_type != Some(ResponseType::Booked) {
            return Err(self.invalid(Stage::Booked, "response type is not booked"));
        }
        self.stage = Stage::Booked;
        Ok(())
    }

    pub fn close(&mut self) {
        self.stage = Stage::Closed;
    }

    // ---------------------------------------------------------------------------
    // Email engagement
    // ---------------------------------------------------------------------------

    /// Record an open event. Idempotent once opened; rejected before send.
    pub fn mark_email_opened(&mut self, email_type: EmailType, now: DateTime<Utc>) -> Result<()> {
        let id = self.id.clone();
        let email = self
            .email_mut(email_type)
            .ok_or_else(|| OutreachError::EmailNotFound {
                campaign: id,
                email_type: email_type.to_string(),
            })?;
        match email.status {
            EmailStatus::Sent => {
                email.status = EmailStatus::Opened;
                email.opened_at = Some(now);
                Ok(())
            }
            EmailStatus::Opened | EmailStatus::Replied => Ok(()),
            other => Err(OutreachError::InvalidTransition {
                from: other.to_string(),
                to: EmailStatus::Opened.to_string(),
                reason: format!("email '{email_type}' has not been sent"),
            }),
        }
    }

    /// Record a reply event on an email. Idempotent once replied.
    pub fn mark_email_replied(&mut self, email_type: EmailType, now: DateTime<Utc>) -> Result<()> {
        let id = self.id.clone();
        let email = self
            .email_mut(email_type)
            .ok_or_else(|| OutreachError::EmailNotFound {
                campaign: id,
                email_type: email_type.to_string(),
            })?;
        match email.status {
            EmailStatus::Sent | EmailStatus::Opened => {
                email.status = EmailStatus::Replied;
                email.replied_at = Some(now);
                Ok(())
            }
            EmailStatus::Replied => Ok(()),
            other => Err(OutreachError::InvalidTransition {
                from: other.to_string(),
                to: EmailStatus::Replied.to_string(),
                reason: format!("email '{email_type}' has not been sent"),
            }),
        }
    }

    // ---------------------------------------------------------------------------
    // Descriptive updates
    // ---------------------------------------------------------------------------

    pub fn apply_patch(&mut self, patch: CampaignPatch) {
        if let Some(show_name) = patch.show_name {
            self.show_name = show_name;
        }
        if let Some(host_name) = patch.host_name {
            self.host_name = host_name;
        }
        if let Some(contact_email) = patch.contact_email {
            self.contact_email = contact_email;
        }
        if let Some(tier) = patch.tier {
            self.tier = tier;
        }
        if let Some(response_type) = patch.response_type {
            self.response_type = response_type;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
