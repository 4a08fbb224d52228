use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NotStarted,
    Drafting,
    ReadyToSend,
    FollowUpDue,
    Paused,
    Responded,
    Booked,
    Closed,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::NotStarted,
            Stage::Drafting,
            Stage::ReadyToSend,
            Stage::FollowUpDue,
            Stage::Paused,
            Stage::Responded,
            Stage::Booked,
            Stage::Closed,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::NotStarted => "not_started",
            Stage::Drafting => "drafting",
            Stage::ReadyToSend => "ready_to_send",
            Stage::FollowUpDue => "follow_up_due",
            Stage::Paused => "paused",
            Stage::Responded => "responded",
            Stage::Booked => "booked",
            Stage::Closed => "closed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::error::OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Stage::NotStarted),
            "drafting" => Ok(Stage::Drafting),
            "ready_to_send" => Ok(Stage::ReadyToSend),
            "follow_up_due" => Ok(Stage::FollowUpDue),
            "paused" => Ok(Stage::Paused),
            "responded" => Ok(Stage::Responded),
            "booked" => Ok(Stage::Booked),
            "closed" => Ok(Stage::Closed),
            _ => Err(crate::error::OutreachError::InvalidStage(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    NoResponse,
    NotInterested,
    InterestedNotBooked,
    Booked,
    OptedOut,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::NoResponse => "no_response",
            ResponseType::NotInterested => "not_interested",
            ResponseType::InterestedNotBooked => "interested_not_booked",
            ResponseType::Booked => "booked",
            ResponseType::OptedOut => "opted_out",
        }
    }

    /// Sequence template for campaigns with this response classification.
    ///
    /// An interested-but-not-booked contact moves to a nurture track; every
    /// other classification keeps the standard follow-up ladder.
    pub fn template(self) -> &'static [EmailType] {
        match self {
            ResponseType::InterestedNotBooked => &[EmailType::Initial, EmailType::Nurture],
            _ => &[
                EmailType::Initial,
                EmailType::FollowUp1,
                EmailType::FollowUp2,
                EmailType::FollowUp3,
            ],
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResponseType {
    type Err = crate::error::OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_response" => Ok(ResponseType::NoResponse),
            "not_interested" => Ok(ResponseType::NotInterested),
            "interested_not_booked" => Ok(ResponseType::InterestedNotBooked),
            "booked" => Ok(ResponseType::Booked),
            "opted_out" => Ok(ResponseType::OptedOut),
            _ => Err(crate::error::OutreachError::InvalidResponseType(
                s.to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// EmailType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailType {
    Initial,
    #[serde(rename = "follow_up_1")]
    FollowUp1,
    #[serde(rename = "follow_up_2")]
    FollowUp2,
    #[serde(rename = "follow_up_3")]
    FollowUp3,
    Nurture,
    Closing,
}

impl EmailType {
    pub fn all() -> &'static [EmailType] {
        &[
            EmailType::Initial,
            EmailType::FollowUp1,
            EmailType::FollowUp2,
            EmailType::FollowUp3,
            EmailType::Nurture,
            EmailType::Closing,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmailType::Initial => "initial",
            EmailType::FollowUp1 => "follow_up_1",
            EmailType::FollowUp2 => "follow_up_2",
            EmailType::FollowUp3 => "follow_up_3",
            EmailType::Nurture => "nurture",
            EmailType::Closing => "closing",
        }
    }
}

impl fmt::Display for EmailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmailType {
    type Err = crate::error::OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(EmailType::Initial),
            "follow_up_1" => Ok(EmailType::FollowUp1),
            "follow_up_2" => Ok(EmailType::FollowUp2),
            "follow_up_3" => Ok(EmailType::FollowUp3),
            "nurture" => Ok(EmailType::Nurture),
            "closing" => Ok(EmailType::Closing),
            _ => Err(crate::error::OutreachError::InvalidEmailType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// EmailStatus
// ---------------------------------------------------------------------------

/// Variant order is lifecycle order; the derived `Ord` is what makes the
/// forward-only checks in the state machine read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Draft,
    Scheduled,
    Sent,
    Opened,
    Replied,
}

impl EmailStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailStatus::Draft => "draft",
            EmailStatus::Scheduled => "scheduled",
            EmailStatus::Sent => "sent",
            EmailStatus::Opened => "opened",
            EmailStatus::Replied => "replied",
        }
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmailStatus {
    type Err = crate::error::OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EmailStatus::Draft),
            "scheduled" => Ok(EmailStatus::Scheduled),
            "sent" => Ok(EmailStatus::Sent),
            "opened" => Ok(EmailStatus::Opened),
            "replied" => Ok(EmailStatus::Replied),
            _ => Err(crate::error::OutreachError::InvalidEmailStatus(
                s.to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Ordinal show classification. Informational to the sync core; carried so
/// edits to it replicate like any other descriptive field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    A,
    B,
    C,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::A => "a",
            Tier::B => "b",
            Tier::C => "c",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = crate::error::OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Tier::A),
            "b" => Ok(Tier::B),
            "c" => Ok(Tier::C),
            _ => Err(crate::error::OutreachError::InvalidTier(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
