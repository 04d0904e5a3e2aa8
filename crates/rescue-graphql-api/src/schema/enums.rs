//! # GraphQL Enum Types
//!
//! Enum definitions for the GraphQL schema.

use async_graphql::Enum;
use rescue_domain as domain;

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// Reported, awaiting dispatcher review
    Pending,
    /// Confirmed as genuine by a dispatcher
    Verified,
    /// Released to the driver pool for acceptance
    Dispatched,
    /// Claimed by exactly one responder
    Accepted,
    /// Closed out
    Resolved,
}

impl From<domain::AlertStatus> for AlertStatus {
    fn from(s: domain::AlertStatus) -> Self {
        match s {
            domain::AlertStatus::Pending => Self::Pending,
            domain::AlertStatus::Verified => Self::Verified,
            domain::AlertStatus::Dispatched => Self::Dispatched,
            domain::AlertStatus::Accepted => Self::Accepted,
            domain::AlertStatus::Resolved => Self::Resolved,
        }
    }
}

impl From<AlertStatus> for domain::AlertStatus {
    fn from(s: AlertStatus) -> Self {
        match s {
            AlertStatus::Pending => Self::Pending,
            AlertStatus::Verified => Self::Verified,
            AlertStatus::Dispatched => Self::Dispatched,
            AlertStatus::Accepted => Self::Accepted,
            AlertStatus::Resolved => Self::Resolved,
        }
    }
}

/// What happened to an alert, for subscription consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum AlertEventKind {
    /// A new alert entered the system
    Created,
    /// A dispatcher confirmed the alert
    Verified,
    /// The alert became visible to drivers
    Dispatched,
    /// A responder claimed the alert
    Accepted,
    /// The alert was closed by its assignee
    Resolved,
    /// The alert was closed administratively before acceptance
    AdminResolved,
}
