// Trade proposals and their status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::evaluator::{NeedDelta, SidePair};
use crate::error::EngineError;
use crate::model::{Player, Position};

/// How the generator filters candidate packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Neither team's need may worsen; value loss within tolerance.
    #[default]
    Balanced,
    /// Neither team may lose aggregate value.
    Strict,
}

impl GenerationMode {
    pub fn label(&self) -> &'static str {
        match self {
            GenerationMode::Balanced => "balanced",
            GenerationMode::Strict => "strict",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Give,
    Get,
}

/// A player moving in a proposal, from the proposing team's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeItem {
    pub direction: Direction,
    pub player_id: String,
    pub player_name: String,
    pub position: Position,
    pub value: f64,
}

impl TradeItem {
    pub fn from_player(direction: Direction, player: &Player) -> Self {
        TradeItem {
            direction,
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            position: player.position,
            value: player.value_or_zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Accepted,
    Declined,
    Countered,
}

impl ProposalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Sent => "sent",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Declined => "declined",
            ProposalStatus::Countered => "countered",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProposalStatus::Draft),
            "sent" => Some(ProposalStatus::Sent),
            "accepted" => Some(ProposalStatus::Accepted),
            "declined" => Some(ProposalStatus::Declined),
            "countered" => Some(ProposalStatus::Countered),
            _ => None,
        }
    }

    /// Accepted and declined proposals are closed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Accepted | ProposalStatus::Declined)
    }

    /// Legal moves: draft -> sent -> accepted | declined | countered, and a
    /// countered proposal may be sent again.
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (Draft, Sent)
                | (Sent, Accepted)
                | (Sent, Declined)
                | (Sent, Countered)
                | (Countered, Sent)
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A recorded status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub proposal_id: String,
    pub from: ProposalStatus,
    pub to: ProposalStatus,
    pub at: DateTime<Utc>,
}

/// A candidate or persisted trade between two teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeProposal {
    pub id: String,
    pub from_team: String,
    pub to_team: String,
    pub to_team_name: String,
    pub items: Vec<TradeItem>,
    /// Value change per side; `team_a` is `from_team`.
    pub value_delta: SidePair<f64>,
    pub need_delta: SidePair<NeedDelta>,
    pub fairness_score: f64,
    pub rationale: String,
    pub generation_mode: GenerationMode,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

impl TradeProposal {
    /// Stable id derived from the teams and the players involved.
    pub fn make_id(from_team: &str, to_team: &str, items: &[TradeItem]) -> String {
        let mut gives: Vec<&str> = items
            .iter()
            .filter(|i| i.direction == Direction::Give)
            .map(|i| i.player_id.as_str())
            .collect();
        let mut gets: Vec<&str> = items
            .iter()
            .filter(|i| i.direction == Direction::Get)
            .map(|i| i.player_id.as_str())
            .collect();
        gives.sort_unstable();
        gets.sort_unstable();
        format!("{from_team}>{to_team}:{}/{}", gives.join("+"), gets.join("+"))
    }

    pub fn gives(&self) -> impl Iterator<Item = &TradeItem> {
        self.items.iter().filter(|i| i.direction == Direction::Give)
    }

    pub fn gets(&self) -> impl Iterator<Item = &TradeItem> {
        self.items.iter().filter(|i| i.direction == Direction::Get)
    }

    /// Move to `next`, returning the event to record.
    pub fn transition(
        &mut self,
        next: ProposalStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusEvent, EngineError> {
        if !self.status.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        let event = StatusEvent {
            proposal_id: self.id.clone(),
            from: self.status,
            to: next,
            at,
        };
        self.status = next;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::fixed_time;

    fn item(direction: Direction, id: &str) -> TradeItem {
        TradeItem {
            direction,
            player_id: id.into(),
            player_name: id.to_uppercase(),
            position: Position::WideReceiver,
            value: 10.0,
        }
    }

    fn proposal() -> TradeProposal {
        let items = vec![
            item(Direction::Give, "b"),
            item(Direction::Give, "a"),
            item(Direction::Get, "c"),
        ];
        TradeProposal {
            id: TradeProposal::make_id("t1", "t2", &items),
            from_team: "t1".into(),
            to_team: "t2".into(),
            to_team_name: "Team Two".into(),
            items,
            value_delta: SidePair {
                team_a: -10.0,
                team_b: 10.0,
            },
            need_delta: SidePair {
                team_a: NeedDelta::default(),
                team_b: NeedDelta::default(),
            },
            fairness_score: 0.4,
            rationale: "test".into(),
            generation_mode: GenerationMode::Balanced,
            status: ProposalStatus::Draft,
            created_at: fixed_time(),
        }
    }

    #[test]
    fn id_is_order_independent() {
        let p = proposal();
        assert_eq!(p.id, "t1>t2:a+b/c");
        assert_eq!(p.gives().count(), 2);
        assert_eq!(p.gets().count(), 1);
    }

    #[test]
    fn full_lifecycle_records_events() {
        let mut p = proposal();
        let sent = p.transition(ProposalStatus::Sent, fixed_time()).unwrap();
        assert_eq!(sent.from, ProposalStatus::Draft);
        assert_eq!(sent.to, ProposalStatus::Sent);

        p.transition(ProposalStatus::Countered, fixed_time()).unwrap();
        p.transition(ProposalStatus::Sent, fixed_time()).unwrap();
        let accepted = p.transition(ProposalStatus::Accepted, fixed_time()).unwrap();
        assert_eq!(accepted.proposal_id, p.id);
        assert!(p.status.is_terminal());
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let mut p = proposal();
        p.transition(ProposalStatus::Sent, fixed_time()).unwrap();
        p.transition(ProposalStatus::Declined, fixed_time()).unwrap();
        match p.transition(ProposalStatus::Sent, fixed_time()) {
            Err(EngineError::InvalidTransition { from, to }) => {
                assert_eq!(from, "declined");
                assert_eq!(to, "sent");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(p.status, ProposalStatus::Declined);
    }

    #[test]
    fn draft_cannot_be_accepted_directly() {
        let mut p = proposal();
        assert!(p.transition(ProposalStatus::Accepted, fixed_time()).is_err());
        assert_eq!(p.status, ProposalStatus::Draft);
    }

    #[test]
    fn status_labels_round_trip() {
        for s in [
            ProposalStatus::Draft,
            ProposalStatus::Sent,
            ProposalStatus::Accepted,
            ProposalStatus::Declined,
            ProposalStatus::Countered,
        ] {
            assert_eq!(ProposalStatus::from_label(s.label()), Some(s));
        }
        let json = serde_json::to_string(&GenerationMode::Strict).unwrap();
        assert_eq!(json, "\"strict\"");
    }
}
