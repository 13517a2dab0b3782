// src/pass_detection.rs
//
// Classifies confirmed possession changes as passes or interceptions, and
// tallies team ball control. Driven purely by the possession stream and the
// externally supplied team labels; runs as a single ordered scan carrying
// the last confirmed possessor.

use crate::types::{ExchangeEvent, ExchangeKind, PlayerId, TeamId};
use std::collections::HashMap;
use tracing::{info, warn};

/// Detect every pass and interception in a possession stream.
///
/// A change between two non-none confirmed possessors A→B emits exactly one
/// event: a pass when both belong to the same team, an interception
/// otherwise. The passer's team at the passer's last confirmed frame is
/// authoritative when the endpoint labels disagree. Transitions to or from
/// "no possessor" emit nothing — a loose or out-of-play ball is not a pass.
pub fn detect_exchanges(
    possession: &[Option<PlayerId>],
    teams: &[HashMap<PlayerId, TeamId>],
) -> Vec<ExchangeEvent> {
    let mut events = Vec::new();
    let mut last: Option<(PlayerId, usize)> = None;

    for (frame, record) in possession.iter().enumerate() {
        let player = match record {
            Some(p) => *p,
            None => continue,
        };

        if let Some((prev_player, prev_frame)) = last {
            if prev_player != player {
                let from_team = teams.get(prev_frame).and_then(|m| m.get(&prev_player));
                let to_team = teams.get(frame).and_then(|m| m.get(&player));

                match (from_team, to_team) {
                    (Some(&from_team), Some(&to_team)) => {
                        let kind = if from_team == to_team {
                            ExchangeKind::Pass
                        } else {
                            ExchangeKind::Interception
                        };
                        info!(
                            "{}: {} (team {}) → {} (team {}) at frames {}..{}",
                            kind.as_str(),
                            prev_player,
                            from_team,
                            player,
                            to_team,
                            prev_frame,
                            frame
                        );
                        events.push(ExchangeEvent {
                            kind,
                            start_frame: prev_frame,
                            end_frame: frame,
                            from_player: prev_player,
                            to_player: player,
                            from_team,
                            to_team,
                        });
                    }
                    _ => {
                        warn!(
                            "possession change {} → {} at frame {} skipped: missing team label",
                            prev_player, player, frame
                        );
                    }
                }
            }
        }

        last = Some((player, frame));
    }

    events
}

/// Per-frame team in control plus cumulative control shares.
#[derive(Debug, Clone)]
pub struct TeamControl {
    /// Team of the controlling player, carried across no-possession frames
    /// by the last confirmed possessor. None until first confirmation or
    /// when the possessor has no team label.
    pub per_frame: Vec<Option<TeamId>>,
    /// Fraction of attributed frames controlled by team 0 and team 1.
    pub shares: [f32; 2],
}

/// Derive team ball control from the possession stream and team labels.
pub fn team_control(
    possession: &[Option<PlayerId>],
    teams: &[HashMap<PlayerId, TeamId>],
) -> TeamControl {
    let mut per_frame = Vec::with_capacity(possession.len());
    let mut carried: Option<TeamId> = None;
    let mut counts = [0usize; 2];

    for (frame, record) in possession.iter().enumerate() {
        if let Some(player) = record {
            match teams.get(frame).and_then(|m| m.get(player)) {
                Some(&team) if (team as usize) < 2 => carried = Some(team),
                _ => {}
            }
        }
        if let Some(team) = carried {
            counts[team as usize] += 1;
        }
        per_frame.push(carried);
    }

    let attributed = (counts[0] + counts[1]).max(1);
    TeamControl {
        per_frame,
        shares: [
            counts[0] as f32 / attributed as f32,
            counts[1] as f32 / attributed as f32,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_teams(len: usize, labels: &[(PlayerId, TeamId)]) -> Vec<HashMap<PlayerId, TeamId>> {
        (0..len).map(|_| labels.iter().copied().collect()).collect()
    }

    #[test]
    fn test_same_team_change_is_a_pass() {
        let possession = vec![Some(1), Some(1), Some(1), Some(2), Some(2)];
        let teams = uniform_teams(5, &[(1, 0), (2, 0)]);

        let events = detect_exchanges(&possession, &teams);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ExchangeKind::Pass);
        assert_eq!(events[0].from_player, 1);
        assert_eq!(events[0].to_player, 2);
        assert_eq!(events[0].start_frame, 2);
        assert_eq!(events[0].end_frame, 3);
    }

    #[test]
    fn test_cross_team_change_is_an_interception() {
        let possession = vec![Some(1), Some(1), Some(9), Some(9)];
        let teams = uniform_teams(4, &[(1, 0), (9, 1)]);

        let events = detect_exchanges(&possession, &teams);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ExchangeKind::Interception);
        assert_eq!(events[0].from_team, 0);
        assert_eq!(events[0].to_team, 1);
    }

    #[test]
    fn test_none_gap_between_same_possessor_emits_nothing() {
        let possession = vec![Some(1), Some(1), None, None, None, Some(1)];
        let teams = uniform_teams(6, &[(1, 0)]);

        let events = detect_exchanges(&possession, &teams);
        assert!(events.is_empty());
    }

    #[test]
    fn test_none_to_player_emits_nothing() {
        let possession = vec![None, None, Some(4), Some(4), None];
        let teams = uniform_teams(5, &[(4, 1)]);

        let events = detect_exchanges(&possession, &teams);
        assert!(events.is_empty());
    }

    #[test]
    fn test_change_across_gap_still_classified() {
        // P loses the ball, detection drops out, Q comes up with it.
        let possession = vec![Some(1), Some(1), None, None, Some(9), Some(9)];
        let teams = uniform_teams(6, &[(1, 0), (9, 1)]);

        let events = detect_exchanges(&possession, &teams);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ExchangeKind::Interception);
        assert_eq!(events[0].start_frame, 1);
        assert_eq!(events[0].end_frame, 4);
    }

    #[test]
    fn test_passer_team_at_last_confirmed_frame_is_authoritative() {
        // Player 1's label glitches to team 1 at the handover frame; the
        // label at its last confirmed frame (team 0) decides.
        let possession = vec![Some(1), Some(1), Some(2), Some(2)];
        let mut teams = uniform_teams(4, &[(1, 0), (2, 0)]);
        teams[2].insert(1, 1);
        teams[3].insert(1, 1);

        let events = detect_exchanges(&possession, &teams);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ExchangeKind::Pass);
        assert_eq!(events[0].from_team, 0);
    }

    #[test]
    fn test_events_partition_confirmed_changes() {
        let possession = vec![
            Some(1),
            Some(2),
            Some(9),
            None,
            Some(9),
            Some(1),
        ];
        let teams = uniform_teams(6, &[(1, 0), (2, 0), (9, 1)]);

        let events = detect_exchanges(&possession, &teams);

        // Three changes between non-none possessors: 1→2, 2→9, 9→1.
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, ExchangeKind::Pass);
        assert_eq!(events[1].kind, ExchangeKind::Interception);
        assert_eq!(events[2].kind, ExchangeKind::Interception);
    }

    #[test]
    fn test_missing_team_label_skips_event() {
        let possession = vec![Some(1), Some(2)];
        let teams = uniform_teams(2, &[(1, 0)]); // no label for player 2

        let events = detect_exchanges(&possession, &teams);
        assert!(events.is_empty());
    }

    #[test]
    fn test_team_control_carries_across_gaps() {
        let possession = vec![None, Some(1), Some(1), None, None, Some(9)];
        let teams = uniform_teams(6, &[(1, 0), (9, 1)]);

        let control = team_control(&possession, &teams);

        assert_eq!(control.per_frame[0], None);
        assert_eq!(control.per_frame[1], Some(0));
        // Carried through the no-possession gap.
        assert_eq!(control.per_frame[3], Some(0));
        assert_eq!(control.per_frame[4], Some(0));
        assert_eq!(control.per_frame[5], Some(1));

        // 4 frames team 0, 1 frame team 1.
        let total = control.shares[0] + control.shares[1];
        assert!((total - 1.0).abs() < 1e-6);
        assert!((control.shares[0] - 0.8).abs() < 1e-6);
    }
}
