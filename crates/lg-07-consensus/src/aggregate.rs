//! # Weighted Aggregation
//!
//! Pure consensus math over revealed evidence rows. Every row's weight
//! is `v_trust × stake`; approval needs a strict majority of weight.
//!
//! The primary rejection reason is the reason string with the highest
//! SUMMED weight across deny votes (not the most common by count), with
//! placeholder strings filtered out and `"unknown"` as the fallback.

use std::collections::HashMap;

use shared_types::{ConsensusSnapshot, Decision, ValidationEvidence, PASS_REASON};

/// Reason strings that carry no information and never win selection.
const INVALID_REJECTION_REASONS: [&str; 5] =
    ["", "{}", "\"\"", "null", "{\"message\": \"pass\"}"];

/// The computed aggregate for one `(lead, epoch)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusAggregate {
    pub final_decision: Decision,
    pub final_rep_score: f64,
    pub primary_rejection_reason: String,
    pub validator_count: usize,
    pub consensus_weight: f64,
    pub approval_ratio: f64,
    /// Mode of `is_icp_multiplier` across approvers, first occurrence
    /// breaking ties.
    pub icp_multiplier: Option<f64>,
}

impl ConsensusAggregate {
    /// Snapshot form stored on the lead row.
    pub fn snapshot(&self, epoch_id: u64) -> ConsensusSnapshot {
        ConsensusSnapshot {
            epoch_id,
            final_decision: self.final_decision,
            final_rep_score: self.final_rep_score,
            primary_rejection_reason: self.primary_rejection_reason.clone(),
            validator_count: self.validator_count,
            consensus_weight: self.consensus_weight,
            approval_ratio: self.approval_ratio,
        }
    }
}

fn round(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Aggregate revealed rows. Returns `None` when no row is revealed; the
/// caller leaves the lead pending (never a default deny).
pub fn aggregate(rows: &[ValidationEvidence]) -> Option<ConsensusAggregate> {
    let revealed: Vec<&ValidationEvidence> =
        rows.iter().filter(|r| r.is_revealed()).collect();
    if revealed.is_empty() {
        return None;
    }

    let mut total_weight = 0.0;
    let mut weighted_rep = 0.0;
    let mut weighted_approval = 0.0;
    let mut reason_weights: HashMap<&str, f64> = HashMap::new();
    // Insertion order for deterministic tie-breaks.
    let mut reason_order: Vec<&str> = Vec::new();
    let mut icp_values: Vec<f64> = Vec::new();

    for row in &revealed {
        let weight = row.v_trust.unwrap_or(0.0) * row.stake.unwrap_or(0.0);
        total_weight += weight;
        weighted_rep += f64::from(row.rep_score.unwrap_or(0)) * weight;

        match row.decision {
            Some(Decision::Approve) => {
                weighted_approval += weight;
                if let Some(icp) = row
                    .evidence_blob
                    .get("is_icp_multiplier")
                    .and_then(|v| v.as_f64())
                {
                    icp_values.push(icp);
                }
            }
            Some(Decision::Deny) => {
                if let Some(reason) = row.rejection_reason.as_deref() {
                    if !INVALID_REJECTION_REASONS.contains(&reason) {
                        if !reason_weights.contains_key(reason) {
                            reason_order.push(reason);
                        }
                        *reason_weights.entry(reason).or_insert(0.0) += weight;
                    }
                }
            }
            None => {}
        }
    }

    let (final_rep, approval_ratio) = if total_weight > 0.0 {
        (weighted_rep / total_weight, weighted_approval / total_weight)
    } else {
        (0.0, 0.0)
    };

    let final_decision = if approval_ratio > 0.5 {
        Decision::Approve
    } else {
        Decision::Deny
    };

    let primary_rejection_reason = match final_decision {
        Decision::Approve => PASS_REASON.to_string(),
        Decision::Deny => {
            // Strictly-greater comparison over insertion order, so a
            // weight tie resolves to the first-seen reason.
            let mut best: Option<(&str, f64)> = None;
            for &reason in &reason_order {
                let weight = reason_weights.get(reason).copied().unwrap_or(0.0);
                if best.map_or(true, |(_, w)| weight > w) {
                    best = Some((reason, weight));
                }
            }
            best.map(|(r, _)| r.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        }
    };

    let final_rep_score = match final_decision {
        Decision::Approve => round(final_rep, 4),
        Decision::Deny => 0.0,
    };

    let icp_multiplier = match final_decision {
        Decision::Approve => mode_first_occurrence(&icp_values),
        Decision::Deny => None,
    };

    Some(ConsensusAggregate {
        final_decision,
        final_rep_score,
        primary_rejection_reason,
        validator_count: revealed.len(),
        consensus_weight: round(total_weight, 2),
        approval_ratio: round(approval_ratio, 4),
        icp_multiplier,
    })
}

/// Mode of a value list; ties broken by first occurrence. Values are
/// compared on their exact bit pattern (they come from identical blobs).
fn mode_first_occurrence(values: &[f64]) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for v in values {
        match counts.iter_mut().find(|(seen, _)| seen.to_bits() == v.to_bits()) {
            Some((_, count)) => *count += 1,
            None => counts.push((*v, 1)),
        }
    }
    // Strictly-greater comparison keeps the first-seen value on a
    // count tie.
    let mut best: Option<(f64, usize)> = None;
    for &(v, count) in &counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((v, count));
        }
    }
    best.map(|(v, _)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn row(
        decision: Decision,
        rep: u32,
        reason: &str,
        v_trust: f64,
        stake: f64,
        icp: Option<f64>,
    ) -> ValidationEvidence {
        let blob = match icp {
            Some(m) => json!({"is_icp_multiplier": m}),
            None => json!({}),
        };
        ValidationEvidence {
            evidence_id: Uuid::new_v4(),
            validator_hotkey: "5V".to_string(),
            lead_id: Uuid::nil(),
            epoch_id: 100,
            decision_hash: String::new(),
            rep_score_hash: String::new(),
            rejection_reason_hash: String::new(),
            evidence_blob: blob,
            decision: Some(decision),
            rep_score: Some(rep),
            rejection_reason: Some(reason.to_string()),
            salt: Some("00".to_string()),
            v_trust: Some(v_trust),
            stake: Some(stake),
            revealed_ts: None,
        }
    }

    #[test]
    fn test_zero_rows_is_none() {
        assert_eq!(aggregate(&[]), None);
        // Unrevealed rows do not count either.
        let mut unrevealed = row(Decision::Approve, 1, "pass", 1.0, 1.0, None);
        unrevealed.decision = None;
        assert_eq!(aggregate(&[unrevealed]), None);
    }

    #[test]
    fn test_single_approver() {
        let rows = vec![row(Decision::Approve, 42, "pass", 1.0, 10.0, None)];
        let agg = aggregate(&rows).unwrap();
        assert_eq!(agg.final_decision, Decision::Approve);
        assert_eq!(agg.approval_ratio, 1.0);
        assert_eq!(agg.final_rep_score, 42.0);
        assert_eq!(agg.primary_rejection_reason, "pass");
        assert_eq!(agg.validator_count, 1);
    }

    #[test]
    fn test_split_decision() {
        // V1 approve rep=40 weight=10; V2 deny weight=5 "email invalid";
        // V3 deny weight=6 "catch-all email".
        let rows = vec![
            row(Decision::Approve, 40, "pass", 1.0, 10.0, None),
            row(Decision::Deny, 0, "email invalid", 1.0, 5.0, None),
            row(Decision::Deny, 0, "catch-all email", 1.0, 6.0, None),
        ];
        let agg = aggregate(&rows).unwrap();
        assert_eq!(agg.consensus_weight, 21.0);
        assert_eq!(agg.final_decision, Decision::Deny);
        assert_eq!(agg.approval_ratio, round(10.0 / 21.0, 4));
        assert_eq!(agg.primary_rejection_reason, "catch-all email");
        assert_eq!(agg.final_rep_score, 0.0);
    }

    #[test]
    fn test_exact_half_is_deny() {
        // approval_ratio == 0.5 must NOT approve.
        let rows = vec![
            row(Decision::Approve, 10, "pass", 1.0, 5.0, None),
            row(Decision::Deny, 0, "bad", 1.0, 5.0, None),
        ];
        let agg = aggregate(&rows).unwrap();
        assert_eq!(agg.approval_ratio, 0.5);
        assert_eq!(agg.final_decision, Decision::Deny);
    }

    #[test]
    fn test_reason_weight_tie_keeps_first_seen() {
        let rows = vec![
            row(Decision::Deny, 0, "email invalid", 1.0, 5.0, None),
            row(Decision::Deny, 0, "catch-all email", 1.0, 5.0, None),
        ];
        let agg = aggregate(&rows).unwrap();
        assert_eq!(agg.primary_rejection_reason, "email invalid");
    }

    #[test]
    fn test_invalid_reasons_fall_back_to_unknown() {
        let rows = vec![
            row(Decision::Deny, 0, "", 1.0, 5.0, None),
            row(Decision::Deny, 0, "{}", 1.0, 6.0, None),
        ];
        let agg = aggregate(&rows).unwrap();
        assert_eq!(agg.primary_rejection_reason, "unknown");
    }

    #[test]
    fn test_zero_total_weight() {
        let rows = vec![row(Decision::Approve, 48, "pass", 0.0, 0.0, None)];
        let agg = aggregate(&rows).unwrap();
        assert_eq!(agg.approval_ratio, 0.0);
        assert_eq!(agg.final_decision, Decision::Deny);
        assert_eq!(agg.final_rep_score, 0.0);
    }

    #[test]
    fn test_icp_multiplier_mode() {
        let rows = vec![
            row(Decision::Approve, 40, "pass", 1.0, 10.0, Some(1.5)),
            row(Decision::Approve, 41, "pass", 1.0, 10.0, Some(2.0)),
            row(Decision::Approve, 42, "pass", 1.0, 10.0, Some(2.0)),
        ];
        let agg = aggregate(&rows).unwrap();
        assert_eq!(agg.icp_multiplier, Some(2.0));

        // Tie: first occurrence wins.
        let rows = vec![
            row(Decision::Approve, 40, "pass", 1.0, 10.0, Some(1.5)),
            row(Decision::Approve, 41, "pass", 1.0, 10.0, Some(2.0)),
        ];
        assert_eq!(aggregate(&rows).unwrap().icp_multiplier, Some(1.5));
    }

    #[test]
    fn test_weighted_rep_rounding() {
        let rows = vec![
            row(Decision::Approve, 40, "pass", 1.0, 2.0, None),
            row(Decision::Approve, 45, "pass", 1.0, 1.0, None),
        ];
        let agg = aggregate(&rows).unwrap();
        // (40*2 + 45*1) / 3 = 41.666666...
        assert_eq!(agg.final_rep_score, 41.6667);
    }
}
