//! Inbound status message classification.
//!
//! The backend speaks JSON over the status channel in four recognized
//! shapes. Classification is an explicit tagged decode: a payload that
//! carries a recognized `type` but lacks that shape's required field is
//! rejected as unrecognized rather than silently falling through to the
//! per-task interpretation.

use serde_json::Value;

/// One classified inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    /// `{type: "meta", totalSegments: n}` — sets the known total and
    /// enables determinate progress display.
    Meta { total_segments: u32 },
    /// `{type: "progress", completedSegments: n}` — absolute snapshot,
    /// replaces the prior value.
    Progress { completed_segments: u32 },
    /// `{type: "failed", reason: "..."}` — terminal signal.
    Failed { reason: String },
    /// Any other object carrying a `taskId` field — one unit of work
    /// finished, for backends that emit per-task events.
    TaskDone { task_id: String },
    /// Unparseable or ambiguous payload. Logged by the caller, otherwise
    /// ignored; never an error.
    Unrecognized,
}

impl StatusMessage {
    /// Classify a raw inbound frame.
    pub fn classify(raw: &str) -> StatusMessage {
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return StatusMessage::Unrecognized;
        };
        let Some(obj) = value.as_object() else {
            return StatusMessage::Unrecognized;
        };

        match obj.get("type").and_then(Value::as_str) {
            Some("meta") => match obj.get("totalSegments").and_then(Value::as_u64) {
                Some(total) => StatusMessage::Meta {
                    total_segments: total as u32,
                },
                None => StatusMessage::Unrecognized,
            },
            Some("progress") => match obj.get("completedSegments").and_then(Value::as_u64) {
                Some(completed) => StatusMessage::Progress {
                    completed_segments: completed as u32,
                },
                None => StatusMessage::Unrecognized,
            },
            Some("failed") => match obj.get("reason").and_then(Value::as_str) {
                Some(reason) => StatusMessage::Failed {
                    reason: reason.to_string(),
                },
                None => StatusMessage::Unrecognized,
            },
            // No recognized type tag: a taskId field means one finished unit.
            _ => match obj.get("taskId") {
                Some(Value::String(id)) => StatusMessage::TaskDone {
                    task_id: id.clone(),
                },
                Some(Value::Number(id)) => StatusMessage::TaskDone {
                    task_id: id.to_string(),
                },
                _ => StatusMessage::Unrecognized,
            },
        }
    }
}

/// Classification of an explicit backend failure reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The single transient class eligible for automatic resubmission.
    Retryable,
    /// Everything else: fail immediately, no retry.
    Terminal,
}

/// Classify a backend failure reason.
///
/// Only the "container died" family is retryable: case-insensitive, any
/// separator, accepting variants that contain both "container" and a "die"
/// stem (`container_died`, "Container Died", "container dying", ...).
pub fn classify_failure_reason(reason: &str) -> FailureClass {
    let lower = reason.to_lowercase();
    if lower.contains("container") && (lower.contains("die") || lower.contains("dying")) {
        FailureClass::Retryable
    } else {
        FailureClass::Terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_meta() {
        let msg = StatusMessage::classify(r#"{"type":"meta","totalSegments":4}"#);
        assert_eq!(msg, StatusMessage::Meta { total_segments: 4 });
    }

    #[test]
    fn test_classify_progress() {
        let msg = StatusMessage::classify(r#"{"type":"progress","completedSegments":3}"#);
        assert_eq!(
            msg,
            StatusMessage::Progress {
                completed_segments: 3
            }
        );
    }

    #[test]
    fn test_classify_failed() {
        let msg = StatusMessage::classify(r#"{"type":"failed","reason":"disk full"}"#);
        assert_eq!(
            msg,
            StatusMessage::Failed {
                reason: "disk full".to_string()
            }
        );
    }

    #[test]
    fn test_classify_task_done() {
        let msg = StatusMessage::classify(r#"{"taskId":"task-7","videoId":"v1"}"#);
        assert_eq!(
            msg,
            StatusMessage::TaskDone {
                task_id: "task-7".to_string()
            }
        );

        let msg = StatusMessage::classify(r#"{"taskId":12}"#);
        assert_eq!(
            msg,
            StatusMessage::TaskDone {
                task_id: "12".to_string()
            }
        );
    }

    #[test]
    fn test_recognized_type_missing_field_is_rejected() {
        // Ambiguous shapes must not fall through to another interpretation.
        assert_eq!(
            StatusMessage::classify(r#"{"type":"meta","taskId":"t1"}"#),
            StatusMessage::Unrecognized
        );
        assert_eq!(
            StatusMessage::classify(r#"{"type":"progress"}"#),
            StatusMessage::Unrecognized
        );
        assert_eq!(
            StatusMessage::classify(r#"{"type":"failed"}"#),
            StatusMessage::Unrecognized
        );
    }

    #[test]
    fn test_unknown_type_with_task_id_is_task_done() {
        let msg = StatusMessage::classify(r#"{"type":"task-update","taskId":"t9"}"#);
        assert_eq!(
            msg,
            StatusMessage::TaskDone {
                task_id: "t9".to_string()
            }
        );
    }

    #[test]
    fn test_non_json_and_non_object_are_unrecognized() {
        assert_eq!(StatusMessage::classify("hello"), StatusMessage::Unrecognized);
        assert_eq!(StatusMessage::classify("[1,2]"), StatusMessage::Unrecognized);
        assert_eq!(StatusMessage::classify("42"), StatusMessage::Unrecognized);
    }

    #[test]
    fn test_retryable_reason_variants() {
        assert_eq!(
            classify_failure_reason("container died"),
            FailureClass::Retryable
        );
        assert_eq!(
            classify_failure_reason("Container Died"),
            FailureClass::Retryable
        );
        assert_eq!(
            classify_failure_reason("container_died"),
            FailureClass::Retryable
        );
        assert_eq!(
            classify_failure_reason("upload container dying on node-3"),
            FailureClass::Retryable
        );
        assert_eq!(
            classify_failure_reason("CONTAINER  DIED"),
            FailureClass::Retryable
        );
    }

    #[test]
    fn test_terminal_reasons() {
        assert_eq!(classify_failure_reason("disk full"), FailureClass::Terminal);
        assert_eq!(classify_failure_reason("died"), FailureClass::Terminal);
        assert_eq!(
            classify_failure_reason("container evicted"),
            FailureClass::Terminal
        );
    }
}
