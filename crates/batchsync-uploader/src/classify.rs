// Outcome classification
//
// Rules, applied in order:
// 1. 2xx                        -> accepted
// 2. configured transient status -> transient
// 3. busy marker in the body     -> transient
// 4. 413                         -> fatal (shrink the batch size instead)
// 5. any other status            -> fatal
// 6. connect / network failure   -> transient
// 7. timeout                     -> transient
// Requests that could not be built are fatal.

use std::fmt;

use crate::policy::UploadPolicy;
use crate::transport::{DeliveryResult, FailureKind};

const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Accepted,
    Transient(String),
    Fatal(String),
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Accepted => write!(f, "accepted"),
            Classification::Transient(reason) => write!(f, "transient: {}", reason),
            Classification::Fatal(reason) => write!(f, "fatal: {}", reason),
        }
    }
}

pub fn classify(result: &DeliveryResult, policy: &UploadPolicy) -> Classification {
    let delivery = match result {
        Ok(delivery) => delivery,
        Err(failure) => {
            return match failure.kind {
                FailureKind::Timeout | FailureKind::Connect | FailureKind::Network => {
                    Classification::Transient(failure.to_string())
                }
                FailureKind::Invalid => Classification::Fatal(failure.to_string()),
            }
        }
    };

    if delivery.is_success() {
        return Classification::Accepted;
    }

    if policy.transient_statuses.contains(&delivery.status) {
        return Classification::Transient(format!("HTTP {}", delivery.status));
    }

    if let Some(marker) = policy
        .busy_markers
        .iter()
        .find(|marker| delivery.body.contains(marker.as_str()))
    {
        return Classification::Transient(format!(
            "destination busy ({}), HTTP {}",
            marker, delivery.status
        ));
    }

    if delivery.status == 413 {
        return Classification::Fatal(
            "HTTP 413 payload too large; reduce the batch size".to_string(),
        );
    }

    Classification::Fatal(format!(
        "HTTP {}: {}",
        delivery.status,
        excerpt(&delivery.body)
    ))
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Delivery, TransportFailure};

    fn policy() -> UploadPolicy {
        UploadPolicy::new("http://localhost:3000/api/sync/vendas").unwrap()
    }

    fn status(code: u16, body: &str) -> DeliveryResult {
        Ok(Delivery::new(code, body))
    }

    #[test]
    fn test_success_range_is_accepted() {
        assert_eq!(classify(&status(200, "{}"), &policy()), Classification::Accepted);
        assert_eq!(classify(&status(201, ""), &policy()), Classification::Accepted);
        // status wins over body sniffing
        assert_eq!(
            classify(&status(200, "SQLITE_BUSY"), &policy()),
            Classification::Accepted
        );
    }

    #[test]
    fn test_gateway_errors_are_transient() {
        for code in [502, 503, 504] {
            assert!(matches!(
                classify(&status(code, ""), &policy()),
                Classification::Transient(_)
            ));
        }
    }

    #[test]
    fn test_busy_marker_is_transient() {
        let result = status(500, r#"{"error":"SQLITE_BUSY: database is locked"}"#);
        let classification = classify(&result, &policy());
        assert_eq!(
            classification,
            Classification::Transient("destination busy (SQLITE_BUSY), HTTP 500".into())
        );
    }

    #[test]
    fn test_busy_marker_precedes_payload_too_large() {
        let result = status(413, "SQLITE_BUSY");
        assert!(matches!(
            classify(&result, &policy()),
            Classification::Transient(_)
        ));
    }

    #[test]
    fn test_payload_too_large_is_fatal() {
        let classification = classify(&status(413, "request entity too large"), &policy());
        assert!(matches!(classification, Classification::Fatal(ref r) if r.contains("413")));
    }

    #[test]
    fn test_other_statuses_are_fatal() {
        for code in [400, 401, 404, 500, 520] {
            assert!(matches!(
                classify(&status(code, "nope"), &policy()),
                Classification::Fatal(_)
            ));
        }
    }

    #[test]
    fn test_configured_transient_set_is_respected() {
        let policy = policy().with_transient_statuses(vec![520]);
        assert!(matches!(
            classify(&status(520, ""), &policy),
            Classification::Transient(_)
        ));
        assert!(matches!(
            classify(&status(503, ""), &policy),
            Classification::Fatal(_)
        ));
    }

    #[test]
    fn test_transport_failures() {
        for kind in [FailureKind::Timeout, FailureKind::Connect, FailureKind::Network] {
            let result: DeliveryResult = Err(TransportFailure::new(kind, "boom"));
            assert!(matches!(
                classify(&result, &policy()),
                Classification::Transient(_)
            ));
        }

        let result: DeliveryResult = Err(TransportFailure::new(FailureKind::Invalid, "bad"));
        assert!(matches!(
            classify(&result, &policy()),
            Classification::Fatal(_)
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(1_000);
        let Classification::Fatal(reason) = classify(&status(500, &body), &policy()) else {
            panic!("expected fatal");
        };
        assert!(reason.len() < 300);
        assert!(reason.ends_with('…'));
    }
}
