#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tabcoin_types::{ValidationError, VoteKind, VoteRequest};

#[derive(Debug, Arbitrary)]
struct Input {
    voter: String,
    content: String,
    debit: bool,
    reason: Option<String>,
    raw_json: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let request = VoteRequest {
        voter: input.voter.into(),
        content: input.content.into(),
        kind: if input.debit {
            VoteKind::Debit
        } else {
            VoteKind::Credit
        },
        reason: input.reason,
    };

    match request.validate() {
        Ok(()) => {
            assert!(request.voter.is_valid() && request.content.is_valid());
            if request.kind == VoteKind::Debit {
                assert!(request.reason.is_some());
            }
        }
        Err(ValidationError::MissingReason) => {
            assert_eq!(request.kind, VoteKind::Debit);
            assert!(request.reason.is_none());
        }
        Err(_) => {}
    }

    // Requests arriving as JSON must never panic the parser or the validator.
    if let Ok(parsed) = serde_json::from_slice::<VoteRequest>(&input.raw_json) {
        let _ = parsed.validate();
    }
});
