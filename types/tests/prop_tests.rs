use proptest::prelude::*;

use tabcoin_types::{
    BalanceEvent, BalanceType, ContentId, EventId, NewBalanceEvent, Originator, RecipientId,
    Timestamp, TransactionId, UserId, VoteKind, VoteRequest,
};

fn balance_type() -> impl Strategy<Value = BalanceType> {
    prop::sample::select(BalanceType::ALL.to_vec())
}

proptest! {
    /// TransactionId roundtrip: new -> as_bytes produces identical bytes.
    #[test]
    fn transaction_id_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = TransactionId::new(bytes);
        prop_assert_eq!(id.as_bytes(), &bytes);
        prop_assert_eq!(id.is_zero(), bytes == [0u8; 32]);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// A timestamp expires exactly `window` seconds after it, never earlier.
    #[test]
    fn expiry_matches_elapsed(
        start in 0u64..1_000_000,
        window in 0u64..1_000_000,
        now in 0u64..2_000_000,
    ) {
        let t = Timestamp::new(start);
        let expired = t.has_expired(window, Timestamp::new(now));
        prop_assert_eq!(expired, now >= start + window);
    }

    /// The window start is the last second that has not yet expired.
    #[test]
    fn window_cutoff_is_last_live_second(now in 0u64..2_000_000, window in 1u64..1_000_000) {
        let now = Timestamp::new(now);
        let cutoff = now.saturating_sub_secs(window);
        if now.as_secs() >= window {
            prop_assert!(cutoff.has_expired(window, now));
            prop_assert!(!cutoff.saturating_add_secs(1).has_expired(window, now));
        } else {
            prop_assert_eq!(cutoff, Timestamp::EPOCH);
            prop_assert!(!cutoff.has_expired(window, now));
        }
    }

    /// Balance type string form parses back to itself.
    #[test]
    fn balance_type_string_roundtrip(t in balance_type()) {
        prop_assert_eq!(t.to_string().parse::<BalanceType>().unwrap(), t);
    }

    /// Reasons are accepted exactly when their trimmed length is within 5..=255.
    #[test]
    fn debit_reason_bounds(core in "[a-zA-Z0-9]{0,300}", pad in 0usize..4) {
        let reason = format!("{}{}{}", " ".repeat(pad), core, " ".repeat(pad));
        let ok = VoteRequest::debit("voter", "content", reason).validate().is_ok();
        prop_assert_eq!(ok, (5..=255).contains(&core.len()));
    }

    /// Committed events survive a bincode roundtrip unchanged.
    #[test]
    fn event_bincode_roundtrip(
        id in any::<u64>(),
        t in balance_type(),
        amount in any::<i64>(),
        created in any::<u64>(),
        debit in any::<bool>(),
    ) {
        let kind = if debit { VoteKind::Debit } else { VoteKind::Credit };
        let event = NewBalanceEvent {
            balance_type: t,
            recipient: RecipientId::new("recipient"),
            amount,
            originator: Originator::Vote {
                voter: UserId::new("voter"),
                content: ContentId::new("content"),
                transaction: TransactionId::new([7; 32]),
                kind,
                reason: debit.then(|| "motivo válido".to_string()),
            },
            created_at: Timestamp::new(created),
        }
        .into_committed(EventId::new(id));
        let encoded = bincode::serialize(&event).unwrap();
        let decoded: BalanceEvent = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, event);
    }
}
