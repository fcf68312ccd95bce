#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Event rows are bincode on disk; a corrupt row must fail cleanly.
    let _ = bincode::deserialize::<tabcoin_types::BalanceEvent>(data);
    let _ = bincode::deserialize::<tabcoin_types::Originator>(data);
    let _ = bincode::deserialize::<tabcoin_types::BalanceType>(data);

    // A row that decodes must re-encode to an equal event.
    if let Ok(event) = bincode::deserialize::<tabcoin_types::BalanceEvent>(data) {
        let encoded = bincode::serialize(&event).expect("decoded event must encode");
        let again: tabcoin_types::BalanceEvent =
            bincode::deserialize(&encoded).expect("re-encoded event must decode");
        assert_eq!(again, event);
    }
});
