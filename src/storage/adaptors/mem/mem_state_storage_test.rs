use crate::proto::LogEntry;
use crate::HardState;
use crate::MemStateStorage;
use crate::StateStorage;

#[test]
fn test_load_state_returns_none_when_nothing_saved() {
    let storage = MemStateStorage::new();
    assert!(storage.load_state().unwrap().is_none());
}

#[test]
fn test_save_state_overwrites_previous_state() {
    let storage = MemStateStorage::new();
    let log = vec![LogEntry::new(1, b"a".to_vec()), LogEntry::new(1, b"b".to_vec())];

    storage
        .save_state(
            &HardState {
                current_term: 1,
                voted_for: Some(2),
            },
            &log,
        )
        .unwrap();
    storage
        .save_state(
            &HardState {
                current_term: 2,
                voted_for: None,
            },
            &log[..1],
        )
        .unwrap();

    let state = storage.load_state().unwrap().unwrap();
    assert_eq!(state.hard_state.current_term, 2);
    assert_eq!(state.hard_state.voted_for, None);
    assert_eq!(state.log, vec![LogEntry::new(1, b"a".to_vec())]);
}
