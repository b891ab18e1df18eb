use super::if_higher_term_found;
use super::is_target_log_more_recent;

#[test]
fn test_if_higher_term_found() {
    assert!(if_higher_term_found(1, 2));
    assert!(!if_higher_term_found(2, 2));
    assert!(!if_higher_term_found(3, 2));
}

/// # Case 1: greater last term wins regardless of length
#[test]
fn test_is_target_log_more_recent_case1() {
    assert!(is_target_log_more_recent(2, 1, 2, 2));
    assert!(is_target_log_more_recent(10, 1, 1, 2));
}

/// # Case 2: same last term, longer or equal log wins
#[test]
fn test_is_target_log_more_recent_case2() {
    assert!(is_target_log_more_recent(3, 2, 3, 2));
    assert!(is_target_log_more_recent(3, 2, 4, 2));
    assert!(!is_target_log_more_recent(3, 2, 2, 2));
}

/// # Case 3: lower last term loses
#[test]
fn test_is_target_log_more_recent_case3() {
    assert!(!is_target_log_more_recent(1, 3, 9, 2));
}

/// # Case 4: empty logs on both sides
#[test]
fn test_is_target_log_more_recent_case4() {
    assert!(is_target_log_more_recent(0, 0, 0, 0));
}
