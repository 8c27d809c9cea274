/*!
 * Tests for cue index lookup over sorted cue lists
 */

use captrace::cue::{Cue, CueSource, cue_index_at, find_cue_at};

fn timeline() -> Vec<Cue> {
    vec![
        Cue::new("a", 0, 900, CueSource::Full),
        Cue::new("b", 1000, 2400, CueSource::Full),
        Cue::new("c", 2500, 2505, CueSource::Full),
        Cue::new("d", 2510, 4000, CueSource::Full),
    ]
}

#[test]
fn test_cue_index_at_withTimeBetweenCues_shouldReturnPrecedingCue() {
    let cues = timeline();
    assert_eq!(cue_index_at(&cues, 1500), 1);
    assert_eq!(cue_index_at(&cues, 2509), 2);
}

#[test]
fn test_cue_index_at_withExactStarts_shouldReturnThatCue() {
    let cues = timeline();
    assert_eq!(cue_index_at(&cues, 0), 0);
    assert_eq!(cue_index_at(&cues, 1000), 1);
    assert_eq!(cue_index_at(&cues, 2500), 2);
    assert_eq!(cue_index_at(&cues, 2510), 3);
}

#[test]
fn test_cue_index_at_withEmptyList_shouldReturnMinusOne() {
    assert_eq!(cue_index_at(&[], 0), -1);
    assert_eq!(cue_index_at(&[], u64::MAX), -1);
}

#[test]
fn test_cue_index_at_beforeFirstCue_shouldReturnMinusOne() {
    // Documented boundary choice: no clamp to index 0
    let cues = vec![Cue::new("late start", 500, 900, CueSource::Full)];
    assert_eq!(cue_index_at(&cues, 0), -1);
    assert_eq!(cue_index_at(&cues, 499), -1);
    assert_eq!(cue_index_at(&cues, 500), 0);
}

#[test]
fn test_cue_index_at_pastLastCue_shouldStickToLastIndex() {
    let cues = timeline();
    assert_eq!(cue_index_at(&cues, 4000), 3);
    assert_eq!(cue_index_at(&cues, u64::MAX), 3);
}

#[test]
fn test_find_cue_at_shouldAgreeWithIndexLookup() {
    let cues = timeline();
    for at in [0u64, 450, 999, 1000, 2499, 2500, 2510, 9999] {
        let idx = cue_index_at(&cues, at);
        let found = find_cue_at(&cues, at);
        if idx < 0 {
            assert!(found.is_none());
        } else {
            assert_eq!(found, cues.get(idx as usize));
        }
    }
}

#[test]
fn test_cue_index_at_overLargeList_shouldMatchLinearScan() {
    let cues: Vec<Cue> = (0..500u64)
        .map(|i| Cue::new(format!("cue {}", i), i * 700, i * 700 + 650, CueSource::Full))
        .collect();

    for at in (0..350_000u64).step_by(9_973) {
        let expected = cues
            .iter()
            .rposition(|c| c.start_ms <= at)
            .map(|i| i as isize)
            .unwrap_or(-1);
        assert_eq!(cue_index_at(&cues, at), expected, "at={}", at);
    }
}
