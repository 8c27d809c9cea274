/*!
 * Tests for the rolling dedup window
 */

use captrace::dedup::{DEFAULT_DEDUP_WINDOW, DedupFilter};

#[test]
fn test_is_duplicate_withImmediateRepeat_shouldReturnFalseThenTrue() {
    let mut filter = DedupFilter::new();
    assert!(!filter.is_duplicate("hello"));
    assert!(filter.is_duplicate("hello"));
}

#[test]
fn test_is_duplicate_withinWindow_shouldStillFlagOlderText() {
    let mut filter = DedupFilter::new();
    assert!(!filter.is_duplicate("hello"));

    // Fewer than window-size distinct captions in between
    for i in 0..DEFAULT_DEDUP_WINDOW - 1 {
        assert!(!filter.is_duplicate(&format!("other {}", i)));
    }

    assert!(filter.is_duplicate("hello"));
}

#[test]
fn test_is_duplicate_afterTwelveDistinctTexts_shouldEvictOriginal() {
    let mut filter = DedupFilter::new();
    assert!(!filter.is_duplicate("hello"));

    for i in 0..DEFAULT_DEDUP_WINDOW {
        assert!(!filter.is_duplicate(&format!("caption {}", i)));
    }

    // "hello" was evicted and is accepted as new again
    assert!(!filter.is_duplicate("hello"));
}

#[test]
fn test_is_duplicate_withProgressiveRenderings_shouldTreatEachAsNew() {
    // The filter only suppresses exact repeats; growing re-emissions are
    // distinct here and merged later by the normalizer
    let mut filter = DedupFilter::new();
    assert!(!filter.is_duplicate("he"));
    assert!(!filter.is_duplicate("he said"));
    assert!(!filter.is_duplicate("he said hello"));
    assert!(filter.is_duplicate("he said"));
}

#[test]
fn test_with_capacity_withTinyWindow_shouldEvictQuickly() {
    let mut filter = DedupFilter::with_capacity(1);
    assert!(!filter.is_duplicate("a"));
    assert!(filter.is_duplicate("a"));
    assert!(!filter.is_duplicate("b"));
    assert!(!filter.is_duplicate("a"));
}
