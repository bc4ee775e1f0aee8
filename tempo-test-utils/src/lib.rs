//! TEMPO Test Utilities
//!
//! Shared test infrastructure for the TEMPO workspace:
//! - Proptest generators for content, events and configuration
//! - Fixtures for a small editorial site with scheduled content
//! - Assertions for TEMPO error variants and tag sets

// Re-export mocks from their source crate
pub use tempo_storage::{
    ContentStore, MockContentStore, MockReferenceIndex, RecordRef, RecordingInvalidator,
    TemporalContentRepository,
};

// Re-export core types for convenience
pub use tempo_core::{
    ContentType, HarmonizationConfig, MonitorRegistry, TempoConfig, TempoError, TempoResult,
    TemporalContent, TemporalField, Timestamp, TransitionEvent, TransitionType,
    CONTENT_COLLECTION, PAGES_COLLECTION, SECONDS_PER_DAY,
};

use std::collections::BTreeSet;
use std::sync::Arc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating TEMPO values.

    use super::*;
    use proptest::prelude::*;

    /// Epoch seconds between 2020-01-01 and 2030-01-01.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        1_577_836_800i64..1_893_456_000i64
    }

    /// Seconds since midnight.
    pub fn arb_time_of_day() -> impl Strategy<Value = i64> {
        0i64..SECONDS_PER_DAY
    }

    /// A well-formed `"HH:MM"` slot.
    pub fn arb_slot() -> impl Strategy<Value = String> {
        (0u32..24, 0u32..60).prop_map(|(h, m)| format!("{:02}:{:02}", h, m))
    }

    /// Slot strings that the harmonization engine must reject.
    pub fn arb_malformed_slot() -> impl Strategy<Value = String> {
        prop_oneof![
            (24u32..100, 0u32..60).prop_map(|(h, m)| format!("{:02}:{:02}", h, m)),
            (0u32..24, 60u32..100).prop_map(|(h, m)| format!("{:02}:{:02}", h, m)),
            "[a-z]{1,8}",
            Just(String::new()),
        ]
    }

    /// Optional visibility window with `start < end` when both are set.
    pub fn arb_window() -> impl Strategy<Value = (Option<Timestamp>, Option<Timestamp>)> {
        (
            proptest::option::of(arb_timestamp()),
            proptest::option::of(1i64..30 * SECONDS_PER_DAY),
        )
            .prop_map(|(start, length)| match (start, length) {
                (Some(start), Some(length)) => (Some(start), Some(start + length)),
                (None, Some(length)) => (None, Some(1_577_836_800 + length)),
                (start, None) => (start, None),
            })
    }

    pub fn arb_page() -> impl Strategy<Value = TemporalContent> {
        (1i64..1_000, 0i64..100, arb_window(), any::<bool>()).prop_map(
            |(id, parent, (start, end), hidden)| {
                TemporalContent::page(id, parent)
                    .with_title(format!("Page {}", id))
                    .with_window(start, end)
                    .with_hidden(hidden)
            },
        )
    }

    pub fn arb_content_element() -> impl Strategy<Value = TemporalContent> {
        (1i64..1_000, 1i64..1_000, arb_window(), any::<bool>()).prop_map(
            |(id, page, (start, end), hidden)| {
                TemporalContent::content_element(id, page)
                    .with_window(start, end)
                    .with_hidden(hidden)
            },
        )
    }

    /// Page or content element with at least one temporal field.
    pub fn arb_temporal_content() -> impl Strategy<Value = TemporalContent> {
        prop_oneof![arb_page(), arb_content_element()]
            .prop_filter("needs a temporal field", TemporalContent::has_temporal_fields)
    }

    /// Event for one of the content's own boundaries.
    pub fn arb_transition_event() -> impl Strategy<Value = TransitionEvent> {
        arb_temporal_content().prop_map(|content| {
            let timestamp = content.start_time.or(content.end_time).unwrap_or_default();
            TransitionEvent::for_content(content, timestamp)
        })
    }

    /// Enabled harmonization with 1-6 valid slots.
    pub fn arb_harmonization_config() -> impl Strategy<Value = HarmonizationConfig> {
        (
            proptest::collection::vec(arb_slot(), 1..6),
            0i64..7_200,
        )
            .prop_map(|(slots, tolerance)| HarmonizationConfig::with_slots(slots, tolerance))
    }

    /// Configuration that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = TempoConfig> {
        (
            prop_oneof![Just("global"), Just("per-page"), Just("per-content")],
            prop_oneof![Just("dynamic"), Just("scheduler"), Just("hybrid")],
            1u64..7 * 86_400,
            any::<bool>(),
            arb_harmonization_config(),
        )
            .prop_map(|(scoping, timing, max_lifetime, use_index, harmonization)| {
                TempoConfig {
                    scoping_strategy: scoping.to_string(),
                    timing_strategy: timing.to_string(),
                    max_cache_lifetime: max_lifetime,
                    use_reference_index: use_index,
                    harmonization,
                    ..TempoConfig::default()
                }
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// 2023-11-14 00:00:00 UTC
    pub const MIDNIGHT: Timestamp = 1_699_920_000;

    /// Timestamp at `hour:minute` on the fixture day.
    pub fn at_time(hour: i64, minute: i64) -> Timestamp {
        MIDNIGHT + hour * 3_600 + minute * 60
    }

    /// Repository over `store` with the default registry.
    pub fn repository(store: Arc<MockContentStore>) -> TemporalContentRepository {
        TemporalContentRepository::new(store, Arc::new(MonitorRegistry::new()))
    }

    /// Empty store with its repository.
    pub fn empty_site() -> (Arc<MockContentStore>, TemporalContentRepository) {
        let store = Arc::new(MockContentStore::new());
        let repository = repository(store.clone());
        (store, repository)
    }

    /// Store seeded with `contents`, with its repository.
    pub fn site_with(
        contents: Vec<TemporalContent>,
    ) -> TempoResult<(Arc<MockContentStore>, TemporalContentRepository)> {
        let (store, repository) = empty_site();
        store.insert_all(contents)?;
        Ok((store, repository))
    }

    /// A small site on the fixture day:
    /// - page 1 "Home", always visible
    /// - page 2 "Campaign", visible 09:00 to 17:00
    /// - element 10 on page 1, starting 10:00
    /// - element 11 on page 2, ending 16:00
    /// - element 12 on page 1, hidden, starting 08:00
    pub fn editorial_site() -> TempoResult<(Arc<MockContentStore>, TemporalContentRepository)> {
        site_with(vec![
            TemporalContent::page(1, 0).with_title("Home"),
            TemporalContent::page(2, 1)
                .with_title("Campaign")
                .with_window(Some(at_time(9, 0)), Some(at_time(17, 0))),
            TemporalContent::content_element(10, 1).with_start_time(Some(at_time(10, 0))),
            TemporalContent::content_element(11, 2).with_end_time(Some(at_time(16, 0))),
            TemporalContent::content_element(12, 1)
                .with_start_time(Some(at_time(8, 0)))
                .with_hidden(true),
        ])
    }

    /// Enabled harmonization on the four quarter-day slots, one hour tolerance.
    pub fn quarter_day_harmonization() -> HarmonizationConfig {
        HarmonizationConfig::with_slots(["00:00", "06:00", "12:00", "18:00"], 3_600)
    }

    /// Tag set from string literals.
    pub fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for TEMPO results and tag sets.

    use super::*;

    /// Assert that a TempoResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &TempoResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a TempoResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &TempoResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &TempoResult<T>) {
        match result {
            Err(TempoError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &TempoResult<T>) {
        match result {
            Err(TempoError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &TempoResult<T>) {
        match result {
            Err(TempoError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that `actual` contains exactly the `expected` tags.
    #[track_caller]
    pub fn assert_tags(actual: &BTreeSet<String>, expected: &[&str]) {
        let expected = fixtures::tags(expected);
        assert_eq!(actual, &expected, "Tag set mismatch");
    }

    /// Assert that `covering` contains every tag of `required`.
    #[track_caller]
    pub fn assert_tags_cover(covering: &BTreeSet<String>, required: &BTreeSet<String>) {
        let missing: Vec<&String> = required.difference(covering).collect();
        assert!(missing.is_empty(), "Missing tags: {:?}", missing);
    }

    #[track_caller]
    pub fn assert_config_valid(config: &TempoConfig) {
        assert!(
            config.validate().is_ok(),
            "Config validation failed: {:?}",
            config.validate()
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_editorial_site_fixture() {
        let (store, repository) = fixtures::editorial_site().unwrap();
        assert_eq!(store.record_count(), 5);

        let all = repository.find_all(0, 0).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(
            repository
                .next_transition_uncached(fixtures::at_time(9, 30), 0, 0)
                .unwrap(),
            Some(fixtures::at_time(10, 0))
        );
    }

    #[test]
    fn test_at_time() {
        assert_eq!(fixtures::at_time(0, 0) % SECONDS_PER_DAY, 0);
        assert_eq!(fixtures::at_time(6, 30) - fixtures::MIDNIGHT, 23_400);
    }

    #[test]
    fn test_assert_tags() {
        let actual = fixtures::tags(&["pageId_1", "pageId_2"]);
        assertions::assert_tags(&actual, &["pageId_2", "pageId_1"]);
        assertions::assert_tags_cover(&actual, &fixtures::tags(&["pageId_1"]));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_config_is_valid(config in generators::arb_valid_config()) {
            assertions::assert_config_valid(&config);
        }

        #[test]
        fn prop_generated_window_is_ordered(content in generators::arb_temporal_content()) {
            prop_assert!(content.has_temporal_fields());
            if let (Some(start), Some(end)) = (content.start_time, content.end_time) {
                prop_assert!(start < end);
            }
        }

        #[test]
        fn prop_generated_event_matches_content(event in generators::arb_transition_event()) {
            prop_assert_ne!(event.transition_type(), TransitionType::Unknown);
        }
    }
}
