//! Domain-specific assertion macros for welfare-board harnesses.
//!
//! These wrap `pretty_assertions` and say which board rule was broken, so a
//! failing harness reads like a net-control log rather than a bare diff.

// ---------------------------------------------------------------------------
// Board assertions
// ---------------------------------------------------------------------------

/// Assert that a station's current status on the board matches.
///
/// ```rust
/// assert_station!(board, "KK4ODA", Status::Safe);
/// ```
#[macro_export]
macro_rules! assert_station {
    ($board:expr, $callsign:expr, $status:expr) => {{
        let callsign: &str = $callsign;
        match $board.entry(callsign) {
            Some(entry) => pretty_assertions::assert_eq!(
                entry.current.status,
                $status,
                "assert_station! failed: {} has the wrong status",
                callsign
            ),
            None => panic!(
                "assert_station! failed: {} is not on the board ({} entries)",
                callsign,
                $board.len()
            ),
        }
    }};
}

/// Assert the board's callsigns, in snapshot order.
#[macro_export]
macro_rules! assert_board_order {
    ($snapshot:expr, [$($callsign:expr),* $(,)?]) => {{
        let snapshot = &$snapshot;
        let actual: Vec<&str> = snapshot
            .entries
            .iter()
            .map(|e| e.current.callsign.as_str())
            .collect();
        let expected: Vec<&str> = vec![$($callsign),*];
        pretty_assertions::assert_eq!(actual, expected, "assert_board_order! failed");
    }};
}

// ---------------------------------------------------------------------------
// Validation assertions
// ---------------------------------------------------------------------------

/// Assert that a validation error names exactly these missing fields, in
/// canonical order.
///
/// ```rust
/// assert_missing!(err, [Field::Name, Field::Location]);
/// ```
#[macro_export]
macro_rules! assert_missing {
    ($err:expr, [$($field:expr),* $(,)?]) => {{
        let expected: Vec<welfare_board::Field> = vec![$($field),*];
        pretty_assertions::assert_eq!(
            $err.missing_fields(),
            expected,
            "assert_missing! failed: wrong set of missing fields in {}",
            $err
        );
    }};
}

// ---------------------------------------------------------------------------
// File assertions
// ---------------------------------------------------------------------------

/// Assert that a directory contains exactly these file names (sorted).
#[macro_export]
macro_rules! assert_dir_files {
    ($dir:expr, [$($name:expr),* $(,)?]) => {{
        let mut expected: Vec<String> = vec![$($name.to_string()),*];
        expected.sort();
        pretty_assertions::assert_eq!(
            $crate::common::Scratch::files_in($dir.as_ref()),
            expected,
            "assert_dir_files! failed for {}",
            std::path::Path::display($dir.as_ref())
        );
    }};
}
