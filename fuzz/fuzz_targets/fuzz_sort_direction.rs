#![no_main]

//! Arbitrary text through `SortDirection::from_str`: parsing never panics,
//! accepted input round-trips through `Display`, and rejected input is
//! echoed back in the error.

use libfuzzer_sys::fuzz_target;
use tabula_runtime::{SortDirection, TableError};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    match text.parse::<SortDirection>() {
        Ok(direction) => {
            assert_eq!(direction.to_string().parse::<SortDirection>(), Ok(direction));
            assert_eq!(direction.cycle().cycle().cycle(), direction);
        }
        Err(TableError::InvalidSortDirection(echo)) => assert_eq!(echo, text),
    }
});
