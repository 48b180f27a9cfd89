//! Static state table (postal code, name, FIPS).
//!
//! Region codes are validated only by presence here. ZIP/county/metro lookups
//! live outside this crate.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub code: &'static str,
    pub name: &'static str,
    pub fips: &'static str,
}

const fn st(code: &'static str, name: &'static str, fips: &'static str) -> State {
    State { code, name, fips }
}

pub const STATES: [State; 51] = [
    st("AL", "Alabama", "01"),
    st("AK", "Alaska", "02"),
    st("AZ", "Arizona", "04"),
    st("AR", "Arkansas", "05"),
    st("CA", "California", "06"),
    st("CO", "Colorado", "08"),
    st("CT", "Connecticut", "09"),
    st("DE", "Delaware", "10"),
    st("DC", "District of Columbia", "11"),
    st("FL", "Florida", "12"),
    st("GA", "Georgia", "13"),
    st("HI", "Hawaii", "15"),
    st("ID", "Idaho", "16"),
    st("IL", "Illinois", "17"),
    st("IN", "Indiana", "18"),
    st("IA", "Iowa", "19"),
    st("KS", "Kansas", "20"),
    st("KY", "Kentucky", "21"),
    st("LA", "Louisiana", "22"),
    st("ME", "Maine", "23"),
    st("MD", "Maryland", "24"),
    st("MA", "Massachusetts", "25"),
    st("MI", "Michigan", "26"),
    st("MN", "Minnesota", "27"),
    st("MS", "Mississippi", "28"),
    st("MO", "Missouri", "29"),
    st("MT", "Montana", "30"),
    st("NE", "Nebraska", "31"),
    st("NV", "Nevada", "32"),
    st("NH", "New Hampshire", "33"),
    st("NJ", "New Jersey", "34"),
    st("NM", "New Mexico", "35"),
    st("NY", "New York", "36"),
    st("NC", "North Carolina", "37"),
    st("ND", "North Dakota", "38"),
    st("OH", "Ohio", "39"),
    st("OK", "Oklahoma", "40"),
    st("OR", "Oregon", "41"),
    st("PA", "Pennsylvania", "42"),
    st("RI", "Rhode Island", "44"),
    st("SC", "South Carolina", "45"),
    st("SD", "South Dakota", "46"),
    st("TN", "Tennessee", "47"),
    st("TX", "Texas", "48"),
    st("UT", "Utah", "49"),
    st("VT", "Vermont", "50"),
    st("VA", "Virginia", "51"),
    st("WA", "Washington", "53"),
    st("WV", "West Virginia", "54"),
    st("WI", "Wisconsin", "55"),
    st("WY", "Wyoming", "56"),
];

/// Look up a state by (case-sensitive, upper-case) postal code.
pub fn state_by_code(code: &str) -> Option<&'static State> {
    STATES.iter().find(|s| s.code == code)
}

/// Position of `code` in `STATES`, used by the dashboard's state selector.
pub fn state_index(code: &str) -> Option<usize> {
    STATES.iter().position(|s| s.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_code() {
        let ny = state_by_code("NY").unwrap();
        assert_eq!(ny.name, "New York");
        assert_eq!(ny.fips, "36");
        assert!(state_by_code("ny").is_none());
        assert!(state_by_code("PR").is_none());
    }

    #[test]
    fn codes_are_unique() {
        for (i, a) in STATES.iter().enumerate() {
            assert!(STATES[i + 1..].iter().all(|b| b.code != a.code), "duplicate {}", a.code);
        }
    }
}
