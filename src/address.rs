//! Decoder for `loop://` addresses.
//!
//! Accepted form: `loop://[?logging={debug|info|warning|error}]`. Query
//! options are looked up in [`OPTION_TABLE`]; each entry turns the raw value
//! into a typed [`AddressOption`]. Anything not in the table is rejected
//! while decoding, before the channel is opened.

use crate::diagnostics::LogLevel;
use crate::port::PortError;
use percent_encoding::percent_decode_str;
use std::str::FromStr;

/// The only scheme this decoder accepts.
pub const SCHEME: &str = "loop";

/// A decoded query option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressOption {
    /// Attach a diagnostic sink at the given severity.
    Logging(LogLevel),
}

impl AddressOption {
    pub fn name(&self) -> &'static str {
        match self {
            AddressOption::Logging(_) => "logging",
        }
    }
}

type OptionParser = fn(&str) -> Result<AddressOption, String>;

/// Known query options, keyed by name.
pub const OPTION_TABLE: &[(&str, OptionParser)] = &[("logging", parse_logging)];

fn parse_logging(value: &str) -> Result<AddressOption, String> {
    value
        .parse::<LogLevel>()
        .map(AddressOption::Logging)
        .map_err(|e| e.to_string())
}

/// A validated `loop://` address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopAddress {
    options: Vec<AddressOption>,
}

impl LoopAddress {
    /// Decode an address string.
    pub fn parse(address: &str) -> Result<Self, PortError> {
        let (scheme, rest) = address.split_once(':').unwrap_or(("", address));
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(PortError::address(format!(
                "not starting with loop:// ({scheme:?})"
            )));
        }

        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let query = rest.split_once('?').map_or("", |(_, query)| query);

        let mut options: Vec<AddressOption> = Vec::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = percent_decode(raw_name);
            let value = percent_decode(raw_value);

            let parser = OPTION_TABLE
                .iter()
                .find(|(known, _)| *known == name)
                .map(|(_, parser)| *parser)
                .ok_or_else(|| PortError::address(format!("unknown option: {name:?}")))?;

            let option = parser(&value).map_err(PortError::address)?;
            // First occurrence wins.
            if !options.iter().any(|o| o.name() == option.name()) {
                options.push(option);
            }
        }

        Ok(Self { options })
    }

    pub fn options(&self) -> &[AddressOption] {
        &self.options
    }

    /// Severity requested by the `logging` option, if present.
    pub fn logging(&self) -> Option<LogLevel> {
        self.options.iter().find_map(|option| match option {
            AddressOption::Logging(level) => Some(*level),
        })
    }
}

impl FromStr for LoopAddress {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Decode `+` and `%XX` escapes the way query strings are encoded.
///
/// Malformed escapes are kept literally.
fn percent_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_address() {
        let address = LoopAddress::parse("loop://").unwrap();
        assert!(address.options().is_empty());
        assert_eq!(address.logging(), None);
    }

    #[test]
    fn test_logging_option() {
        for level in LogLevel::ALL {
            let address = LoopAddress::parse(&format!("loop://?logging={level}")).unwrap();
            assert_eq!(address.logging(), Some(level));
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let address = LoopAddress::parse("loop://?logging=error&logging=debug").unwrap();
        assert_eq!(address.logging(), Some(LogLevel::Error));
        assert_eq!(address.options().len(), 1);
    }

    #[test]
    fn test_wrong_scheme() {
        let err = LoopAddress::parse("ftp://").unwrap_err();
        assert!(matches!(err, PortError::AddressFormat(ref m) if m.contains("\"ftp\"")));

        assert!(matches!(
            LoopAddress::parse("/dev/ttyUSB0"),
            Err(PortError::AddressFormat(_))
        ));
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert!(LoopAddress::parse("LOOP://").is_ok());
    }

    #[test]
    fn test_unknown_option() {
        let err = LoopAddress::parse("loop://?unknown=1").unwrap_err();
        assert!(matches!(err, PortError::AddressFormat(ref m) if m.contains("unknown option")));
    }

    #[test]
    fn test_invalid_logging_value() {
        assert!(matches!(
            LoopAddress::parse("loop://?logging=bogus"),
            Err(PortError::AddressFormat(_))
        ));
        // A bare key has an empty value, which is not a level either.
        assert!(matches!(
            LoopAddress::parse("loop://?logging"),
            Err(PortError::AddressFormat(_))
        ));
    }

    #[test]
    fn test_host_and_fragment_are_ignored() {
        let address = LoopAddress::parse("loop://anything/here?logging=info#frag").unwrap();
        assert_eq!(address.logging(), Some(LogLevel::Info));
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(percent_decode("log%67ing"), "logging");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%FF"), "\u{FFFD}");
        let address = LoopAddress::parse("loop://?log%67ing=%64ebug").unwrap();
        assert_eq!(address.logging(), Some(LogLevel::Debug));
    }
}
