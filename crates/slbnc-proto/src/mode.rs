//! Channel mode-change scanning.
//!
//! A mode line such as `+ov-k bob carol secret` is read left to right with a
//! polarity flag. Each letter is classified against the server's current
//! `PREFIX` and `CHANMODES`, which decides whether it consumes the next
//! parameter.

use smallvec::SmallVec;

use crate::isupport::{Capabilities, ModeClass};

/// A single mode letter applied with its polarity and parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// `true` for `+`, `false` for `-`.
    pub adding: bool,
    /// The mode letter.
    pub mode: char,
    /// Classification at the time of the scan.
    pub class: ModeClass,
    /// Consumed parameter, if the class takes one for this polarity.
    pub param: Option<String>,
}

/// Split a mode string and its parameters into individual changes.
///
/// Scanning stops at the first letter that needs a parameter when none are
/// left; changes before it are still returned. Surplus parameters are
/// ignored. A string without a leading sign is read as `+`.
///
/// ```
/// use slbnc_proto::{scan_mode_changes, Capabilities};
///
/// let caps = Capabilities::new();
/// let changes = scan_mode_changes("+ov-l", &["bob", "carol"], &caps);
/// assert_eq!(changes.len(), 3);
/// assert_eq!(changes[1].param.as_deref(), Some("carol"));
/// assert_eq!(changes[2].param, None);
/// ```
pub fn scan_mode_changes<S: AsRef<str>>(
    modes: &str,
    params: &[S],
    caps: &Capabilities,
) -> SmallVec<[ModeChange; 4]> {
    let mut changes = SmallVec::new();
    let mut params = params.iter().map(AsRef::as_ref);
    let mut adding = true;

    for mode in modes.chars() {
        match mode {
            '+' => adding = true,
            '-' => adding = false,
            _ => {
                let class = caps.mode_class(mode);
                let param = if class.takes_param(adding) {
                    match params.next() {
                        Some(p) => Some(p.to_string()),
                        None => break,
                    }
                } else {
                    None
                };
                changes.push(ModeChange {
                    adding,
                    mode,
                    class,
                    param,
                });
            }
        }
    }

    changes
}

/// Number of parameters a mode string consumes when all are supplied.
pub fn count_mode_params(modes: &str, caps: &Capabilities) -> usize {
    let mut adding = true;
    let mut count = 0;

    for mode in modes.chars() {
        match mode {
            '+' => adding = true,
            '-' => adding = false,
            _ if caps.mode_class(mode).takes_param(adding) => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_modes_take_nicks() {
        let caps = Capabilities::new();
        let changes = scan_mode_changes("+ov", &["bob", "carol"], &caps);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].class, ModeClass::Prefix);
        assert_eq!(changes[0].param.as_deref(), Some("bob"));
        assert_eq!(changes[1].param.as_deref(), Some("carol"));
    }

    #[test]
    fn test_polarity_controls_type_c() {
        let caps = Capabilities::new();
        let changes = scan_mode_changes("+l-l+n", &["10"], &caps);

        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].param.as_deref(), Some("10"));
        assert!(!changes[1].adding);
        assert_eq!(changes[1].param, None);
        assert_eq!(changes[2].mode, 'n');
    }

    #[test]
    fn test_list_and_key_consume_on_removal() {
        let caps = Capabilities::new();
        let changes = scan_mode_changes("-bk", &["*!*@spam", "secret"], &caps);

        assert_eq!(changes[0].param.as_deref(), Some("*!*@spam"));
        assert_eq!(changes[1].param.as_deref(), Some("secret"));
    }

    #[test]
    fn test_runs_out_of_params() {
        let caps = Capabilities::new();
        let changes = scan_mode_changes("+nobt", &["bob"], &caps);

        // `b` needs a mask that is not there; `t` is never reached.
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].mode, 'o');
    }

    #[test]
    fn test_unsigned_mode_string_reads_as_plus() {
        let caps = Capabilities::new();
        let changes = scan_mode_changes("nt", &[] as &[&str], &caps);
        assert!(changes.iter().all(|c| c.adding));
    }

    #[test]
    fn test_count_matches_scan() {
        let caps = Capabilities::new();
        assert_eq!(count_mode_params("+ovkl-lbn", &caps), 5);
        assert_eq!(count_mode_params("-k+t", &caps), 1);
    }
}
