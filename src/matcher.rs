//! First-match-wins rule selection.

use crate::config::{Rule, RuleError, RuleSet};
use std::path::Path;
use tracing::{debug, trace};

/// Outcome of matching one file name against a rule set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchResult<'a> {
    /// The rule at `index` is the earliest rule that matched.
    Matched { index: usize, rule: &'a Rule },
    /// No rule matched.
    NoMatch,
}

impl<'a> MatchResult<'a> {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }

    pub fn rule(&self) -> Option<&'a Rule> {
        match self {
            MatchResult::Matched { rule, .. } => Some(rule),
            MatchResult::NoMatch => None,
        }
    }
}

/// Returns the name the patterns are matched against: the last path
/// component, or the whole string when there is none (e.g. `..`).
pub fn match_name(file: &Path) -> String {
    file.file_name()
        .unwrap_or(file.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Finds the first rule in `rules` whose pattern occurs anywhere in the name
/// of `file`.
///
/// Rules with an empty or invalid pattern never match; each one is handed to
/// `on_error` along with its index and matching carries on with the next
/// rule.
pub fn match_rule<'a>(
    file: &Path,
    rules: &'a RuleSet,
    mut on_error: impl FnMut(usize, RuleError),
) -> MatchResult<'a> {
    let name = match_name(file);

    for (index, rule) in rules.iter().enumerate() {
        let regex = match rule.compile() {
            Ok(regex) => regex,
            Err(e) => {
                debug!(index, pattern = %rule.pattern, error = %e, "skipping bad rule");
                on_error(index, e);
                continue;
            }
        };

        if regex.is_match(&name) {
            debug!(index, pattern = %rule.pattern, file = %name, "rule matched");
            return MatchResult::Matched { index, rule };
        }
        trace!(index, pattern = %rule.pattern, file = %name, "rule did not match");
    }

    MatchResult::NoMatch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(list: &[(&str, &str)]) -> RuleSet {
        RuleSet::new(
            list.iter()
                .map(|(pattern, dest)| Rule::new(*pattern, *dest))
                .collect(),
        )
    }

    fn match_silently<'a>(file: &str, rules: &'a RuleSet) -> MatchResult<'a> {
        match_rule(Path::new(file), rules, |_, e| panic!("unexpected rule error: {e}"))
    }

    #[test]
    fn test_case_insensitive_inline_flag() {
        let set = rules(&[("(?i)Awesome.?Thing", "/dest")]);

        assert!(match_silently("Some Awesome Thing", &set).is_match());
        assert!(match_silently("some awesomething.txt", &set).is_match());
        assert!(!match_silently("Differnt Thing", &set).is_match());
    }

    #[test]
    fn test_first_match_wins() {
        let set = rules(&[("thing", "/first"), ("Thing$", "/second"), ("^Some", "/third")]);

        let result = match_silently("Some thing", &set);
        assert_eq!(result, MatchResult::Matched { index: 0, rule: set.iter().next().unwrap() });

        let result = match_silently("Some Thing", &set);
        match result {
            MatchResult::Matched { index, rule } => {
                assert_eq!(index, 1);
                assert_eq!(rule.destination, Path::new("/second"));
            }
            MatchResult::NoMatch => panic!("expected a match"),
        }
    }

    #[test]
    fn test_substring_semantics_not_anchored() {
        let set = rules(&[("port", "/d")]);
        assert!(match_silently("quarterly report.pdf", &set).is_match());
    }

    #[test]
    fn test_case_sensitive_by_default() {
        let set = rules(&[("pdf", "/d")]);
        assert!(!match_silently("REPORT.PDF", &set).is_match());
    }

    #[test]
    fn test_matches_bare_name_not_directory() {
        let set = rules(&[("^Downloads", "/d")]);
        assert!(!match_silently("Downloads/invoice.pdf", &set).is_match());
        assert!(match_silently("/home/me/Downloads", &set).is_match());
    }

    #[test]
    fn test_empty_pattern_never_matches_and_is_reported() {
        let set = rules(&[("", "/a"), ("txt", "/b")]);
        let mut errors = Vec::new();

        let result = match_rule(Path::new("notes.txt"), &set, |i, e| errors.push((i, e)));

        assert_eq!(result.rule().map(|r| r.destination.as_path()), Some(Path::new("/b")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, 0);
        assert!(matches!(errors[0].1, RuleError::EmptyPattern));
    }

    #[test]
    fn test_invalid_pattern_skipped_later_rules_evaluated() {
        let set = rules(&[("[unclosed(", "/a"), ("notes", "/b")]);
        let mut errors = Vec::new();

        let result = match_rule(Path::new("notes.txt"), &set, |i, e| errors.push((i, e)));

        assert!(matches!(result, MatchResult::Matched { index: 1, .. }));
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].1, RuleError::InvalidPattern(_)));
        assert!(errors[0].1.to_string().starts_with("Could not compile regexp"));
    }

    #[test]
    fn test_only_bad_rules_is_no_match() {
        let set = rules(&[("", "/a"), ("(", "/b")]);
        let mut count = 0;

        let result = match_rule(Path::new("anything"), &set, |_, _| count += 1);

        assert_eq!(result, MatchResult::NoMatch);
        assert_eq!(result.rule(), None);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_empty_rule_set_is_no_match() {
        let set = RuleSet::default();
        assert_eq!(match_silently("file.txt", &set), MatchResult::NoMatch);
    }

    #[test]
    fn test_match_name_falls_back_to_whole_path() {
        assert_eq!(match_name(Path::new("/a/b/c.txt")), "c.txt");
        assert_eq!(match_name(Path::new("..")), "..");
    }
}
