//! Reminder Stripper — C3.
//!
//! Removes `<system-reminder>…</system-reminder>` spans injected by upstream
//! tooling. Used both during normalization (§4.1 step 2) and sub-task prompt
//! matching (§4.5), exactly as the distilled spec calls out.

use std::sync::OnceLock;

use regex::Regex;

/// Matches a complete reminder span, including any immediately preceding
/// whitespace run (spaces, tabs, CR, LF) — §4.1 step 2. Case-insensitive,
/// `.` matches newlines (`s` flag), non-greedy body so back-to-back
/// reminders don't collapse into one match.
fn reminder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)[ \t\r\n]*<system-reminder>.*?</system-reminder>").expect("valid regex")
    })
}

/// Repeatedly remove reminder spans until none remain (§4.3).
///
/// Non-string input has no string representation to strip, per §4.3 — this
/// function only operates on `&str`; callers working with dynamically-typed
/// content should treat a non-string value as `""` before calling, which is
/// the behavior §4.3 specifies for the dynamically-typed source.
pub fn strip_reminders(input: &str) -> String {
    let re = reminder_pattern();
    let mut current = input.to_string();
    loop {
        if !re.is_match(&current) {
            return current;
        }
        current = re.replace_all(&current, "").into_owned();
    }
}

/// True iff a complete opening+closing reminder pair exists in `input`.
/// An unmatched opening tag without a closing tag does not count (§4.1 step
/// 2: "An incomplete ... tag is left untouched").
pub fn contains_reminder(input: &str) -> bool {
    reminder_pattern().is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_reminder() {
        let input = "Hello <system-reminder>ignore this</system-reminder> world";
        assert_eq!(strip_reminders(input), "Hello world");
    }

    #[test]
    fn strips_preceding_whitespace_run() {
        let input = "Hello   \n\t<system-reminder>x</system-reminder>world";
        assert_eq!(strip_reminders(input), "Helloworld");
    }

    #[test]
    fn leaves_incomplete_tag_untouched() {
        let input = "Hello <system-reminder>unclosed";
        assert_eq!(strip_reminders(input), input);
        assert!(!contains_reminder(input));
    }

    #[test]
    fn strips_multiline_reminder_case_insensitively() {
        let input = "before <SYSTEM-REMINDER>line one\nline two</SYSTEM-reminder> after";
        assert_eq!(strip_reminders(input), "before after");
    }

    #[test]
    fn strips_multiple_back_to_back_reminders() {
        let input = "a <system-reminder>one</system-reminder> <system-reminder>two</system-reminder> b";
        assert_eq!(strip_reminders(input), "a b");
    }

    #[test]
    fn contains_reminder_detects_complete_pair() {
        assert!(contains_reminder("x <system-reminder>y</system-reminder> z"));
        assert!(!contains_reminder("no reminder here"));
    }

    #[test]
    fn empty_input_round_trips() {
        assert_eq!(strip_reminders(""), "");
    }
}
