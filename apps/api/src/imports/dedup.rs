use crate::models::resume::Resume;

/// How many characters of normalized text participate in the fingerprint.
/// Two resumes differing only beyond this offset are treated as duplicates;
/// that tolerance is deliberate, not an accident of the truncation.
const TEXT_FINGERPRINT_CHARS: usize = 500;

/// The exact-match dedup key: normalized candidate name paired with a
/// normalized text prefix. A pure function of the stored fields, so the
/// decision is identical no matter which import source produced a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    name: String,
    text: String,
}

pub fn fingerprint(candidate_name: &str, text: &str) -> Fingerprint {
    Fingerprint {
        name: candidate_name.trim().to_lowercase(),
        text: text_fingerprint(text),
    }
}

fn text_fingerprint(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed: Vec<&str> = lowered.split_whitespace().collect();
    collapsed
        .join(" ")
        .chars()
        .take(TEXT_FINGERPRINT_CHARS)
        .collect()
}

/// True iff a candidate document duplicates any already-stored resume.
pub fn is_duplicate(existing: &[Resume], candidate_name: &str, text: &str) -> bool {
    let target = fingerprint(candidate_name, text);
    existing
        .iter()
        .any(|resume| fingerprint(&resume.candidate_name, &resume.text) == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resume(name: &str, text: &str) -> Resume {
        Resume {
            id: 1,
            candidate_name: name.to_string(),
            text: text.to_string(),
            skills: vec![],
        }
    }

    #[test]
    fn test_fingerprint_is_case_and_whitespace_insensitive() {
        assert_eq!(
            fingerprint("John  Doe", "Text  here"),
            fingerprint("john doe", "text here")
        );
    }

    #[test]
    fn test_fingerprint_name_is_trimmed() {
        assert_eq!(fingerprint("  Jane Doe  ", "x"), fingerprint("jane doe", "x"));
    }

    #[test]
    fn test_duplicate_is_reflexive() {
        let stored = vec![resume("Jane Doe", "Ten years of systems programming.")];
        assert!(is_duplicate(&stored, "Jane Doe", "Ten years of systems programming."));
    }

    #[test]
    fn test_duplicate_is_symmetric() {
        let a = ("Jane Doe", "Ten years of systems programming.");
        let b = ("JANE DOE", "Ten  years of systems   programming.");
        let stored_a = vec![resume(a.0, a.1)];
        let stored_b = vec![resume(b.0, b.1)];
        assert_eq!(
            is_duplicate(&stored_a, b.0, b.1),
            is_duplicate(&stored_b, a.0, a.1)
        );
    }

    #[test]
    fn test_different_name_is_not_duplicate() {
        let stored = vec![resume("Jane Doe", "Same text body here.")];
        assert!(!is_duplicate(&stored, "John Doe", "Same text body here."));
    }

    #[test]
    fn test_texts_equal_in_first_500_chars_collide() {
        let shared: String = "word ".repeat(150); // 750 chars collapsed
        let a = format!("{shared}tail one");
        let b = format!("{shared}tail two");
        let stored = vec![resume("Jane Doe", &a)];
        assert!(is_duplicate(&stored, "Jane Doe", &b));
    }

    #[test]
    fn test_texts_diverging_before_500_chars_do_not_collide() {
        let stored = vec![resume("Jane Doe", "completely different body")];
        assert!(!is_duplicate(&stored, "Jane Doe", "another body entirely"));
    }
}
