//! Pure, storage-independent derivations used by C3 (derived fields) and
//! C4 (canonical-identity duplicate detection), plus the malformed-title
//! classifier used by C9's cleanup pass.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::KgError;

/// The exact token an apply-mode (`dry_run=false`) cleanup call must supply,
/// per §9's confirmation-token requirement for destructive admin operations.
pub const CLEANUP_CONFIRMATION_TOKEN: &str = "CLEANUP_CONFIRMED";

/// Dry runs need no confirmation. An apply-mode run must supply exactly
/// `CLEANUP_CONFIRMATION_TOKEN`; anything else — missing, blank, or
/// mistyped — is rejected before any mutation runs.
pub fn require_cleanup_confirmation(dry_run: bool, confirm: Option<&str>) -> Result<(), KgError> {
    if dry_run {
        return Ok(());
    }
    if confirm == Some(CLEANUP_CONFIRMATION_TOKEN) {
        Ok(())
    } else {
        Err(KgError::validation(
            "apply-mode cleanup requires confirm=CLEANUP_CONFIRMED",
        ))
    }
}

static SPRINT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^e\d+_s\d+$").unwrap());
static EPIC_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^e\d+$").unwrap());
static SPRINT_ID_CAPTURE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(e\d+)_s\d+$").unwrap());
static TASK_ID_CAPTURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^e(\d+)_s(\d+)_t(\d+)$").unwrap());

/// Derives `Sprint.epic_id` from an id matching `e<NNN>_s<NN>`, per §4.3's
/// "derived-field policy". Returns `None` when the id doesn't match the
/// canonical pattern (e.g. `adhoc_*` sprints, whose epic is supplied
/// explicitly).
pub fn derive_epic_id_from_sprint_id(sprint_id: &str) -> Option<String> {
    SPRINT_ID_CAPTURE_RE
        .captures(sprint_id)
        .map(|c| c[1].to_string())
}

/// Sprint canonical id for duplicate detection (§4.4):
/// `lower(id)` if it matches `e\d+_s\d+`, else `lower(sprint_id)` if set,
/// else `lower(id)`.
pub fn sprint_canonical(id: &str, sprint_id_field: Option<&str>) -> String {
    let lower_id = id.to_lowercase();
    if SPRINT_ID_RE.is_match(&lower_id) {
        return lower_id;
    }
    if let Some(sid) = sprint_id_field {
        if !sid.is_empty() {
            return sid.to_lowercase();
        }
    }
    lower_id
}

/// Epic canonical id for duplicate detection (§4.4):
/// `lower(epic_id)` if it matches `e\d+`, else `lower(id)` stripped of an
/// `epic-` prefix and zero-padded to 3 digits.
pub fn epic_canonical(id: &str, epic_id_field: Option<&str>) -> String {
    if let Some(eid) = epic_id_field {
        let lower = eid.to_lowercase();
        if EPIC_ID_RE.is_match(&lower) {
            return lower;
        }
    }
    let lower_id = id.to_lowercase();
    let stripped = lower_id.strip_prefix("epic-").unwrap_or(&lower_id);
    zero_pad_epic(stripped)
}

fn zero_pad_epic(s: &str) -> String {
    if let Some(num) = s.strip_prefix('e') {
        if let Ok(n) = num.parse::<u32>() {
            return format!("e{n:03}");
        }
    }
    s.to_string()
}

/// A fallback title synthesized from a task id matching `e<NNN>_s<NN>_t<NN>`
/// — `Task <N> (Sprint <M>)`, per §4.9 step 3.
pub fn synthesize_task_title_fallback(task_id: &str) -> Option<String> {
    TASK_ID_CAPTURE_RE.captures(task_id).map(|c| {
        let sprint_num: u32 = c[2].parse().unwrap_or(0);
        let task_num: u32 = c[3].parse().unwrap_or(0);
        format!("Task {task_num} (Sprint {sprint_num})")
    })
}

/// §4.9 step 2: a title is malformed if it matches any of these patterns.
pub fn is_malformed_title(title: &str) -> bool {
    let t = title.trim();
    if t.is_empty() {
        return false;
    }
    if t.starts_with("string[")
        || t.starts_with("string;")
        || t.starts_with("string,")
        || t.starts_with("string}")
        || t.starts_with("string ")
    {
        return true;
    }
    if t.chars().all(|c| "{}[]".contains(c)) {
        return true;
    }
    if t.starts_with("[object") {
        return true;
    }
    if t == "undefined" || t == "null" {
        return true;
    }
    if t.starts_with("function(") {
        return true;
    }
    if contains_js_comment_with_quote(t) {
        return true;
    }
    if starts_with_http_verb_path(t) {
        return true;
    }
    false
}

fn contains_js_comment_with_quote(t: &str) -> bool {
    if let Some(idx) = t.find("//") {
        let rest = &t[idx..];
        return rest.contains('"') || rest.contains('\'');
    }
    false
}

fn starts_with_http_verb_path(t: &str) -> bool {
    const VERBS: [&str; 5] = ["GET ", "POST ", "PUT ", "PATCH ", "DELETE "];
    VERBS.iter().any(|v| t.starts_with(v) && t[v.len()..].starts_with('/'))
}

/// Attempts to extract a clean title from a malformed one: first tries a
/// quoted substring, then a `// ...` trailing comment, per §4.9 step 3.
pub fn extract_clean_title(malformed: &str) -> Option<String> {
    if let Some(start) = malformed.find('"') {
        if let Some(end) = malformed[start + 1..].find('"') {
            let candidate = &malformed[start + 1..start + 1 + end];
            if !candidate.is_empty() {
                return Some(candidate.to_string());
            }
        }
    }
    if let Some(idx) = malformed.find("//") {
        let candidate = malformed[idx + 2..].trim();
        if !candidate.is_empty() {
            return Some(candidate.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprint_canonical_matches_pattern() {
        assert_eq!(sprint_canonical("E005_S01", None), "e005_s01");
    }

    #[test]
    fn sprint_canonical_falls_back_to_sprint_id_field() {
        assert_eq!(sprint_canonical("adhoc_260727_s01", Some("E005_S01")), "e005_s01");
    }

    #[test]
    fn sprint_canonical_falls_back_to_id_when_no_field() {
        assert_eq!(sprint_canonical("adhoc_260727_s01", None), "adhoc_260727_s01");
    }

    #[test]
    fn epic_canonical_strips_prefix_and_pads() {
        assert_eq!(epic_canonical("epic-5", None), "e005");
        assert_eq!(epic_canonical("e5", Some("e5")), "e5");
    }

    #[test]
    fn epic_id_derivation_from_sprint_id() {
        assert_eq!(derive_epic_id_from_sprint_id("e005_s01"), Some("e005".into()));
        assert_eq!(derive_epic_id_from_sprint_id("adhoc_260727_s01"), None);
    }

    #[test]
    fn task_title_fallback_synthesis() {
        assert_eq!(
            synthesize_task_title_fallback("e005_s01_t03"),
            Some("Task 3 (Sprint 1)".into())
        );
    }

    #[test]
    fn malformed_title_detection() {
        assert!(is_malformed_title("undefined"));
        assert!(is_malformed_title("[object Object]"));
        assert!(is_malformed_title("{}"));
        assert!(is_malformed_title("function(x) { return x; }"));
        assert!(is_malformed_title("GET /api/v1/epic/5"));
        assert!(is_malformed_title(r#"// a comment with "quoted text""#));
        assert!(!is_malformed_title("Implement login flow"));
    }

    #[test]
    fn extract_clean_title_prefers_quoted_substring() {
        assert_eq!(
            extract_clean_title(r#"string[object] "Real Title" // trailing"#),
            Some("Real Title".into())
        );
    }

    #[test]
    fn extract_clean_title_falls_back_to_comment() {
        assert_eq!(extract_clean_title("// Real title here"), Some("Real title here".into()));
    }

    #[test]
    fn dry_run_cleanup_needs_no_confirmation() {
        assert!(require_cleanup_confirmation(true, None).is_ok());
    }

    #[test]
    fn apply_mode_cleanup_requires_exact_token() {
        assert!(require_cleanup_confirmation(false, None).is_err());
        assert!(require_cleanup_confirmation(false, Some("CLEANUP_CONFIRMED")).is_ok());
        assert!(require_cleanup_confirmation(false, Some("cleanup_confirmed")).is_err());
    }
}
