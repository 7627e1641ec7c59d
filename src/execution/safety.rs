//! Textual query safety filter.
//!
//! A coarse substring heuristic, not a parser: a keyword is flagged wherever it
//! appears, including inside identifiers and string literals. Session
//! connections are read-only at the engine level as well.

/// Keywords that reject a query wherever they appear (case-insensitive).
pub const BLOCKED_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "TRUNCATE", "CREATE", "GRANT", "REVOKE",
    "COPY", "EXECUTE",
];

/// Findings for one query text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyReport {
    /// Blocked keywords found, in `BLOCKED_KEYWORDS` order
    pub blocked_keywords: Vec<&'static str>,
    pub semicolons: usize,
    /// `--` or `/*` present; informational only
    pub has_comments: bool,
}

impl SafetyReport {
    pub fn is_safe(&self) -> bool {
        self.blocked_keywords.is_empty() && self.semicolons <= 1
    }

    /// Human-readable reason for the first violation, if any.
    pub fn violation(&self) -> Option<String> {
        if let Some(keyword) = self.blocked_keywords.first() {
            return Some(format!("blocked keyword {keyword}"));
        }
        if self.semicolons > 1 {
            return Some("multiple statements are not allowed".to_string());
        }
        None
    }
}

pub fn inspect(sql: &str) -> SafetyReport {
    let upper = sql.to_ascii_uppercase();
    SafetyReport {
        blocked_keywords: BLOCKED_KEYWORDS
            .iter()
            .copied()
            .filter(|keyword| upper.contains(keyword))
            .collect(),
        semicolons: sql.matches(';').count(),
        has_comments: sql.contains("--") || sql.contains("/*"),
    }
}

/// `Ok(())` if the query may run, otherwise the rejection reason.
pub fn check_query(sql: &str) -> Result<(), String> {
    match inspect(sql).violation() {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

pub fn is_safe(sql: &str) -> bool {
    inspect(sql).is_safe()
}
