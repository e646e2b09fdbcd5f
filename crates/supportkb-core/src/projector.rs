use crate::types::{Document, DocumentMetadata, KnowledgeEntry};

/// Flattens an entry into `Problem: .. Keywords: .. Solutions: ..`, skipping
/// empty sections. Output depends only on the entry, so re-projection yields
/// byte-identical text.
pub fn project(key: &str, entry: &KnowledgeEntry) -> Document {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if !entry.problem.is_empty() {
        parts.push(format!("Problem: {}", entry.problem));
    }
    if !entry.keywords.is_empty() {
        parts.push(format!("Keywords: {}", entry.keywords.join(", ")));
    }
    if !entry.solutions.is_empty() {
        parts.push(format!("Solutions: {}", entry.solutions.join(" ")));
    }
    Document {
        text: parts.join(" "),
        metadata: DocumentMetadata {
            key: key.to_string(),
            problem: entry.problem.clone(),
            category: entry.category.clone(),
            keywords: entry.keywords.clone(),
            solutions: entry.solutions.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login() -> KnowledgeEntry {
        KnowledgeEntry::new(
            "Cannot login to account",
            ["login", "signin", "password"],
            ["Reset password", "Check email"],
            Some("Account Issues"),
        )
        .unwrap()
    }

    #[test]
    fn text_layout() {
        let doc = project("login_issues", &login());
        assert_eq!(
            doc.text,
            "Problem: Cannot login to account Keywords: login, signin, password Solutions: Reset password Check email"
        );
        assert_eq!(doc.metadata.key, "login_issues");
        assert_eq!(doc.metadata.category, "Account Issues");
    }

    #[test]
    fn empty_sections_are_omitted() {
        let mut e = login();
        e.problem.clear();
        e.keywords.clear();
        let doc = project("k", &e);
        assert_eq!(doc.text, "Solutions: Reset password Check email");
    }

    #[test]
    fn reprojection_is_identical() {
        let e = login();
        assert_eq!(project("k", &e).text, project("k", &e).text);
    }

    #[test]
    fn metadata_is_a_copy() {
        let mut e = login();
        let doc = project("k", &e);
        e.solutions.push("Clear cache".into());
        assert_eq!(doc.metadata.solutions.len(), 2);
    }
}
