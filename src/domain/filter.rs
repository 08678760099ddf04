//! Catalog filter predicates.
//!
//! Raw, untrusted query parameters are compiled into a small tagged AST
//! (`Predicate`) exactly once per request. The AST is what the repository
//! layer translates to SQL, and it can also be evaluated directly against
//! in-memory facts, so filter semantics are testable without a database.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::CategoryRecord;
use crate::domain::slug::is_valid_slug;

/// Longest accepted free-text query, in characters. Anything beyond is
/// truncated, not rejected.
pub const MAX_SEARCH_LEN: usize = 100;

/// A text column a search term can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Title,
    Description,
    Content,
}

/// Structured filter predicate.
///
/// Construction is canonical: search terms are lowercased, sorted, and
/// deduplicated, and category id sets are sorted, so two requests describing
/// the same filter always produce an identical tree (and therefore an
/// identical fingerprint).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// Case-insensitive substring match on one text column.
    Field { field: TextField, needle: String },
    /// Case-insensitive substring match on any of the post's tag names.
    TagName(String),
    /// Post's category id is one of the listed ids. An empty set matches
    /// nothing (a well-formed but unknown slug filters everything out).
    CategoryIn(Vec<Uuid>),
    Premium(bool),
}

impl Predicate {
    /// A predicate that matches every post.
    pub fn all() -> Self {
        Predicate::And(Vec::new())
    }

    /// Whether the predicate carries at least one free-text term.
    pub fn has_text(&self) -> bool {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().any(Predicate::has_text)
            }
            Predicate::Field { .. } | Predicate::TagName(_) => true,
            Predicate::CategoryIn(_) | Predicate::Premium(_) => false,
        }
    }

    /// Stable fingerprint for cache keying.
    ///
    /// Stability follows from canonical construction, not from serialization
    /// tricks: the tree itself is order-normalized, so hashing it directly is
    /// insensitive to the order the request supplied its parameters in.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Evaluate the predicate against in-memory facts.
    pub fn matches(&self, facts: &PostFacts<'_>) -> bool {
        match self {
            Predicate::And(children) => children.iter().all(|child| child.matches(facts)),
            Predicate::Or(children) => children.iter().any(|child| child.matches(facts)),
            Predicate::Field { field, needle } => {
                let haystack = match field {
                    TextField::Title => facts.title,
                    TextField::Description => facts.description,
                    TextField::Content => facts.content,
                };
                haystack.to_lowercase().contains(needle)
            }
            Predicate::TagName(needle) => facts
                .tag_names
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle)),
            Predicate::CategoryIn(ids) => ids.contains(&facts.category_id),
            Predicate::Premium(premium) => facts.premium == *premium,
        }
    }
}

/// The slice of a post that predicates evaluate against.
#[derive(Debug, Clone, Copy)]
pub struct PostFacts<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub content: &'a str,
    pub tag_names: &'a [&'a str],
    pub category_id: Uuid,
    pub premium: bool,
}

/// Raw filter parameters as they arrive on the query string.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub premium: Option<String>,
}

/// One rejected parameter with its message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("invalid filter parameters")]
pub struct FilterErrors {
    pub fields: Vec<FieldError>,
}

/// Compile raw parameters into a predicate.
///
/// `categories` is the preloaded category list; slugs are resolved against it
/// in memory rather than through per-request lookups. Malformed slugs are the
/// only rejectable input: missing filters widen the match and unknown premium
/// values are ignored.
pub fn build_post_predicate(
    params: &FilterParams,
    categories: &[CategoryRecord],
) -> Result<Predicate, FilterErrors> {
    let mut fields = Vec::new();
    let mut clauses = Vec::new();

    for term in search_terms(params.q.as_deref()) {
        clauses.push(Predicate::Or(vec![
            Predicate::Field {
                field: TextField::Title,
                needle: term.clone(),
            },
            Predicate::Field {
                field: TextField::Description,
                needle: term.clone(),
            },
            Predicate::Field {
                field: TextField::Content,
                needle: term.clone(),
            },
            Predicate::TagName(term),
        ]));
    }

    let category = validate_slug_param("category", params.category.as_deref(), &mut fields);
    let subcategory = validate_slug_param("subcategory", params.subcategory.as_deref(), &mut fields);

    if !fields.is_empty() {
        return Err(FilterErrors { fields });
    }

    // Subcategory wins when both are present and matches exactly; a bare
    // parent slug expands to itself plus its direct children.
    if let Some(slug) = subcategory {
        clauses.push(Predicate::CategoryIn(resolve_exact(slug, categories)));
    } else if let Some(slug) = category {
        clauses.push(Predicate::CategoryIn(resolve_with_children(
            slug, categories,
        )));
    }

    match params.premium.as_deref() {
        Some("free") => clauses.push(Predicate::Premium(false)),
        Some("premium") => clauses.push(Predicate::Premium(true)),
        _ => {}
    }

    Ok(Predicate::And(clauses))
}

/// Trim, cap, lowercase, split, sort, dedup.
fn search_terms(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let trimmed = raw.trim();
    let capped: String = trimmed.chars().take(MAX_SEARCH_LEN).collect();

    let mut terms: Vec<String> = capped
        .split_whitespace()
        .map(|term| term.to_lowercase())
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

fn validate_slug_param<'a>(
    field: &'static str,
    value: Option<&'a str>,
    fields: &mut Vec<FieldError>,
) -> Option<&'a str> {
    let value = value?;
    if is_valid_slug(value) {
        Some(value)
    } else {
        fields.push(FieldError {
            field,
            message: format!("`{value}` is not a valid slug"),
        });
        None
    }
}

fn resolve_exact(slug: &str, categories: &[CategoryRecord]) -> Vec<Uuid> {
    categories
        .iter()
        .filter(|category| category.slug == slug)
        .map(|category| category.id)
        .collect()
}

fn resolve_with_children(slug: &str, categories: &[CategoryRecord]) -> Vec<Uuid> {
    let Some(parent) = categories.iter().find(|category| category.slug == slug) else {
        return Vec::new();
    };

    let mut ids: Vec<Uuid> = categories
        .iter()
        .filter(|category| category.parent_id == Some(parent.id))
        .map(|category| category.id)
        .collect();
    ids.push(parent.id);
    ids.sort();
    ids
}
