//! Tag resolution between declared tag names and NetBox tag objects

use std::collections::BTreeSet;

use tracing::{debug, info};

use netbox_common::{Error, NestedTag, Result, WritableTag};

use crate::client::NetBoxClient;

/// Resolve declared tag names into nested tag references for a write payload.
///
/// Tags that do not exist yet are created. A name matching more than one tag
/// is an error.
pub async fn resolve_tags(client: &NetBoxClient, names: &BTreeSet<String>) -> Result<Vec<NestedTag>> {
    let mut tags = Vec::with_capacity(names.len());

    for name in names {
        let page = client.find_tags_by_name(name).await?;
        let tag = match page.count {
            0 => {
                let data = WritableTag {
                    name: name.clone(),
                    slug: slugify(name),
                };
                info!("Creating missing tag {:?} (slug {})", data.name, data.slug);
                client.create_tag(&data).await?
            }
            1 => page.results.into_iter().next().ok_or_else(|| {
                Error::Tag(format!("lookup of tag {:?} reported a match but returned none", name))
            })?,
            n => {
                return Err(Error::Tag(format!("tag name {:?} is ambiguous: {} matches", name, n)));
            }
        };
        debug!("Resolved tag {:?} to id {}", tag.name, tag.id);
        tags.push(NestedTag::from(tag));
    }

    Ok(tags)
}

/// Flatten nested tags into their set of names
pub fn tag_names(tags: &[NestedTag]) -> BTreeSet<String> {
    tags.iter().map(|t| t.name.clone()).collect()
}

/// Longest slug NetBox stores
const MAX_SLUG_LEN: usize = 100;

/// Derive a NetBox slug (`[-a-z0-9_]`) from a tag name.
///
/// Runs of other characters collapse into a single dash. A name with no
/// ASCII letters or digits falls back to the hex of its UTF-8 bytes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("tag");
        for b in name.bytes() {
            slug.push_str(&format!("{:02x}", b));
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(name: &str) -> NestedTag {
        NestedTag {
            id: None,
            name: name.to_string(),
            slug: slugify(name),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Core Switch"), "core-switch");
        assert_eq!(slugify("  edge -- DC1 "), "edge-dc1");
        assert_eq!(slugify("ops_team"), "ops_team");
        assert_eq!(slugify("a/b.c"), "a-b-c");
    }

    #[test]
    fn test_slugify_non_ascii() {
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("Rack Ü3"), "rack-3");
        assert!(slugify("Café").is_ascii());

        let slug = slugify("名前");
        assert_eq!(slug, "tage5908de5898d");
        assert!(slug.is_ascii());
    }

    #[test]
    fn test_slugify_never_empty() {
        assert_eq!(slugify("!!!"), "tag212121");
        assert_eq!(slugify(""), "tag");
        assert_eq!(slugify(&"x".repeat(150)).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_tag_names_ignore_order_and_duplicates() {
        let names = tag_names(&[nested("b"), nested("a"), nested("b")]);
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
