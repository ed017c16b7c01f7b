//! Line-based front-matter parsing for skill Markdown files.

use super::types::SkillFrontMatter;

/// Split `content` into its front-matter block (delimited by `---` lines)
/// and the remaining body, then parse the header into [`SkillFrontMatter`].
pub fn parse(content: &str, fallback_name: &str) -> (SkillFrontMatter, String) {
    let Some(after_open) = content.strip_prefix("---") else {
        return (
            SkillFrontMatter {
                name: fallback_name.to_string(),
                ..Default::default()
            },
            content.to_string(),
        );
    };

    let Some(end) = after_open.find("\n---") else {
        return (
            SkillFrontMatter {
                name: fallback_name.to_string(),
                ..Default::default()
            },
            content.to_string(),
        );
    };

    let fm_content = &after_open[..end];
    let body = after_open[end + 4..].trim_start_matches('\n').to_string();

    let mut front = SkillFrontMatter {
        name: fallback_name.to_string(),
        ..Default::default()
    };

    for line in fm_content.lines() {
        let line = line.trim();
        let Some(idx) = line.find(':') else { continue };
        let key = line[..idx].trim();
        let value = line[idx + 1..].trim();
        if value.is_empty() {
            continue;
        }
        match key {
            "name" => front.name = value.to_string(),
            "description" => front.description = value.to_string(),
            "tags" => front.tags = split_list(value),
            "requires" => front.requires = split_list(value),
            "pipeline" => front.pipeline = split_list(value),
            _ => {}
        }
    }

    (front, body)
}

fn split_list(value: &str) -> Vec<String> {
    let trimmed = value.trim_start_matches('[').trim_end_matches(']');
    trimmed
        .split(',')
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_description() {
        let content = "---\nname: my-skill\ndescription: A test skill\n---\n# Content";
        let (front, body) = parse(content, "fallback");
        assert_eq!(front.name, "my-skill");
        assert_eq!(front.description, "A test skill");
        assert_eq!(body, "# Content");
    }

    #[test]
    fn parses_list_fields() {
        let content = "---\nname: s\ntags: [a, b, c]\nrequires: [dep1, dep2]\n---\nbody";
        let (front, _) = parse(content, "fallback");
        assert_eq!(front.tags, vec!["a", "b", "c"]);
        assert_eq!(front.requires, vec!["dep1", "dep2"]);
    }

    #[test]
    fn falls_back_without_frontmatter() {
        let (front, body) = parse("# No frontmatter here", "fallback");
        assert_eq!(front.name, "fallback");
        assert_eq!(body, "# No frontmatter here");
    }

    #[test]
    fn handles_empty_frontmatter() {
        let (front, _) = parse("---\n---\n# Empty frontmatter", "fallback");
        assert_eq!(front.name, "fallback");
    }
}
