//! Naming conventions used to derive association defaults.
//!
//! - `underscore("GenericRecord")` -> `generic_record` (default has-many foreign key stem)
//! - `classify("posts")` -> `Post` (default related model name)
//! - `singularize("posts")` -> `post` (`post_ids` accessors)

/// Convert PascalCase to snake_case.
///
/// Examples:
/// - `Author` -> `author`
/// - `GenericRecord` -> `generic_record`
/// - `HTTPServer` -> `http_server`
pub fn underscore(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next = chars.get(i + 1).copied();

                // Word boundary, or the first word after an acronym.
                let should_underscore = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase()));

                if should_underscore {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

/// Convert snake_case to PascalCase.
pub fn camelize(s: &str) -> String {
    s.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Simple English singularization of the last word.
pub fn singularize(word: &str) -> String {
    match word {
        "people" => return "person".to_string(),
        "children" => return "child".to_string(),
        "men" => return "man".to_string(),
        "women" => return "woman".to_string(),
        "data" => return "datum".to_string(),
        _ => {}
    }

    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && word.len() > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Simple English pluralization.
pub fn pluralize(word: &str) -> String {
    match word {
        "person" => return "people".to_string(),
        "child" => return "children".to_string(),
        "Person" => return "People".to_string(),
        "Child" => return "Children".to_string(),
        _ => {}
    }

    if word.is_empty() {
        return word.to_string();
    }

    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh")
    {
        return format!("{word}es");
    }

    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }

    format!("{word}s")
}

/// Model name for an association name: `posts` -> `Post`, `generic_record` -> `GenericRecord`.
pub fn classify(name: &str) -> String {
    camelize(&singularize(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_model_names() {
        assert_eq!(underscore("Author"), "author");
        assert_eq!(underscore("GenericRecord"), "generic_record");
        assert_eq!(underscore("HTTPServer"), "http_server");
    }

    #[test]
    fn classify_association_names() {
        assert_eq!(classify("posts"), "Post");
        assert_eq!(classify("author"), "Author");
        assert_eq!(classify("generic_record"), "GenericRecord");
        assert_eq!(classify("categories"), "Category");
        assert_eq!(classify("addresses"), "Address");
    }

    #[test]
    fn singular_and_plural() {
        assert_eq!(singularize("posts"), "post");
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("class"), "class");
        assert_eq!(pluralize("Post"), "Posts");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Box"), "Boxes");
    }
}
