use std::path::Path;

/// Short repository name used as the report key.
///
/// A work tree is named after its directory; a bare `project.git` directory
/// after its stem. A path pointing at a `.git` directory uses the parent.
pub fn repository_name(path: &Path) -> String {
    let path = if path.file_name().is_some_and(|n| n == ".git") {
        path.parent().unwrap_or(path)
    } else {
        path
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    match name.strip_suffix(".git") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => name,
    }
}

/// Identifier a repository's report is stored under: its path relative to
/// the scan root, `/`-separated, with the naming rules of [`repository_name`]
/// applied to the last component. Falls back to the bare name when the
/// repository is the root itself or lies outside it.
pub fn repository_id(root: &Path, path: &Path) -> String {
    let name = repository_name(path);
    let path = if path.file_name().is_some_and(|n| n == ".git") {
        path.parent().unwrap_or(path)
    } else {
        path
    };

    let Ok(relative) = path.strip_prefix(root) else {
        return name;
    };
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.pop().is_none() {
        return name;
    }
    parts.push(name);
    parts.join("/")
}

/// Quote a string as a SQL literal.
pub fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Make `name` safe to use as a single file name.
pub fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn names_repositories() {
        assert_eq!(repository_name(&PathBuf::from("/src/widgets")), "widgets");
        assert_eq!(repository_name(&PathBuf::from("/src/widgets/.git")), "widgets");
        assert_eq!(repository_name(&PathBuf::from("/srv/git/widgets.git")), "widgets");
    }

    #[test]
    fn ids_keep_same_named_repositories_apart() {
        let root = PathBuf::from("/src");
        assert_eq!(repository_id(&root, &root.join("team-a/api")), "team-a/api");
        assert_eq!(repository_id(&root, &root.join("team-b/api/.git")), "team-b/api");
        assert_eq!(repository_id(&root, &root.join("mirrors/api.git")), "mirrors/api");
        assert_eq!(repository_id(&root, &root.join("widgets")), "widgets");
    }

    #[test]
    fn root_repository_falls_back_to_its_name() {
        let root = PathBuf::from("/src/widgets");
        assert_eq!(repository_id(&root, &root), "widgets");
        assert_eq!(repository_id(&root, &root.join(".git")), "widgets");
        assert_eq!(repository_id(&root, &PathBuf::from("/elsewhere/tools")), "tools");
    }

    #[test]
    fn quotes_sql_literals() {
        assert_eq!(sql_quote("o'brien"), "'o''brien'");
        assert_eq!(file_stem("a/b:c"), "a_b_c");
    }
}
