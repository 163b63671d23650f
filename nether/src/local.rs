use std::path::Path;

use nether_core::types::DocumentTitle;

pub mod watcher;

/// Change of a managed document in local folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalChange {
    Modified(DocumentTitle),
    Removed(DocumentTitle),
}

impl LocalChange {
    pub fn title(&self) -> &DocumentTitle {
        match self {
            LocalChange::Modified(title) | LocalChange::Removed(title) => title,
        }
    }
}

/// Hidden files (including settings file) and editor temporary files
pub fn ignore_file(relative_path: &Path) -> bool {
    relative_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(|name| {
                name.starts_with('.')
                    || name.starts_with('~')
                    || name.ends_with('~')
                    || name.starts_with('#')
            })
            .unwrap_or(true)
    })
}

/// Title of document at given relative path, `None` if not a managed document
pub fn managed_title(relative_path: &Path) -> Option<DocumentTitle> {
    if ignore_file(relative_path) {
        return None;
    }

    DocumentTitle::from_relative_path(relative_path)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("Notes.md", Some("Notes"))]
    #[case("journal/2024.md", Some("journal/2024"))]
    #[case("Notes.txt", None)]
    #[case(".nether.json", None)]
    #[case(".obsidian/workspace.md", None)]
    #[case("~Notes.md", None)]
    #[case("Notes.md~", None)]
    #[case("#Notes.md#", None)]
    #[case("journal", None)]
    fn test_managed_title(#[case] relative_path: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            managed_title(&PathBuf::from(relative_path)),
            expected.map(DocumentTitle::from)
        );
    }
}
