use std::path::Path;

use tree_sitter::Language;

pub struct LanguageConfig {
    pub name: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
}

impl LanguageConfig {
    pub fn get_all() -> Vec<LanguageConfig> {
        vec![typescript_config(), tsx_config(), javascript_config()]
    }

    pub fn get_by_extension(ext: &str) -> Option<LanguageConfig> {
        Self::get_all()
            .into_iter()
            .find(|c| c.extensions.contains(&ext))
    }

    pub fn get_by_path(path: &str) -> Option<LanguageConfig> {
        let ext = Path::new(path).extension().and_then(|e| e.to_str())?;
        Self::get_by_extension(ext)
    }
}

fn typescript_config() -> LanguageConfig {
    LanguageConfig {
        name: "typescript",
        language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        extensions: &["ts", "mts", "cts"],
    }
}

// `.ts` files cannot contain JSX, so TSX gets its own grammar.
fn tsx_config() -> LanguageConfig {
    LanguageConfig {
        name: "tsx",
        language: tree_sitter_typescript::LANGUAGE_TSX.into(),
        extensions: &["tsx"],
    }
}

fn javascript_config() -> LanguageConfig {
    LanguageConfig {
        name: "javascript",
        language: tree_sitter_javascript::LANGUAGE.into(),
        extensions: &["js", "jsx", "mjs", "cjs"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_path() {
        assert_eq!(LanguageConfig::get_by_path("src/a/index.tsx").unwrap().name, "tsx");
        assert_eq!(LanguageConfig::get_by_path("lib/util.ts").unwrap().name, "typescript");
        assert_eq!(LanguageConfig::get_by_path("app.jsx").unwrap().name, "javascript");
        assert!(LanguageConfig::get_by_path("main.py").is_none());
        assert!(LanguageConfig::get_by_path("Makefile").is_none());
    }
}
