use super::{top_level_module, ExtractError, ImportSet};
use tree_sitter::{Node, Parser};
use tracing::debug;

/// Tree-sitter backed import collector for Python sources
pub struct PythonImportExtractor {
    parser: Parser,
}

impl PythonImportExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ExtractError::Grammar(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Extracts imports, retrying once on normalized source if the first parse fails
    pub fn extract(&mut self, source: &str) -> Result<ImportSet, ExtractError> {
        match self.parse_imports(source) {
            Ok(imports) => Ok(imports),
            Err(_) => {
                debug!("Parse failed, retrying with normalized source");
                self.parse_imports(&normalize_source(source))
            }
        }
    }

    /// Single parse; any syntax error in the tree fails the whole file
    pub fn parse_imports(&mut self, source: &str) -> Result<ImportSet, ExtractError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or(ExtractError::Syntax)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ExtractError::Syntax);
        }

        let mut imports = ImportSet::new();
        collect_imports(root, source.as_bytes(), &mut imports);
        Ok(imports)
    }
}

fn collect_imports(node: Node, source: &[u8], imports: &mut ImportSet) {
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let dotted = if name.kind() == "aliased_import" {
                    name.child_by_field_name("name")
                } else {
                    Some(name)
                };
                if let Some(module) = dotted.and_then(|n| module_of(n, source)) {
                    imports.insert(module);
                }
            }
        }
        "import_from_statement" => {
            // `relative_import` module names are same-package imports
            if let Some(module_name) = node.child_by_field_name("module_name") {
                if module_name.kind() == "dotted_name" {
                    if let Some(module) = module_of(module_name, source) {
                        imports.insert(module);
                    }
                }
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_imports(child, source, imports);
            }
        }
    }
}

fn module_of(node: Node, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().and_then(top_level_module)
}

/// Best-effort style cleanup: BOM, CRLF, tabs to four spaces, trailing whitespace
pub fn normalize_source(source: &str) -> String {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut normalized = String::with_capacity(source.len());

    for line in source.replace("\r\n", "\n").replace('\r', "\n").lines() {
        normalized.push_str(line.replace('\t', "    ").trim_end());
        normalized.push('\n');
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imports(source: &str) -> Vec<String> {
        let mut extractor = PythonImportExtractor::new().unwrap();
        extractor.extract(source).unwrap().into_iter().collect()
    }

    #[test]
    fn test_plain_and_aliased_imports() {
        let source = "import os\nimport numpy as np, scipy.linalg\nimport xml.etree.ElementTree as ET\n";
        assert_eq!(imports(source), vec!["numpy", "os", "scipy", "xml"]);
    }

    #[test]
    fn test_from_imports() {
        let source = "from requests.adapters import HTTPAdapter\nfrom flask import Flask, jsonify\n";
        assert_eq!(imports(source), vec!["flask", "requests"]);
    }

    #[test]
    fn test_relative_and_future_imports_excluded() {
        let source = "from __future__ import annotations\nfrom . import sibling\nfrom .models import User\nfrom ..core import thing\nimport yaml\n";
        assert_eq!(imports(source), vec!["yaml"]);
    }

    #[test]
    fn test_namespace_package_keeps_two_segments() {
        let source = "import google.generativeai as genai\nfrom google.cloud import storage\n";
        assert_eq!(imports(source), vec!["google.cloud", "google.generativeai"]);
    }

    #[test]
    fn test_nested_imports_are_found() {
        let source = r#"
def load():
    try:
        import ujson as json
    except ImportError:
        import json
    return json

class Model:
    def fit(self):
        from sklearn.linear_model import LinearRegression
        return LinearRegression()
"#;
        assert_eq!(imports(source), vec!["json", "sklearn", "ujson"]);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let mut extractor = PythonImportExtractor::new().unwrap();
        assert!(matches!(
            extractor.extract("import os\ndef f(:\n    pass\n"),
            Err(ExtractError::Syntax)
        ));
    }

    #[test]
    fn test_crlf_and_bom_sources_parse() {
        let source = "\u{feff}import os\r\nif True:\r\n\timport requests  \r\n";
        assert_eq!(imports(source), vec!["os", "requests"]);
    }

    #[test]
    fn test_normalize_source() {
        assert_eq!(
            normalize_source("\u{feff}a = 1  \r\n\tb = 2\r\n"),
            "a = 1\n    b = 2\n"
        );
    }
}
