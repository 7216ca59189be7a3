crate::define_id_enum! {
    /// Programming language recognised by file extension
    LanguageId {
        Python => "python" : "Python",
        JavaScript => "javascript" : "JavaScript",
        TypeScript => "typescript" : "TypeScript",
        Cpp => "c++" : "C++" | "C" | "cpp",
        Java => "java" : "Java",
        CSharp => "c#" : "C#" | "csharp",
        Ruby => "ruby" : "Ruby",
        Php => "php" : "PHP",
        Go => "go" : "Go",
        Rust => "rust" : "Rust",
        Swift => "swift" : "Swift",
        Kotlin => "kotlin" : "Kotlin",
        Scala => "scala" : "Scala",
        Clojure => "clojure" : "Clojure",
        Haskell => "haskell" : "Haskell",
        Erlang => "erlang" : "Erlang",
        Elixir => "elixir" : "Elixir",
        Lua => "lua" : "Lua",
        Perl => "perl" : "Perl",
        R => "r" : "R",
        Julia => "julia" : "Julia",
        Dart => "dart" : "Dart",
        CoffeeScript => "coffeescript" : "CoffeeScript",
        OCaml => "ocaml" : "OCaml",
        FSharp => "f#" : "F#" | "fsharp",
        Scheme => "scheme" : "Scheme",
        CommonLisp => "common-lisp" : "Common Lisp",
        Racket => "racket" : "Racket",
        Nim => "nim" : "Nim",
        Crystal => "crystal" : "Crystal",
        Groovy => "groovy" : "Groovy",
        D => "d" : "D",
        Fortran => "fortran" : "Fortran",
        Cobol => "cobol" : "COBOL",
        Jupyter => "jupyter" : "Jupyter",
    }
}

impl LanguageId {
    /// File extensions (with leading dot) that identify this language
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &[".py"],
            Self::JavaScript => &[".js", ".jsx", ".mjs", ".cjs"],
            Self::TypeScript => &[".ts", ".tsx"],
            Self::Cpp => &[".cpp", ".cxx", ".cc", ".c", ".hpp", ".hxx", ".hh", ".h"],
            Self::Java => &[".java"],
            Self::CSharp => &[".cs"],
            Self::Ruby => &[".rb"],
            Self::Php => &[".php"],
            Self::Go => &[".go"],
            Self::Rust => &[".rs"],
            Self::Swift => &[".swift"],
            Self::Kotlin => &[".kt"],
            Self::Scala => &[".scala"],
            Self::Clojure => &[".clj"],
            Self::Haskell => &[".hs"],
            Self::Erlang => &[".erl"],
            Self::Elixir => &[".ex", ".exs"],
            Self::Lua => &[".lua"],
            Self::Perl => &[".pl"],
            Self::R => &[".r"],
            Self::Julia => &[".jl"],
            Self::Dart => &[".dart"],
            Self::CoffeeScript => &[".coffee"],
            Self::OCaml => &[".ml", ".mli"],
            Self::FSharp => &[".fs", ".fsi", ".fsx"],
            Self::Scheme => &[".scm", ".ss"],
            Self::CommonLisp => &[".lisp", ".lsp"],
            Self::Racket => &[".rkt"],
            Self::Nim => &[".nim"],
            Self::Crystal => &[".cr"],
            Self::Groovy => &[".groovy"],
            Self::D => &[".d"],
            Self::Fortran => &[".f", ".f90", ".f95"],
            Self::Cobol => &[".cbl", ".cob", ".cpy"],
            Self::Jupyter => &[".ipynb"],
        }
    }

    /// Looks up the language owning an extension; matching is case-insensitive
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.to_lowercase();
        Self::all_variants()
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    /// Language whose imports are extracted when this language dominates.
    /// Notebooks are Python underneath.
    pub fn source_language(&self) -> Self {
        match self {
            Self::Jupyter => Self::Python,
            other => *other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_serialization() {
        assert_eq!(
            serde_json::to_string(&LanguageId::Cpp).unwrap(),
            "\"c++\""
        );
        let parsed: LanguageId = serde_json::from_str("\"python\"").unwrap();
        assert_eq!(parsed, LanguageId::Python);
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        assert!(serde_json::from_str::<LanguageId>("\"brainfuck\"").is_err());
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(LanguageId::from_extension(".py"), Some(LanguageId::Python));
        assert_eq!(LanguageId::from_extension(".H"), Some(LanguageId::Cpp));
        assert_eq!(
            LanguageId::from_extension(".ipynb"),
            Some(LanguageId::Jupyter)
        );
        assert_eq!(LanguageId::from_extension(".md"), None);
        assert_eq!(LanguageId::from_extension(""), None);
    }

    #[test]
    fn test_extensions_are_unique_across_languages() {
        let mut seen = std::collections::HashSet::new();
        for lang in LanguageId::all_variants() {
            for ext in lang.extensions() {
                assert!(seen.insert(*ext), "duplicate extension {}", ext);
            }
        }
    }

    #[test]
    fn test_notebooks_are_python_sources() {
        assert_eq!(LanguageId::Jupyter.source_language(), LanguageId::Python);
        assert_eq!(LanguageId::Go.source_language(), LanguageId::Go);
    }
}
