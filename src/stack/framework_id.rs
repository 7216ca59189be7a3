crate::define_id_enum! {
    /// Web framework recognised from `package.json` / `angular.json`
    FrameworkId {
        React => "react" : "React",
        NextJs => "nextjs" : "Next.js" | "Next",
        Vue => "vue" : "Vue",
        Nuxt => "nuxt" : "Nuxt",
        Svelte => "svelte" : "Svelte",
        Angular => "angular" : "Angular",
    }
}

/// `package.json` substring keywords, in evaluation order. Later matches
/// overwrite earlier ones.
pub const PACKAGE_JSON_KEYWORDS: &[(&str, FrameworkId)] = &[
    ("react", FrameworkId::React),
    ("next", FrameworkId::NextJs),
    ("vue", FrameworkId::Vue),
    ("nuxt", FrameworkId::Nuxt),
    ("svelte", FrameworkId::Svelte),
];

impl FrameworkId {
    /// Frameworks built and served with npm on a Node base image
    pub fn is_node_family(&self) -> bool {
        match self {
            Self::React | Self::NextJs | Self::Vue | Self::Nuxt | Self::Svelte | Self::Angular => {
                true
            }
        }
    }

    /// Container entry command used when the project is spun up
    pub fn entry_command(&self) -> &'static [&'static str] {
        if self.is_node_family() {
            &["npm", "start"]
        } else {
            &["bash"]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_id_serialization() {
        assert_eq!(
            serde_json::to_string(&FrameworkId::NextJs).unwrap(),
            "\"nextjs\""
        );
        let parsed: FrameworkId = serde_json::from_str("\"svelte\"").unwrap();
        assert_eq!(parsed, FrameworkId::Svelte);
    }

    #[test]
    fn test_framework_id_name() {
        assert_eq!(FrameworkId::NextJs.name(), "Next.js");
        assert_eq!(FrameworkId::from_name("Next"), Some(FrameworkId::NextJs));
        assert_eq!(FrameworkId::Angular.to_string(), "Angular");
    }

    #[test]
    fn test_closed_set_rejects_unknown() {
        assert!(serde_json::from_str::<FrameworkId>("\"qwik\"").is_err());
        assert_eq!(FrameworkId::from_key("django"), None);
    }

    #[test]
    fn test_all_frameworks_are_node_family() {
        for framework in FrameworkId::all_variants() {
            assert!(framework.is_node_family());
            assert_eq!(framework.entry_command(), &["npm", "start"]);
        }
    }

    #[test]
    fn test_keyword_table_covers_every_non_angular_framework() {
        for framework in FrameworkId::all_variants() {
            if *framework == FrameworkId::Angular {
                continue;
            }
            assert!(PACKAGE_JSON_KEYWORDS.iter().any(|(_, f)| f == framework));
        }
    }
}
