/// Settings that change how a program is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Labels starting with one of these prefixes are local to the enclosing `SUBROUTINE`.
    /// Without prefixes every label is global.
    pub local_label_prefixes: Vec<String>,
}

impl AnalyzerConfig {
    pub fn with_local_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            local_label_prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|prefix: &String| !prefix.is_empty())
                .collect(),
        }
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.local_label_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}
