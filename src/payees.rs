use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::normalize::clean_description;

/// One matching rule as it appears in a rule file: simple keywords checked
/// before regex patterns, both case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayeeRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regex: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<PayeeRule>,
}

struct CompiledRule {
    name: String,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

/// The ordered rule set, constructed once at startup and passed by reference.
///
/// Order is a contract: authors rely on earlier rules shadowing later, broader
/// ones, so first match always wins.
pub struct PayeeRules {
    rules: Vec<CompiledRule>,
    skipped_patterns: usize,
}

impl PayeeRules {
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            skipped_patterns: 0,
        }
    }

    /// Compile a rule list in order. A malformed regex is reported and dropped;
    /// the rule itself and everything after it stay live.
    pub fn from_rules(raw: Vec<PayeeRule>) -> Self {
        let mut rules = Vec::with_capacity(raw.len());
        let mut skipped_patterns = 0usize;
        for rule in raw {
            let mut patterns = Vec::with_capacity(rule.regex.len());
            for pattern in &rule.regex {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => patterns.push(re),
                    Err(e) => {
                        eprintln!(
                            "Warning: invalid regex '{pattern}' for rule '{}': {e}",
                            rule.name
                        );
                        skipped_patterns += 1;
                    }
                }
            }
            rules.push(CompiledRule {
                name: rule.name,
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                patterns,
            });
        }
        Self {
            rules,
            skipped_patterns,
        }
    }

    /// Load rules from a single JSON file or a directory of `*.json` files
    /// (filename order). An unreadable or unparseable file is skipped with a
    /// warning; a missing path yields an empty rule set.
    pub fn load(path: &Path) -> Result<Self> {
        let mut raw = Vec::new();
        if path.is_dir() {
            let mut entries: Vec<_> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
                .collect();
            entries.sort();
            for file in entries {
                match read_rule_file(&file) {
                    Ok(mut rules) => {
                        println!("Loaded {} rules from {}", rules.len(), file.display());
                        raw.append(&mut rules);
                    }
                    Err(e) => eprintln!("Warning: failed to load rules from {}: {e}", file.display()),
                }
            }
        } else if path.is_file() {
            match read_rule_file(path) {
                Ok(mut rules) => {
                    println!("Loaded {} rules from {}", rules.len(), path.display());
                    raw.append(&mut rules);
                }
                Err(e) => eprintln!("Warning: failed to load rules from {}: {e}", path.display()),
            }
        } else {
            eprintln!("Warning: payee rules path not found at {}", path.display());
        }
        Ok(Self::from_rules(raw))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn skipped_patterns(&self) -> usize {
        self.skipped_patterns
    }

    /// Resolve a raw description to a canonical payee name. No rule hit
    /// returns the cleaned input unchanged.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let cleaned = clean_description(raw);
        let haystack = cleaned.to_lowercase();
        for rule in &self.rules {
            if rule.keywords.iter().any(|k| haystack.contains(k.as_str())) {
                return rule.name.clone();
            }
            if rule.patterns.iter().any(|re| re.is_match(&cleaned)) {
                return rule.name.clone();
            }
        }
        cleaned
    }
}

fn read_rule_file(path: &Path) -> Result<Vec<PayeeRule>> {
    let content = std::fs::read_to_string(path)?;
    let file: RuleFile = serde_json::from_str(&content)?;
    Ok(file.rules)
}
