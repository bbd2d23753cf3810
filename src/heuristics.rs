//! Review keywords an endpoint snippet is expected to provoke.
//!
//! Used to score LLM critiques: a reviewer that misses every keyword of a
//! group probably missed the underlying problem.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn route_decorator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@(router|app)\.(get|post|put|delete|patch)\(").expect("valid regex")
    })
}

fn camel_case_def() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"def [a-z]+[A-Z]\w+\(").expect("valid regex"))
}

/// Sorted, de-duplicated keywords for `code`.
pub fn expected_keywords(code: &str) -> Vec<String> {
    let mut keywords: BTreeSet<&'static str> = BTreeSet::new();
    let lower = code.to_lowercase();

    if route_decorator().is_match(code) {
        if !code.contains("response_model") {
            keywords.extend(["response_model", "output schema", "return type"]);
        }
        if !code.contains("status_code") {
            keywords.extend(["status_code", "status explícito", "200", "201"]);
        }
        if !code.contains("tags=[") && !code.contains("tags =") {
            keywords.extend(["tags", "doc", "swagger", "organization"]);
        }
    }

    if (code.contains("db.query") || code.contains("requests.")) && !code.contains("try:") {
        keywords.extend(["try-except", "error handling", "tratamento de erro", "exception"]);
    }

    if camel_case_def().is_match(code) {
        keywords.extend(["snake_case", "naming convention", "pythonic"]);
    }

    if code.contains("eval(") || code.contains("exec(") {
        keywords.extend(["security", "eval", "code injection", "perigoso"]);
    }

    if lower.contains("password") && !code.contains("response_model") {
        keywords.extend(["sensitive", "password", "security", "leak"]);
    }

    keywords.into_iter().map(str::to_string).collect()
}
