//! Analyzer (C3) — parses a single source file and extracts the metadata
//! that gets embedded and indexed: description, usage, dependencies,
//! tags, and category.

use std::path::Path;

use crate::error::CoreError;
use crate::models::{AnalyzedScript, Category};

const TAG_KEYWORDS: &[&str] = &[
    "audio",
    "video",
    "gpu",
    "nvidia",
    "amd",
    "drivers",
    "configuration",
    "config",
    "setup",
    "install",
    "pulseaudio",
    "pipewire",
    "alsa",
    "davinci",
    "obs",
    "system",
    "network",
    "disk",
    "diagnostic",
    "monitor",
    "service",
    "docker",
    "deployment",
    "build",
    "test",
    "database",
    "api",
];

pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Analyzer
    }

    /// Read and analyze a single file, producing metadata without embedding fields.
    pub fn analyze(&self, path: &Path) -> Result<AnalyzedScript, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CoreError::AnalyzerError {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let resolved_str = resolved.display().to_string();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let (description, usage) = extract_description_and_usage(&contents);
        let dependencies = extract_dependencies(&contents);
        let tags = extract_tags(&contents);
        let category = infer_category(&resolved_str);

        Ok(AnalyzedScript {
            name,
            path: resolved_str,
            category: category.as_str().to_string(),
            description,
            usage,
            tags,
            dependencies,
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip a leading comment marker (`/**`, `*`, `//`, `*/`) and surrounding whitespace.
fn strip_comment_marker(line: &str) -> String {
    let trimmed = line.trim();
    let trimmed = trimmed
        .strip_prefix("/**")
        .or_else(|| trimmed.strip_prefix("/*"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("*/").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix('*').unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("//").unwrap_or(trimmed);
    trimmed.trim().to_string()
}

fn find_doc_block(contents: &str) -> Option<Vec<&str>> {
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.iter().position(|l| l.trim_start().starts_with("/**"))?;
    let end = lines[start..]
        .iter()
        .position(|l| l.trim_end().ends_with("*/"))
        .map(|rel| start + rel)?;
    Some(lines[start..=end].to_vec())
}

fn extract_description_and_usage(contents: &str) -> (Option<String>, Option<String>) {
    if let Some(block) = find_doc_block(contents) {
        let mut description_lines = Vec::new();
        let mut usage_lines: Vec<String> = Vec::new();
        let mut in_usage = false;

        for raw in &block {
            let stripped = strip_comment_marker(raw);
            if stripped.is_empty() {
                continue;
            }
            let lower = stripped.to_lowercase();
            if lower.starts_with("usage:") {
                in_usage = true;
                let rest = stripped["usage:".len()..].trim().to_string();
                if !rest.is_empty() {
                    usage_lines.push(rest);
                }
                continue;
            }
            if in_usage {
                usage_lines.push(stripped);
                continue;
            }
            if lower.starts_with("usage") {
                continue;
            }
            description_lines.push(stripped);
        }

        let description = if description_lines.is_empty() {
            None
        } else {
            Some(description_lines.join(" "))
        };
        let usage = if usage_lines.is_empty() {
            None
        } else {
            Some(usage_lines.join("\n"))
        };
        return (description, usage);
    }

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.len() >= 2 && trimmed[..2].eq_ignore_ascii_case("//") {
            let rest = trimmed[2..].trim();
            if let Some(text) = rest.strip_prefix("Description:").or_else(|| {
                if rest.to_lowercase().starts_with("description:") {
                    Some(&rest["description:".len()..])
                } else {
                    None
                }
            }) {
                return (Some(text.trim().to_string()), None);
            }
        }
    }

    (None, None)
}

fn extract_dependencies(contents: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let bytes = contents.as_bytes();
    let mut search_from = 0usize;

    while let Some(rel) = contents[search_from..].find("from ") {
        let idx = search_from + rel + "from ".len();
        if idx >= bytes.len() {
            break;
        }
        let quote = bytes[idx] as char;
        if quote == '"' || quote == '\'' {
            if let Some(end_rel) = contents[idx + 1..].find(quote) {
                let spec = &contents[idx + 1..idx + 1 + end_rel];
                deps.push(spec.to_string());
                search_from = idx + 1 + end_rel + 1;
                continue;
            }
        }
        search_from = idx;
    }

    deps
}

fn extract_tags(contents: &str) -> Vec<String> {
    let lowered = contents.to_lowercase();
    let mut tags: Vec<String> = TAG_KEYWORDS
        .iter()
        .filter(|kw| lowered.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

fn infer_category(normalized_path: &str) -> Category {
    let lowered = normalized_path.to_lowercase();
    let segments: Vec<&str> = lowered.split(['/', '\\']).collect();
    for candidate in ["audio", "system", "dev"] {
        if segments.iter().any(|s| *s == candidate) {
            return match candidate {
                "audio" => Category::Audio,
                "system" => Category::System,
                "dev" => Category::Dev,
                _ => unreachable!(),
            };
        }
    }
    Category::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str, rel_path: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join(rel_path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(&full).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, full)
    }

    #[test]
    fn extracts_description_usage_dependencies_and_tags() {
        let content = r#"/**
 * Configure external USB speakers via PulseAudio.
 *
 * Usage:
 *   run configure-speakers --device hdmi
 */
import { logger } from "./logger";
"#;
        let (_dir, path) = write_temp(content, "scripts/audio/configure-speakers.ts");
        let analyzed = Analyzer::new().analyze(&path).unwrap();

        assert_eq!(analyzed.name, "configure-speakers");
        assert_eq!(analyzed.category, "audio");
        assert_eq!(
            analyzed.description.as_deref(),
            Some("Configure external USB speakers via PulseAudio.")
        );
        assert!(analyzed.usage.as_deref().unwrap().starts_with("run configure-speakers --device hdmi"));
        assert_eq!(analyzed.dependencies, vec!["./logger".to_string()]);
        assert!(analyzed.tags.contains(&"audio".to_string()));
        assert!(analyzed.tags.contains(&"configuration".to_string()));
        assert!(analyzed.tags.contains(&"pulseaudio".to_string()));
    }

    #[test]
    fn category_falls_back_to_other() {
        let (_dir, path) = write_temp("// nothing interesting here\n", "tools/unused/thing.ts");
        let analyzed = Analyzer::new().analyze(&path).unwrap();
        assert_eq!(analyzed.category, "other");
    }

    #[test]
    fn single_line_description_comment_accepted() {
        let (_dir, path) = write_temp(
            "// description: Restart the audio daemon\nconst x = 1;\n",
            "scripts/system/restart-audio.ts",
        );
        let analyzed = Analyzer::new().analyze(&path).unwrap();
        assert_eq!(
            analyzed.description.as_deref(),
            Some("Restart the audio daemon")
        );
    }

    #[test]
    fn tags_are_sorted_and_deduplicated() {
        let (_dir, path) = write_temp(
            "// audio audio AUDIO config setup\n",
            "scripts/other/noop.ts",
        );
        let analyzed = Analyzer::new().analyze(&path).unwrap();
        let mut sorted = analyzed.tags.clone();
        sorted.sort();
        assert_eq!(analyzed.tags, sorted);
        let unique: std::collections::HashSet<_> = analyzed.tags.iter().collect();
        assert_eq!(unique.len(), analyzed.tags.len());
    }

    #[test]
    fn unreadable_file_yields_analyzer_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ts");
        let err = Analyzer::new().analyze(&missing).unwrap_err();
        assert!(matches!(err, CoreError::AnalyzerError { .. }));
    }
}
