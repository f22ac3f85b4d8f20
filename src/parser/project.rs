//! MSBuild project parser
//!
//! Extracts package references from project files and central package
//! version files. Each reference must sit on a single line; a trailing
//! comment may pin the version glob used when updating it.
//!
//! Format examples:
//! - `<PackageReference Include="Sundew.Base" Version="1.2.3" />`
//! - `<PackageVersion Include="Sundew.Base" Version="1.2.3" />` (Directory.Packages.props)
//! - `<PackageReference Include="Sundew.Base" Version="1.2.3" /> <!-- stagefeed: 1.2.* -->`

use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::glob::GlobPattern;
use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::{PackageReference, is_project_file};

/// Matches any package id when no id filter is given
const ANY_ID: &str = r#"[^"]+"#;

/// Build output and tool directories never contain project sources
const SKIPPED_DIRECTORIES: &[&str] = &["bin", "obj", "node_modules"];

/// Parser for `*.csproj`, `*.fsproj`, `*.vbproj` and `Directory.Packages.props`
pub struct ProjectParser {
    /// Regex for a reference line, with `Id`, `Version` and `Pattern` groups
    reference_re: Regex,
}

impl ProjectParser {
    pub fn new() -> Self {
        Self::with_id_expression(ANY_ID).unwrap()
    }

    /// Only report references whose id matches the glob `id_pattern`
    pub fn with_id_filter(id_pattern: &str) -> Result<Self, ParseError> {
        let invalid = |source| ParseError::InvalidPattern {
            pattern: id_pattern.to_string(),
            source,
        };
        let glob = GlobPattern::new(id_pattern, false).map_err(invalid)?;
        Self::with_id_expression(glob.expression()).map_err(invalid)
    }

    fn with_id_expression(id_expression: &str) -> Result<Self, regex::Error> {
        let expression = format!(
            r#"<Package(?:Reference|Version)\s+(?:Include|Update)\s*=\s*"(?<Id>{id_expression})"\s+Version\s*=\s*"(?<Version>[^"]*)"[^>]*>(?:[ \t]*</Package(?:Reference|Version)\s*>)?(?:[ \t]*<!--\s*stagefeed:\s*(?<Pattern>\S+?)\s*-->)?"#
        );
        let reference_re = RegexBuilder::new(&expression)
            .case_insensitive(true)
            .build()?;
        Ok(Self { reference_re })
    }

    /// Parse every project file below `root`, in path order
    pub fn scan(&self, root: &Path) -> Result<Vec<(PathBuf, Vec<PackageReference>)>, ParseError> {
        let mut results = Vec::new();

        for path in find_project_files(root)? {
            let content = std::fs::read_to_string(&path)?;
            let references = self.parse(&content)?;
            debug!("Found {} package references in {:?}", references.len(), path);
            if !references.is_empty() {
                results.push((path, references));
            }
        }

        Ok(results)
    }
}

impl Default for ProjectParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for ProjectParser {
    fn can_parse(&self, path: &str) -> bool {
        is_project_file(path)
    }

    fn parse(&self, content: &str) -> Result<Vec<PackageReference>, ParseError> {
        let mut results = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            for caps in self.reference_re.captures_iter(line) {
                let (Some(id), Some(version)) = (caps.name("Id"), caps.name("Version")) else {
                    continue;
                };

                results.push(PackageReference {
                    id: id.as_str().to_string(),
                    version: version.as_str().to_string(),
                    version_pattern: caps.name("Pattern").map(|m| m.as_str().to_string()),
                    line: line_num,
                    column: version.start(),
                });
            }
        }

        Ok(results)
    }
}

/// Project files below `root`, sorted by path
pub fn find_project_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(directory) = pending.pop() {
        for entry in std::fs::read_dir(&directory)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if entry.file_type()?.is_dir() {
                if !name.starts_with('.') && !SKIPPED_DIRECTORIES.contains(&name.as_str()) {
                    pending.push(path);
                }
            } else if is_project_file(&name) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Sundew.Base" Version="1.2.3" />
    <PackageReference Include="Sundew.Injection" Version="2.0.0-pre.1"></PackageReference>
    <PackageReference Include="Newtonsoft.Json" Version="13.0.1" /> <!-- stagefeed: 13.* -->
    <ProjectReference Include="..\Other\Other.csproj" />
  </ItemGroup>
</Project>
"#;

    #[test]
    fn parse_extracts_package_references() {
        let parser = ProjectParser::new();

        let result = parser.parse(PROJECT).unwrap();

        assert_eq!(
            result,
            vec![
                PackageReference {
                    id: "Sundew.Base".to_string(),
                    version: "1.2.3".to_string(),
                    version_pattern: None,
                    line: 2,
                    column: 53,
                },
                PackageReference {
                    id: "Sundew.Injection".to_string(),
                    version: "2.0.0-pre.1".to_string(),
                    version_pattern: None,
                    line: 3,
                    column: 58,
                },
                PackageReference {
                    id: "Newtonsoft.Json".to_string(),
                    version: "13.0.1".to_string(),
                    version_pattern: Some("13.*".to_string()),
                    line: 4,
                    column: 57,
                },
            ]
        );
    }

    #[test]
    fn parse_reads_central_package_versions() {
        let parser = ProjectParser::new();
        let content = r#"<Project>
  <ItemGroup>
    <PackageVersion Include="Sundew.Base" Version="4.0.0" />
  </ItemGroup>
</Project>"#;

        let result = parser.parse(content).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "Sundew.Base");
        assert_eq!(result[0].version, "4.0.0");
    }

    #[test]
    fn parse_comment_on_next_line_is_not_an_override() {
        let parser = ProjectParser::new();
        let content = "<PackageReference Include=\"Sundew.Base\" Version=\"1.0.0\" />\n<!-- stagefeed: 1.* -->";

        let result = parser.parse(content).unwrap();

        assert_eq!(result[0].version_pattern, None);
    }

    #[rstest]
    #[case("Sundew.*", vec!["Sundew.Base", "Sundew.Injection"])]
    #[case("sundew.base", vec!["Sundew.Base"])]
    #[case("*.Json", vec!["Newtonsoft.Json"])]
    #[case("Missing", vec![])]
    fn with_id_filter_restricts_references(#[case] pattern: &str, #[case] expected: Vec<&str>) {
        let parser = ProjectParser::with_id_filter(pattern).unwrap();

        let result = parser.parse(PROJECT).unwrap();

        assert_eq!(
            result.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            expected
        );
    }

    #[test]
    fn scan_finds_projects_and_skips_build_output() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("src/App");
        let obj = app.join("obj");
        std::fs::create_dir_all(&obj).unwrap();
        std::fs::write(app.join("App.csproj"), PROJECT).unwrap();
        std::fs::write(obj.join("Generated.csproj"), PROJECT).unwrap();
        std::fs::write(dir.path().join("README.md"), "PackageReference").unwrap();
        std::fs::write(
            dir.path().join("Directory.Packages.props"),
            r#"<PackageVersion Include="Sundew.Base" Version="1.0.0" />"#,
        )
        .unwrap();

        let result = ProjectParser::new().scan(dir.path()).unwrap();

        let paths: Vec<_> = result.iter().map(|(path, _)| path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                dir.path().join("Directory.Packages.props"),
                app.join("App.csproj"),
            ]
        );
        assert_eq!(result[1].1.len(), 3);
    }
}
