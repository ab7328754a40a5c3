//! Include/ignore glob filtering of build output paths.
//!
//! Matching rules:
//! - case-sensitive; `*` stops at `/`, `**` spans directories, `{a,b}`
//!   alternates
//! - a pattern without `/` is matched against the basename only
//! - wildcards never match a dot-prefixed segment unless dot matching is on;
//!   a dot segment is only accepted where the pattern spells out a segment
//!   starting with `.` that matches it

use globset::{Glob, GlobBuilder, GlobMatcher};

use crate::error::PluginError;

struct Pattern {
    matcher: GlobMatcher,
    match_base: bool,
    /// Pattern segments that start with a literal `.`.
    dot_segments: Vec<GlobMatcher>,
}

impl Pattern {
    fn new(pattern: &str) -> Result<Self, PluginError> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| PluginError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            matcher: glob.compile_matcher(),
            match_base: !pattern.contains('/'),
            dot_segments: pattern
                .split('/')
                .filter(|segment| segment.starts_with('.'))
                .filter_map(|segment| Glob::new(segment).ok())
                .map(|glob| glob.compile_matcher())
                .collect(),
        })
    }

    fn is_match(&self, path: &str, dot: bool) -> bool {
        let subject = if self.match_base {
            path.rsplit('/').next().unwrap_or(path)
        } else {
            path
        };

        if !dot
            && subject
                .split('/')
                .any(|segment| segment.starts_with('.') && !self.names_segment(segment))
        {
            return false;
        }
        self.matcher.is_match(subject)
    }

    fn names_segment(&self, segment: &str) -> bool {
        self.dot_segments.iter().any(|m| m.is_match(segment))
    }
}

/// Compiled include/ignore filter.
pub struct FileFilter {
    include: Pattern,
    ignore: Option<Pattern>,
    dot_folders: bool,
}

impl FileFilter {
    /// Compiles the patterns. `dot_folders` applies to the include pattern.
    pub fn new(include: &str, ignore: Option<&str>, dot_folders: bool) -> Result<Self, PluginError> {
        Ok(Self {
            include: Pattern::new(include)?,
            ignore: ignore.map(Pattern::new).transpose()?,
            dot_folders,
        })
    }

    /// Whether `path` is included and not ignored.
    pub fn matches(&self, path: &str) -> bool {
        if !self.include.is_match(path, self.dot_folders) {
            return false;
        }
        match &self.ignore {
            Some(ignore) => !ignore.is_match(path, false),
            None => true,
        }
    }

    /// Keeps the matching paths, in their original order.
    pub fn apply(&self, paths: &[String]) -> Vec<String> {
        paths.iter().filter(|p| self.matches(p)).cloned().collect()
    }
}
