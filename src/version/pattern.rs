use regex::Regex;

use super::{SemanticVersion, VersionError};

/// A regular expression whose first capture group holds a version string.
#[derive(Debug, Clone)]
pub struct VersionPattern {
    regex: Regex,
}

impl VersionPattern {
    pub fn new(pattern: &str) -> Result<Self, VersionError> {
        let regex = Regex::new(pattern).map_err(|e| VersionError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        // captures_len counts the implicit whole-match group
        if regex.captures_len() < 2 {
            return Err(VersionError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern needs a capture group around the version".to_string(),
            });
        }

        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    fn not_found(&self) -> VersionError {
        VersionError::NotFound {
            pattern: self.as_str().to_string(),
        }
    }

    /// Text of the first match's capture group, exactly as written.
    pub fn capture<'t>(&self, text: &'t str) -> Result<&'t str, VersionError> {
        let captures = self.regex.captures(text).ok_or_else(|| self.not_found())?;
        let version = captures.get(1).ok_or_else(|| self.not_found())?;
        Ok(version.as_str())
    }

    /// Returns the version captured by the first match.
    pub fn extract(&self, text: &str) -> Result<SemanticVersion, VersionError> {
        self.capture(text)?.parse()
    }

    /// Replaces the captured group of every match with `version`.
    ///
    /// Bytes outside the capture groups are copied through untouched.
    pub fn rewrite(&self, text: &str, version: &SemanticVersion) -> Result<String, VersionError> {
        let replacement = version.to_string();
        let mut rewritten = String::with_capacity(text.len());
        let mut last = 0;
        let mut replaced = false;

        for captures in self.regex.captures_iter(text) {
            // Optional groups may not participate in a match
            let Some(group) = captures.get(1) else {
                continue;
            };
            rewritten.push_str(&text[last..group.start()]);
            rewritten.push_str(&replacement);
            last = group.end();
            replaced = true;
        }

        if !replaced {
            return Err(self.not_found());
        }

        rewritten.push_str(&text[last..]);
        Ok(rewritten)
    }
}
