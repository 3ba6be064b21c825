//! # INI Writer
//!
//! Minimal builder for the INI-style unit files quadlet reads:
//! `[Section]` headers, `Key=Value` lines, one blank line between
//! sections, no blank line at the end or within a section.

#[derive(Debug)]
pub struct IniDocument {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl IniDocument {
    #[must_use]
    pub fn new() -> Self {
        Self { sections: Vec::new() }
    }

    pub fn section(&mut self, name: &str) -> &mut Self {
        self.sections.push((name.to_string(), Vec::new()));
        self
    }

    pub fn entry(&mut self, key: &str, value: impl AsRef<str>) -> &mut Self {
        self.sections
            .last_mut()
            .expect("entry() called before section()")
            .1
            .push((key.to_string(), value.as_ref().to_string()));
        self
    }

    pub fn entries(&mut self, key: &str, values: impl IntoIterator<Item = impl AsRef<str>>) -> &mut Self {
        for value in values {
            self.entry(key, value);
        }
        self
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, (name, entries)) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(name);
            out.push_str("]\n");
            for (key, value) in entries {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }
}

impl Default for IniDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sections_with_single_blank_separator() {
        let mut doc = IniDocument::new();
        doc.section("Unit").entry("Description", "web-api");
        doc.section("Container").entry("Image", "nginx:1.25");
        let rendered = doc.render();
        assert_eq!(
            rendered,
            "[Unit]\nDescription=web-api\n\n[Container]\nImage=nginx:1.25\n"
        );
        assert!(!rendered.contains("\n\n\n"));
    }
}
