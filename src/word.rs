#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    Simple(String),
    SingleQuoted(String),
    DoubleQuoted(String),
}

/// One shell word, kept as its quoted segments until variables are expanded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Word {
    parts: Vec<WordPart>,
}

impl Word {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    pub fn add_part(&mut self, part: WordPart) {
        self.parts.push(part);
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(WordPart::Simple(last)) = self.parts.last_mut() {
            last.push(c);
        } else {
            self.add_part(WordPart::Simple(c.to_string()));
        }
    }

    /// Unquoted text of a word made of a single simple part.
    pub fn as_bare(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [WordPart::Simple(s)] => Some(s),
            _ => None,
        }
    }

    /// Raw text with quoting removed and no expansion.
    #[cfg(test)]
    pub fn literal(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                WordPart::Simple(s) | WordPart::SingleQuoted(s) | WordPart::DoubleQuoted(s) => {
                    s.as_str()
                }
            })
            .collect()
    }

    /// Text with `$NAME` / `${NAME}` taken from the process environment.
    pub fn expand(&self) -> String {
        self.expand_with(|name| std::env::var(name).ok())
    }

    pub fn expand_with<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                WordPart::SingleQuoted(s) => out.push_str(s),
                WordPart::Simple(s) | WordPart::DoubleQuoted(s) => {
                    expand_vars(s, &lookup, &mut out)
                }
            }
        }
        out
    }
}

fn expand_vars<F>(text: &str, lookup: &F, out: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }
        if braced {
            if chars.peek() == Some(&'}') && !name.is_empty() {
                chars.next();
            } else {
                // not a well-formed ${NAME}
                out.push_str("${");
                out.push_str(&name);
                continue;
            }
        }

        if name.is_empty() {
            out.push('$');
        } else if let Some(value) = lookup(&name) {
            out.push_str(&value);
        }
    }
}
