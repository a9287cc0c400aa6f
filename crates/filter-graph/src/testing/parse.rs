//! Parser for the filter description syntax:
//!
//! ```text
//! graph  := chain (';' chain)*
//! chain  := filter (',' filter)*
//! filter := label* name ['@' id] ['=' args] label*
//! label  := '[' name ']'
//! ```
//!
//! Arguments run until an unquoted `[`, `]`, `,` or `;`. Single quotes and
//! backslashes escape, and are removed.

use avgraph_media_info::AvError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub inputs: Vec<String>,
    pub name: String,
    pub id: Option<String>,
    pub args: Option<String>,
    pub outputs: Vec<String>,
}

pub type ChainSpec = Vec<FilterSpec>;

pub fn parse_description(description: &str) -> Result<Vec<ChainSpec>, AvError> {
    let mut parser = Parser {
        chars: description.chars().collect(),
        pos: 0,
    };

    let mut chains = Vec::new();
    let mut chain = Vec::new();

    loop {
        chain.push(parser.filter()?);

        parser.skip_whitespace();
        match parser.next() {
            Some(',') => {}
            Some(';') => chains.push(std::mem::take(&mut chain)),
            None => {
                chains.push(chain);
                return Ok(chains);
            }
            Some(_) => return Err(AvError::EINVAL),
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn filter(&mut self) -> Result<FilterSpec, AvError> {
        let inputs = self.labels()?;

        self.skip_whitespace();
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, '=' | ',' | ';' | '[' | ']') || c.is_whitespace() {
                break;
            }
            name.push(c);
            self.pos += 1;
        }

        if name.is_empty() {
            return Err(AvError::EINVAL);
        }

        let (name, id) = match name.split_once('@') {
            Some((name, id)) => (name.to_string(), Some(id.to_string())),
            None => (name, None),
        };

        let args = if self.peek() == Some('=') {
            self.pos += 1;
            Some(self.args()?)
        } else {
            None
        };

        let outputs = self.labels()?;

        Ok(FilterSpec {
            inputs,
            name,
            id,
            args,
            outputs,
        })
    }

    fn labels(&mut self) -> Result<Vec<String>, AvError> {
        let mut labels = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() != Some('[') {
                return Ok(labels);
            }
            self.pos += 1;

            let mut label = String::new();
            loop {
                match self.next() {
                    Some(']') => break,
                    Some(c) => label.push(c),
                    None => return Err(AvError::EINVAL),
                }
            }

            if label.is_empty() {
                return Err(AvError::EINVAL);
            }
            labels.push(label);
        }
    }

    fn args(&mut self) -> Result<String, AvError> {
        let mut args = String::new();
        // Length of `args` up to the last quoted or escaped character, which
        // survives trailing-whitespace trimming.
        let mut keep = 0;

        while let Some(c) = self.peek() {
            match c {
                '[' | ']' | ',' | ';' => break,
                '\\' => {
                    self.pos += 1;
                    args.push(self.next().ok_or(AvError::EINVAL)?);
                    keep = args.len();
                }
                '\'' => {
                    self.pos += 1;
                    loop {
                        match self.next() {
                            Some('\'') => break,
                            Some(c) => args.push(c),
                            None => return Err(AvError::EINVAL),
                        }
                    }
                    keep = args.len();
                }
                c => {
                    self.pos += 1;
                    args.push(c);
                }
            }
        }

        let trimmed = args.trim_end().len().max(keep);
        args.truncate(trimmed);
        Ok(args.trim_start().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filter(name: &str, args: Option<&str>) -> FilterSpec {
        FilterSpec {
            inputs: vec![],
            name: name.to_string(),
            id: None,
            args: args.map(str::to_string),
            outputs: vec![],
        }
    }

    #[test]
    fn single_filter() {
        assert_eq!(parse_description("null").unwrap(), vec![vec![filter("null", None)]]);
    }

    #[test]
    fn quoted_args_keep_commas() {
        assert_eq!(
            parse_description("select='eq(pict_type,I)'").unwrap(),
            vec![vec![filter("select", Some("eq(pict_type,I)"))]]
        );
    }

    #[test]
    fn escaped_args_keep_separators() {
        assert_eq!(
            parse_description(r"select=eq(pict_type\,I), null").unwrap(),
            vec![vec![filter("select", Some("eq(pict_type,I)")), filter("null", None)]]
        );
    }

    #[test]
    fn chains_and_labels() {
        let chains = parse_description("[in0][in1]hstack[v]; [v] scale=640:360 [out]").unwrap();

        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0][0].inputs, vec!["in0", "in1"]);
        assert_eq!(chains[0][0].outputs, vec!["v"]);
        assert_eq!(chains[1][0].inputs, vec!["v"]);
        assert_eq!(chains[1][0].args.as_deref(), Some("640:360"));
        assert_eq!(chains[1][0].outputs, vec!["out"]);
    }

    #[test]
    fn instance_id() {
        let chains = parse_description("scale@main=320:240").unwrap();

        assert_eq!(chains[0][0].name, "scale");
        assert_eq!(chains[0][0].id.as_deref(), Some("main"));
    }

    #[test]
    fn syntax_errors() {
        for description in ["", ",null", "null,", "[in0 null", "[]null", "select='eq(", "null]"] {
            assert_eq!(
                parse_description(description),
                Err(AvError::EINVAL),
                "{description:?}"
            );
        }
    }
}
