//! Text layout primitives for configuration output.
//!
//! A configuration is rendered from three kinds of nodes: a [`Token`] is a
//! leaf written verbatim, a [`Scope`] is a `{ ... }` region and a [`Clause`]
//! is a space separated sequence terminated with `;`.

pub const DEFAULT_INDENT: &str = "\t";

/// Accumulates output text and knows how to indent.
#[derive(Debug, Clone)]
pub struct StringBuilder {
    indent_pattern: String,
    buf: String,
}

impl StringBuilder {
    pub fn new(indent_pattern: &str) -> Self {
        Self {
            indent_pattern: indent_pattern.to_string(),
            buf: String::new(),
        }
    }

    pub fn write(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.buf.push_str(&self.indent_pattern);
        }
    }

    pub fn newline(&mut self) {
        self.buf.push('\n');
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for StringBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_INDENT)
    }
}

/// A node that can write itself.
///
/// `indent` is the nesting level of the line the node starts on. `inner` is
/// set when the node is embedded in a clause, in which case a clause leaves
/// the terminating `;` to its parent.
pub trait Node {
    fn write(&self, indent: usize, inner: bool, builder: &mut StringBuilder);

    fn is_clause(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(pub String);

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl Node for Token {
    fn write(&self, _indent: usize, _inner: bool, builder: &mut StringBuilder) {
        builder.write(&self.0);
    }
}

#[derive(Default)]
pub struct Scope {
    children: Vec<Box<dyn Node>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: impl Node + 'static) -> &mut Self {
        self.children.push(Box::new(node));
        self
    }

    pub fn push_token(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Token::new(text))
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Node for Scope {
    fn write(&self, indent: usize, _inner: bool, builder: &mut StringBuilder) {
        let Some(last) = self.children.last() else {
            builder.write("{ }");
            return;
        };
        if last.is_clause() {
            builder.write("{");
            for child in &self.children {
                builder.newline();
                builder.indent(indent + 1);
                child.write(indent + 1, false, builder);
            }
            builder.newline();
            builder.indent(indent);
            builder.write("}");
        } else {
            builder.write("{ ");
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    builder.write(" ");
                }
                child.write(indent, false, builder);
            }
            builder.write(" }");
        }
    }
}

#[derive(Default)]
pub struct Clause {
    children: Vec<Box<dyn Node>>,
    unterminated: bool,
}

impl Clause {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clause that never writes `;`, used for verbatim regions.
    pub fn unterminated() -> Self {
        Self {
            children: Vec::new(),
            unterminated: true,
        }
    }

    pub fn push(&mut self, node: impl Node + 'static) -> &mut Self {
        self.children.push(Box::new(node));
        self
    }

    pub fn push_token(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Token::new(text))
    }

    pub fn push_tokens<I, S>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            self.push_token(token);
        }
        self
    }
}

impl Node for Clause {
    fn write(&self, indent: usize, inner: bool, builder: &mut StringBuilder) {
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                builder.write(" ");
            }
            child.write(indent, true, builder);
        }
        if !inner && !self.unterminated {
            builder.write(";");
        }
    }

    fn is_clause(&self) -> bool {
        true
    }
}

/// Renders a node at the top level.
pub fn render(node: &dyn Node, indent_pattern: &str) -> String {
    let mut builder = StringBuilder::new(indent_pattern);
    node.write(0, false, &mut builder);
    builder.finish()
}
