//! Indentation-tracking XML writer for debug output.
//!
//! The document schema is informal: each model object writes its own element
//! with [`ToDebugXml`], nesting children inside it.

use std::fmt::Display;
use std::io::{self, Write};

use crate::Period;

/// Streaming XML writer that tracks the current indentation depth.
pub struct XmlWriter<'a> {
    out: &'a mut dyn Write,
    depth: usize,
}

impl<'a> XmlWriter<'a> {
    /// Wrap an output stream.
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out, depth: 0 }
    }

    /// Wrap an output stream already nested `depth` levels deep.
    pub fn with_depth(out: &'a mut dyn Write, depth: usize) -> Self {
        Self { out, depth }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn write_indent(&mut self) -> io::Result<()> {
        for _ in 0..self.depth {
            self.out.write_all(b"\t")?;
        }
        Ok(())
    }

    /// Write the `<?xml ...?>` declaration.
    pub fn declaration(&mut self) -> io::Result<()> {
        writeln!(self.out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)
    }

    /// Open an element and increase the indentation.
    pub fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
        self.write_indent()?;
        write!(self.out, "<{tag}")?;
        for (name, value) in attrs {
            write!(self.out, " {name}=\"{}\"", escape(value))?;
        }
        writeln!(self.out, ">")?;
        self.depth += 1;
        Ok(())
    }

    /// Decrease the indentation and close an element.
    pub fn close(&mut self, tag: &str) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.write_indent()?;
        writeln!(self.out, "</{tag}>")
    }

    /// Write a leaf element `<tag>value</tag>`.
    pub fn element(&mut self, tag: &str, value: impl Display) -> io::Result<()> {
        self.element_with_attrs(tag, &[], value)
    }

    /// Write a leaf element with attributes.
    pub fn element_with_attrs(
        &mut self,
        tag: &str,
        attrs: &[(&str, &str)],
        value: impl Display,
    ) -> io::Result<()> {
        self.write_indent()?;
        write!(self.out, "<{tag}")?;
        for (name, value) in attrs {
            write!(self.out, " {name}=\"{}\"", escape(value))?;
        }
        writeln!(self.out, ">{}</{tag}>", escape(&value.to_string()))
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Escape the five XML special characters.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Objects that can dump their state for one period into the debug document.
pub trait ToDebugXml {
    fn to_debug_xml(&self, period: Period, out: &mut XmlWriter<'_>) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_output() {
        let mut buf = Vec::new();
        {
            let mut xml = XmlWriter::new(&mut buf);
            xml.open("region", &[("name", "USA")]).unwrap();
            xml.element("price", 1.5).unwrap();
            xml.close("region").unwrap();
            assert_eq!(xml.depth(), 0);
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "<region name=\"USA\">\n\t<price>1.5</price>\n</region>\n"
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
