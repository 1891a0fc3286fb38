//! The streamed debug document: one `<Period>` element per solved period.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Scenario name="reference">
//!     <Period period="0" year="1975">
//!         <World>...</World>
//!         <Marketplace>...</Marketplace>
//!     </Period>
//!     ...
//! </Scenario>
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use types::{Period, ToDebugXml, XmlWriter, Year};

/// Open debug document. The closing tag is written by [`finish`](Self::finish).
pub struct DebugDocument {
    path: PathBuf,
    out: BufWriter<File>,
}

impl DebugDocument {
    /// Create the file and write the declaration and opening tag.
    pub fn create(path: &Path, scenario: &str) -> io::Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        let mut xml = XmlWriter::new(&mut out);
        xml.declaration()?;
        xml.open("Scenario", &[("name", scenario)])?;
        Ok(Self {
            path: path.to_path_buf(),
            out,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dump each item's state for one period.
    pub fn write_period(
        &mut self,
        period: Period,
        year: Year,
        items: &[&dyn ToDebugXml],
    ) -> io::Result<()> {
        let mut xml = XmlWriter::with_depth(&mut self.out, 1);
        xml.open(
            "Period",
            &[("period", &period.to_string()), ("year", &year.to_string())],
        )?;
        for item in items {
            item.to_debug_xml(period, &mut xml)?;
        }
        xml.close("Period")
    }

    /// Write the closing tag and flush.
    pub fn finish(mut self) -> io::Result<()> {
        XmlWriter::with_depth(&mut self.out, 1).close("Scenario")?;
        self.out.flush()
    }
}

/// Insert `ending` before the file extension: `debug.xml` → `debug_run2.xml`.
pub fn with_file_name_ending(file: &str, ending: &str) -> String {
    if ending.is_empty() {
        return file.to_string();
    }
    match file.rfind('.') {
        Some(dot) if !file[dot..].contains(['/', '\\']) => {
            format!("{}{}{}", &file[..dot], ending, &file[dot..])
        }
        _ => format!("{file}{ending}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketplace::Marketplace;

    #[test]
    fn test_file_name_ending() {
        assert_eq!(with_file_name_ending("debug.xml", ""), "debug.xml");
        assert_eq!(with_file_name_ending("debug.xml", "_run2"), "debug_run2.xml");
        assert_eq!(with_file_name_ending("out/debug", "_a"), "out/debug_a");
        assert_eq!(with_file_name_ending("v1.0/debug", "_a"), "v1.0/debug_a");
    }

    #[test]
    fn test_document_is_well_nested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.xml");
        let mut mp = Marketplace::new(2);
        mp.create_market("Forest", "USA", 2.0, true);

        let mut doc = DebugDocument::create(&path, "reference").unwrap();
        doc.write_period(0, 1975, &[&mp]).unwrap();
        doc.write_period(1, 1990, &[&mp]).unwrap();
        doc.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("<?xml"));
        assert_eq!(lines[1], "<Scenario name=\"reference\">");
        assert_eq!(lines[2], "\t<Period period=\"0\" year=\"1975\">");
        assert_eq!(lines[3], "\t\t<Marketplace>");
        assert_eq!(*lines.last().unwrap(), "</Scenario>");
        assert_eq!(text.matches("<Period ").count(), 2);
        assert_eq!(text.matches("</Period>").count(), 2);
    }
}
