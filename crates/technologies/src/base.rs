//! State shared by every technology variant.

use std::io;

use serde::{Deserialize, Serialize};
use types::{Period, XmlWriter, Year};

/// A greenhouse gas emitted in proportion to output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ghg {
    pub name: String,
    /// Emissions per unit output.
    pub coefficient: f64,
    #[serde(skip)]
    emissions: f64,
}

impl Ghg {
    pub fn new(name: impl Into<String>, coefficient: f64) -> Self {
        Self {
            name: name.into(),
            coefficient,
            emissions: 0.0,
        }
    }

    pub fn calc_emission(&mut self, output: f64) {
        self.emissions = self.coefficient * output;
    }

    pub fn emissions(&self) -> f64 {
        self.emissions
    }
}

/// Fields and bookkeeping common to all technologies.
///
/// Variants hold one of these and delegate to it rather than inheriting
/// behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologyCore {
    pub name: String,
    /// Year of the vintage.
    pub year: Year,
    /// Period of the vintage, resolved against model time at setup.
    pub period: Period,
    pub variable_cost: f64,
    pub share: f64,
    pub output: f64,
    pub input: f64,
    pub ghgs: Vec<Ghg>,
}

impl TechnologyCore {
    pub fn new(name: impl Into<String>, year: Year) -> Self {
        Self {
            name: name.into(),
            year,
            period: 0,
            variable_cost: 0.0,
            share: 0.0,
            output: 0.0,
            input: 0.0,
            ghgs: Vec::new(),
        }
    }

    /// A vintage only operates in its own period.
    pub fn is_operating(&self, period: Period) -> bool {
        self.period == period
    }

    pub fn calc_emissions(&mut self) {
        let output = self.output;
        for ghg in &mut self.ghgs {
            ghg.calc_emission(output);
        }
    }

    pub fn emissions(&self) -> Vec<(String, f64)> {
        self.ghgs
            .iter()
            .map(|g| (g.name.clone(), g.emissions()))
            .collect()
    }

    /// Common debug elements, written inside the variant's element.
    pub fn write_xml_fields(&self, out: &mut XmlWriter<'_>) -> io::Result<()> {
        out.element("variableCost", self.variable_cost)?;
        out.element("share", self.share)?;
        out.element("input", self.input)?;
        out.element("output", self.output)?;
        for ghg in &self.ghgs {
            let emissions = ghg.emissions().to_string();
            out.element_with_attrs(
                "GHG",
                &[("name", ghg.name.as_str()), ("emissions", emissions.as_str())],
                ghg.coefficient,
            )?;
        }
        Ok(())
    }
}
